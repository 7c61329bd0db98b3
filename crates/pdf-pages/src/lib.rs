//! Page management for PDF documents
//!
//! A mutable, multi-source page sequence over immutable source documents,
//! rebuilt into a new PDF on demand, with a serialized thumbnail renderer
//! and form field support alongside.

pub mod constants;
pub mod forms;
mod geometry;
mod io;
pub mod model;
mod options;
pub mod reconstruct;
pub mod render;
mod session;
mod thumbnails;
mod types;
mod validate;

pub use forms::{
    FieldKind, FieldValue, FormField, Rect, SelectOption, extract_form_fields, fill_form,
    has_form_fields, load_form_fields, validate_form_fields,
};
pub use geometry::get_page_dimensions;
pub use io::{load_pdf, load_pdf_bytes, load_source, save_pdf, save_pdf_bytes};
pub use model::{PageDescriptor, PageId, PageModel, PageSource, SourceDocument, SourceId, count_pages};
pub use options::*;
pub use reconstruct::{SourceBuffers, reconstruct, reconstruct_async, reconstruct_with_page_size};
pub use session::{ExportedDocument, PageEvent, PageManager, Reconstruction};
pub use thumbnails::{Gesture, Modifiers, ThumbnailController, ThumbnailRequest, ThumbnailState};
pub use types::*;
pub use validate::validate_pages;
