//! Page rasterization for thumbnails
//!
//! This module handles everything between a page descriptor and pixels:
//! - The backend contract (pages, viewports, bitmaps, cancellation)
//! - The serialized render queue
//! - The pdfium backend (behind the `pdfium` feature)

mod backend;
#[cfg(feature = "pdfium")]
mod pdfium;
mod queue;

pub use backend::{
    BackendError, Bitmap, CancelToken, PageHandle, RenderBackend, Surface, Viewport,
};
#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumBackend;
pub use queue::{RenderJob, RenderQueue, RenderTicket};
