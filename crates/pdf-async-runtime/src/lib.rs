use std::path::PathBuf;
use std::sync::Arc;

mod worker;

// Re-export types from library crates
pub use pdf_pages::{FieldValue, FormField, PageDescriptor, PageId, PageManagerOptions, SourceId};
pub use worker::worker_task;

/// Commands sent from the host to the worker
#[derive(Debug)]
pub enum PdfCommand {
    Open {
        path: PathBuf,
    },
    Reorder {
        from: PageId,
        to: PageId,
    },
    DeletePages {
        ids: Vec<PageId>,
    },
    DeleteSelected,
    InsertBlank {
        after: Option<PageId>,
    },
    Duplicate {
        source: PageId,
        after: Option<PageId>,
    },
    DuplicateSelected,
    InsertUpload {
        path: PathBuf,
        after: Option<PageId>,
    },
    Select {
        id: PageId,
        additive: bool,
    },
    Toggle {
        id: PageId,
    },
    SelectAll,
    ClearSelection,
    /// Reconstruct and write into `output_dir` under a timestamped name
    Export {
        output_dir: PathBuf,
    },
    ApplyToViewer,
    LoadFormFields,
    FillForm {
        fields: Vec<FormField>,
        output_dir: PathBuf,
    },
    Close,
}

/// Updates sent from the worker to the host
#[derive(Debug, Clone)]
pub enum PdfUpdate {
    Loaded {
        page_count: u32,
    },
    PagesChanged {
        pages: Vec<PageDescriptor>,
    },
    SelectionChanged {
        selection: Vec<PageId>,
    },
    ThumbnailRendered {
        page_id: PageId,
        width: usize,
        height: usize,
        rgba_data: Vec<u8>,
    },
    ThumbnailFailed {
        page_id: PageId,
        message: String,
    },
    Exported {
        path: PathBuf,
    },
    Applied {
        bytes: Arc<Vec<u8>>,
        page_count: u32,
    },
    FormFieldsLoaded {
        fields: Vec<FormField>,
    },
    FormFilled {
        path: PathBuf,
        set_count: usize,
        /// Required fields left empty; the form is written regardless
        warnings: Vec<String>,
    },
    Error {
        message: String,
    },
    Closed,
}
