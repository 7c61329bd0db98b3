use crate::model::{PageId, SourceId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PagesError {
    #[error("Failed to parse uploaded document: {0}")]
    UploadParse(String),
    #[error("Reconstruction failed: {0}")]
    Reconstruction(#[from] ReconstructionError),
    #[error("Invalid page array: {0}")]
    Validation(#[from] ValidationError),
    #[error("Page not found: {0}")]
    PageNotFound(PageId),
    #[error("A reconstruction is already in progress")]
    Busy,
    #[error("The document changed while it was being reconstructed")]
    Stale,
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, PagesError>;

/// Failure while building an output document from page descriptors.
///
/// Whatever the cause, no partial output is produced.
#[derive(Error, Debug)]
pub enum ReconstructionError {
    #[error("source document '{0}' is not loaded")]
    MissingSource(SourceId),
    #[error("page {index} is out of range for source '{source_id}' ({page_count} pages)")]
    PageOutOfRange {
        source_id: SourceId,
        index: u32,
        page_count: usize,
    },
    #[error("reconstructed document has no pages")]
    EmptyOutput,
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Page-array checks run before any reconstruction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("At least one page is required")]
    NoPages,
    #[error("Duplicate page id found: {0}")]
    DuplicateId(PageId),
}

/// Outcome of a render job that did not produce a bitmap.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Explicitly cancelled, superseded by a same-id enqueue, surface detached,
    /// or aborted by the backend. Callers treat this as a no-op.
    #[error("Rendering cancelled")]
    Cancelled,
    #[error("Rendering failed: {0}")]
    Backend(String),
}
