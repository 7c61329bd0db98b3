//! Loaded backing documents

use super::SourceId;
use crate::types::*;
use lopdf::Document;
use std::sync::Arc;

/// An immutable, parsed backing document that descriptors point into
#[derive(Debug, Clone)]
pub struct SourceDocument {
    id: SourceId,
    page_count: u32,
    bytes: Arc<Vec<u8>>,
}

impl SourceDocument {
    pub fn new(id: SourceId, bytes: Arc<Vec<u8>>, page_count: u32) -> Self {
        Self {
            id,
            page_count,
            bytes,
        }
    }

    /// Parse `bytes` to discover the page count
    pub fn parse(id: SourceId, bytes: impl Into<Arc<Vec<u8>>>) -> Result<Self> {
        let bytes = bytes.into();
        let page_count = count_pages(&bytes)?;
        Ok(Self::new(id, bytes, page_count))
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn bytes(&self) -> &Arc<Vec<u8>> {
        &self.bytes
    }
}

/// Count the pages of a PDF held in memory.
///
/// Bytes that do not parse, or a document without pages, are rejected.
pub fn count_pages(bytes: &[u8]) -> Result<u32> {
    let doc = Document::load_mem(bytes).map_err(|e| PagesError::UploadParse(e.to_string()))?;
    let page_count = doc.get_pages().len() as u32;
    if page_count == 0 {
        return Err(PagesError::UploadParse(
            "document contains no pages".to_string(),
        ));
    }
    Ok(page_count)
}
