//! Page descriptors and the identifiers they carry

use std::fmt;

/// Stable identity of a descriptor; survives reorders and is never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageId(pub u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page-{}", self.0)
    }
}

/// Key of a loaded backing document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SourceId {
    /// The document the session was opened with
    Original,
    /// A document uploaded for insertion
    Upload(u64),
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::Original => f.write_str("original"),
            SourceId::Upload(n) => write!(f, "upload-{}", n),
        }
    }
}

/// What a descriptor shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PageSource {
    /// A synthetic empty page with no backing document
    Blank,
    /// Page `index` (1-based) of a loaded source document
    Page { source_id: SourceId, index: u32 },
}

impl fmt::Display for PageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSource::Blank => f.write_str("blank"),
            PageSource::Page { source_id, index } => write!(f, "{}#{}", source_id, index),
        }
    }
}

/// One entry of the page model
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageDescriptor {
    pub id: PageId,
    /// 1-based position among non-deleted descriptors; `None` once deleted
    pub display_number: Option<u32>,
    pub source: PageSource,
    /// Soft-delete flag. Deleted descriptors keep their place in the sequence.
    pub deleted: bool,
}

impl PageDescriptor {
    pub fn new(id: PageId, source: PageSource) -> Self {
        Self {
            id,
            display_number: None,
            source,
            deleted: false,
        }
    }

    /// Backing document, or `None` for blank pages
    pub fn source_id(&self) -> Option<SourceId> {
        match self.source {
            PageSource::Blank => None,
            PageSource::Page { source_id, .. } => Some(source_id),
        }
    }

    /// 1-based page number within the backing document, or `None` for blank pages
    pub fn source_page_index(&self) -> Option<u32> {
        match self.source {
            PageSource::Blank => None,
            PageSource::Page { index, .. } => Some(index),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self.source, PageSource::Blank)
    }

    pub fn is_visible(&self) -> bool {
        !self.deleted
    }
}
