//! Page-array checks run before reconstruction

use crate::model::PageDescriptor;
use crate::types::ValidationError;
use std::collections::HashSet;

/// Reject an export with no live pages or with repeated ids
pub fn validate_pages(pages: &[PageDescriptor]) -> Result<(), ValidationError> {
    if !pages.iter().any(|p| !p.deleted) {
        return Err(ValidationError::NoPages);
    }

    let mut seen = HashSet::with_capacity(pages.len());
    for page in pages {
        if !seen.insert(page.id) {
            return Err(ValidationError::DuplicateId(page.id));
        }
    }
    Ok(())
}
