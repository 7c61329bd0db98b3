//! PDF reconstruction - building a new document from page descriptors
//!
//! This module turns the page model into bytes:
//! 1. Parse each referenced source once
//! 2. Copy pages (or create blanks) in descriptor order
//! 3. Assemble a fresh page tree and serialize

mod blank;
mod copy;

use crate::constants::DEFAULT_PAGE_DIMENSIONS;
use crate::geometry::get_page_dimensions;
use crate::model::{PageDescriptor, PageSource, SourceId};
use crate::types::ReconstructionError;
use blank::create_blank_page;
use copy::copy_page;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

/// Source buffers keyed by source id
pub type SourceBuffers = HashMap<SourceId, Arc<Vec<u8>>>;

/// A source parsed for the duration of one reconstruction
struct LoadedSource {
    document: Document,
    page_ids: Vec<ObjectId>,
    /// Source object ID to output object ID
    copied: HashMap<ObjectId, ObjectId>,
}

impl LoadedSource {
    fn load(bytes: &[u8]) -> Result<Self, ReconstructionError> {
        let document = Document::load_mem(bytes)?;
        let page_ids = document.get_pages().values().copied().collect();
        Ok(Self {
            document,
            page_ids,
            copied: HashMap::new(),
        })
    }

    fn page_id(&self, source_id: SourceId, index: u32) -> Result<ObjectId, ReconstructionError> {
        index
            .checked_sub(1)
            .and_then(|i| self.page_ids.get(i as usize))
            .copied()
            .ok_or(ReconstructionError::PageOutOfRange {
                source_id,
                index,
                page_count: self.page_ids.len(),
            })
    }
}

/// Build a new PDF whose pages follow `pages` exactly.
///
/// `pages` must already be in display order; descriptors flagged deleted are
/// skipped. Blank pages take the size of the previous output page (US Letter
/// when first). Identical inputs produce identical bytes.
pub fn reconstruct(
    source_buffers: &SourceBuffers,
    pages: &[PageDescriptor],
) -> Result<Vec<u8>, ReconstructionError> {
    reconstruct_with_page_size(source_buffers, pages, DEFAULT_PAGE_DIMENSIONS)
}

/// [`reconstruct`] with a different size for a leading blank page
pub fn reconstruct_with_page_size(
    source_buffers: &SourceBuffers,
    pages: &[PageDescriptor],
    default_page_size: (f32, f32),
) -> Result<Vec<u8>, ReconstructionError> {
    let mut output = Document::with_version("1.7");
    let pages_id = output.new_object_id();

    let mut sources: HashMap<SourceId, LoadedSource> = HashMap::new();
    let mut kids = Vec::new();
    let mut previous_dimensions = None;

    for descriptor in pages.iter().filter(|p| !p.deleted) {
        let page_id = match descriptor.source {
            PageSource::Blank => {
                let dimensions = previous_dimensions.unwrap_or(default_page_size);
                create_blank_page(&mut output, dimensions, pages_id)
            }
            PageSource::Page { source_id, index } => {
                let loaded = match sources.entry(source_id) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => {
                        let bytes = source_buffers
                            .get(&source_id)
                            .ok_or(ReconstructionError::MissingSource(source_id))?;
                        log::debug!("Loading source {} for reconstruction", source_id);
                        entry.insert(LoadedSource::load(bytes)?)
                    }
                };
                let source_page_id = loaded.page_id(source_id, index)?;
                copy_page(
                    &mut output,
                    &loaded.document,
                    source_page_id,
                    pages_id,
                    &mut loaded.copied,
                )?
            }
        };

        previous_dimensions = Some(get_page_dimensions(&output, page_id));
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(count)),
    ]);
    output.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = output.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    output.trailer.set("Root", catalog_id);

    let mut writer = Vec::new();
    output.save_to(&mut writer)?;
    log::debug!("Reconstructed document with {} pages", count);
    Ok(writer)
}

/// [`reconstruct`] on the blocking pool
pub async fn reconstruct_async(
    source_buffers: SourceBuffers,
    pages: Vec<PageDescriptor>,
) -> Result<Vec<u8>, ReconstructionError> {
    tokio::task::spawn_blocking(move || reconstruct(&source_buffers, &pages)).await?
}
