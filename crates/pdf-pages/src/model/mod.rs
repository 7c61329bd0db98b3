//! The page model - the authoritative, ordered page sequence
//!
//! Descriptors are never removed from the sequence: deletion flips a flag and
//! display numbers are recomputed after every structural mutation. Every
//! operation either applies fully or leaves the model untouched.

mod descriptor;
mod source;

pub use descriptor::{PageDescriptor, PageId, PageSource, SourceId};
pub use source::{SourceDocument, count_pages};

use crate::render::PageHandle;
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct PageModel {
    pages: Vec<PageDescriptor>,
    sources: HashMap<SourceId, SourceDocument>,
    /// Selected ids in the order they were selected
    selection: Vec<PageId>,
    next_page_id: u64,
    next_upload_id: u64,
}

impl PageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the model with one descriptor per page of `original`.
    ///
    /// An absent document (or one without pages) leaves an empty model.
    /// Uploaded sources from the previous session are released.
    pub fn initialize(&mut self, original: Option<SourceDocument>) {
        self.pages.clear();
        self.sources.clear();
        self.selection.clear();

        let Some(original) = original else {
            return;
        };
        if original.page_count() == 0 {
            return;
        }

        let source_id = original.id();
        for index in 1..=original.page_count() {
            let id = self.allocate_page_id();
            self.pages
                .push(PageDescriptor::new(id, PageSource::Page { source_id, index }));
        }
        self.sources.insert(source_id, original);
        self.renumber();
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Every descriptor in sequence order, soft-deleted ones included
    pub fn pages(&self) -> &[PageDescriptor] {
        &self.pages
    }

    pub fn visible_pages(&self) -> impl Iterator<Item = &PageDescriptor> {
        self.pages.iter().filter(|p| p.is_visible())
    }

    pub fn visible_count(&self) -> usize {
        self.visible_pages().count()
    }

    /// Non-deleted descriptors in display order, ready for reconstruction
    pub fn export_pages(&self) -> Vec<PageDescriptor> {
        self.visible_pages().cloned().collect()
    }

    pub fn get(&self, id: PageId) -> Option<&PageDescriptor> {
        self.pages.iter().find(|p| p.id == id)
    }

    pub fn find_by_display_number(&self, display_number: u32) -> Option<&PageDescriptor> {
        self.visible_pages()
            .find(|p| p.display_number == Some(display_number))
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn source(&self, id: SourceId) -> Option<&SourceDocument> {
        self.sources.get(&id)
    }

    pub fn sources(&self) -> impl Iterator<Item = &SourceDocument> {
        self.sources.values()
    }

    /// Byte buffers of every loaded source, keyed for the reconstructor
    pub fn source_buffers(&self) -> HashMap<SourceId, Arc<Vec<u8>>> {
        self.sources
            .iter()
            .map(|(id, doc)| (*id, Arc::clone(doc.bytes())))
            .collect()
    }

    /// What the rendering backend needs to rasterize a descriptor's page
    pub fn page_handle(&self, id: PageId) -> Option<PageHandle> {
        let page = self.get(id)?;
        let PageSource::Page { source_id, index } = page.source else {
            return None;
        };
        let source = self.sources.get(&source_id)?;
        Some(PageHandle {
            source_id,
            bytes: Arc::clone(source.bytes()),
            index,
        })
    }

    // =========================================================================
    // Structural mutations
    // =========================================================================

    /// Move `from` to the position currently held by `to` (array move, not swap).
    ///
    /// Returns `false` without touching the model when the ids are equal,
    /// either is absent, or either is deleted.
    pub fn reorder(&mut self, from: PageId, to: PageId) -> bool {
        if from == to {
            return false;
        }
        let (Some(from_index), Some(to_index)) = (self.visible_position(from), self.visible_position(to))
        else {
            return false;
        };

        let moved = self.pages.remove(from_index);
        self.pages.insert(to_index, moved);
        self.renumber();
        true
    }

    /// Soft-delete every listed descriptor; returns how many were newly deleted
    pub fn soft_delete(&mut self, ids: &[PageId]) -> usize {
        let mut deleted = 0;
        for page in self.pages.iter_mut() {
            if !page.deleted && ids.contains(&page.id) {
                page.deleted = true;
                deleted += 1;
            }
        }
        self.selection.retain(|id| !ids.contains(id));
        self.renumber();
        deleted
    }

    /// Insert a blank page after `after`, or append when omitted or not found
    pub fn insert_blank(&mut self, after: Option<PageId>) -> PageId {
        let index = self.insertion_index(after);
        let id = self.allocate_page_id();
        self.pages
            .insert(index, PageDescriptor::new(id, PageSource::Blank));
        self.renumber();
        id
    }

    /// Insert a new descriptor referencing the same backing page as `source`.
    ///
    /// Placed after `after` when given and found, otherwise right after the
    /// original.
    pub fn duplicate(&mut self, source: PageId, after: Option<PageId>) -> Result<PageId> {
        let origin = self
            .get(source)
            .filter(|p| p.is_visible())
            .ok_or(PagesError::PageNotFound(source))?
            .source;

        let anchor = after
            .filter(|id| self.position(*id).is_some())
            .unwrap_or(source);
        let index = self.insertion_index(Some(anchor));
        let id = self.allocate_page_id();
        self.pages.insert(index, PageDescriptor::new(id, origin));
        self.renumber();
        Ok(id)
    }

    /// Duplicate each listed page right after itself and clear the selection
    pub fn duplicate_pages(&mut self, ids: &[PageId]) -> Vec<PageId> {
        let originals: Vec<PageId> = self
            .visible_pages()
            .filter(|p| ids.contains(&p.id))
            .map(|p| p.id)
            .collect();

        let mut created = Vec::with_capacity(originals.len());
        for original in originals {
            let origin = match self.get(original) {
                Some(page) => page.source,
                None => continue,
            };
            let index = self.insertion_index(Some(original));
            let id = self.allocate_page_id();
            self.pages.insert(index, PageDescriptor::new(id, origin));
            created.push(id);
        }

        self.selection.clear();
        self.renumber();
        created
    }

    /// Parse `bytes`, register them as a new source and splice its pages in
    /// as one contiguous block after `after` (appended when omitted).
    pub fn insert_from_upload(&mut self, bytes: Vec<u8>, after: Option<PageId>) -> Result<SourceId> {
        let page_count = count_pages(&bytes)?;
        self.insert_source(Arc::new(bytes), page_count, after)
    }

    /// Register an already-parsed upload and splice its pages in
    pub fn insert_source(
        &mut self,
        bytes: Arc<Vec<u8>>,
        page_count: u32,
        after: Option<PageId>,
    ) -> Result<SourceId> {
        if page_count == 0 {
            return Err(PagesError::UploadParse(
                "document contains no pages".to_string(),
            ));
        }

        self.next_upload_id += 1;
        let source_id = SourceId::Upload(self.next_upload_id);
        let index = self.insertion_index(after);

        let block: Vec<PageDescriptor> = (1..=page_count)
            .map(|page_index| {
                let id = self.allocate_page_id();
                PageDescriptor::new(
                    id,
                    PageSource::Page {
                        source_id,
                        index: page_index,
                    },
                )
            })
            .collect();

        self.pages.splice(index..index, block);
        self.sources
            .insert(source_id, SourceDocument::new(source_id, bytes, page_count));
        self.renumber();
        Ok(source_id)
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn selection(&self) -> &[PageId] {
        &self.selection
    }

    pub fn is_selected(&self, id: PageId) -> bool {
        self.selection.contains(&id)
    }

    /// Most recently selected id, used as the default insertion anchor
    pub fn last_selected(&self) -> Option<PageId> {
        self.selection.last().copied()
    }

    /// Select `id`, replacing the selection unless `additive`.
    /// Deleted or unknown ids are ignored.
    pub fn select(&mut self, id: PageId, additive: bool) {
        if self.visible_position(id).is_none() {
            return;
        }
        if !additive {
            self.selection.clear();
        }
        if !self.selection.contains(&id) {
            self.selection.push(id);
        }
    }

    pub fn toggle(&mut self, id: PageId) {
        if let Some(pos) = self.selection.iter().position(|s| *s == id) {
            self.selection.remove(pos);
        } else {
            self.select(id, true);
        }
    }

    pub fn select_all(&mut self) {
        self.selection = self.visible_pages().map(|p| p.id).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn allocate_page_id(&mut self) -> PageId {
        self.next_page_id += 1;
        PageId(self.next_page_id)
    }

    fn position(&self, id: PageId) -> Option<usize> {
        self.pages.iter().position(|p| p.id == id)
    }

    fn visible_position(&self, id: PageId) -> Option<usize> {
        self.pages.iter().position(|p| p.id == id && p.is_visible())
    }

    fn insertion_index(&self, after: Option<PageId>) -> usize {
        after
            .and_then(|id| self.position(id))
            .map(|index| index + 1)
            .unwrap_or(self.pages.len())
    }

    fn renumber(&mut self) {
        let mut next = 1;
        for page in self.pages.iter_mut() {
            if page.deleted {
                page.display_number = None;
            } else {
                page.display_number = Some(next);
                next += 1;
            }
        }
    }
}
