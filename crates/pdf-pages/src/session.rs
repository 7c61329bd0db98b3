//! Page-manager session
//!
//! Wraps the page model with what a host needs around it: change
//! notifications, a latch so only one reconstruction runs at a time, export
//! naming and the hand-off of a reconstructed document back to the viewer.

use crate::forms::{FormField, fill_form};
use crate::model::*;
use crate::options::PageManagerOptions;
use crate::reconstruct::{SourceBuffers, reconstruct_with_page_size};
use crate::types::*;
use crate::validate::validate_pages;
use lopdf::Document;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Notifications for the viewer
#[derive(Debug, Clone)]
pub enum PageEvent {
    /// The page sequence changed; carries every descriptor, deleted ones included
    OrderChanged(Vec<PageDescriptor>),
    /// A reconstructed document replaced the original; the viewer resets to page 1
    AppliedToViewer { bytes: Arc<Vec<u8>>, page_count: u32 },
}

/// Bytes ready to be saved under a suggested file name
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

/// Releases the reconstruction latch when dropped
#[derive(Debug)]
struct LatchGuard(Arc<AtomicBool>);

impl Drop for LatchGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A reconstruction that owns a snapshot of the page sequence and buffers.
///
/// Edits made to the session after [`PageManager::begin_reconstruction`] do
/// not affect it. The session stays latched until this is run or dropped.
#[derive(Debug)]
pub struct Reconstruction {
    revision: u64,
    pages: Vec<PageDescriptor>,
    buffers: SourceBuffers,
    default_page_size: (f32, f32),
    guard: LatchGuard,
}

impl Reconstruction {
    /// The snapshot being reconstructed, in output order
    pub fn pages(&self) -> &[PageDescriptor] {
        &self.pages
    }

    /// Session revision the snapshot was taken at
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Build the document on the blocking pool
    pub async fn run(self) -> Result<Vec<u8>> {
        let Reconstruction {
            revision: _,
            pages,
            buffers,
            default_page_size,
            guard,
        } = self;

        let result = tokio::task::spawn_blocking(move || {
            reconstruct_with_page_size(&buffers, &pages, default_page_size)
        })
        .await;
        drop(guard);

        Ok(result??)
    }

    /// Build the document on the current thread
    pub fn run_blocking(self) -> Result<Vec<u8>> {
        let bytes = reconstruct_with_page_size(&self.buffers, &self.pages, self.default_page_size)?;
        Ok(bytes)
    }
}

pub struct PageManager {
    model: PageModel,
    options: PageManagerOptions,
    events: Option<mpsc::UnboundedSender<PageEvent>>,
    reconstructing: Arc<AtomicBool>,
    /// Bumped by every structural change, opening included
    revision: u64,
}

impl PageManager {
    pub fn new(options: PageManagerOptions) -> Self {
        Self {
            model: PageModel::new(),
            options,
            events: None,
            reconstructing: Arc::new(AtomicBool::new(false)),
            revision: 0,
        }
    }

    /// Route events to a new receiver, replacing any previous one
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<PageEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    /// Start over with `original` as the document being managed
    pub fn open(&mut self, original: Option<SourceDocument>) {
        self.model.initialize(original);
        self.order_changed();
    }

    pub fn model(&self) -> &PageModel {
        &self.model
    }

    pub fn options(&self) -> &PageManagerOptions {
        &self.options
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    // =========================================================================
    // Structural edits
    // =========================================================================

    pub fn reorder(&mut self, from: PageId, to: PageId) -> bool {
        let moved = self.model.reorder(from, to);
        if moved {
            self.order_changed();
        }
        moved
    }

    pub fn delete_pages(&mut self, ids: &[PageId]) -> usize {
        let deleted = self.model.soft_delete(ids);
        self.model.clear_selection();
        if deleted > 0 {
            self.order_changed();
        }
        deleted
    }

    pub fn delete_selected(&mut self) -> usize {
        let selection = self.model.selection().to_vec();
        self.delete_pages(&selection)
    }

    pub fn insert_blank(&mut self, after: Option<PageId>) -> PageId {
        let id = self.model.insert_blank(after);
        self.order_changed();
        id
    }

    pub fn duplicate(&mut self, source: PageId, after: Option<PageId>) -> Result<PageId> {
        let id = self.model.duplicate(source, after)?;
        self.order_changed();
        Ok(id)
    }

    pub fn duplicate_selected(&mut self) -> Vec<PageId> {
        let selection = self.model.selection().to_vec();
        let created = self.model.duplicate_pages(&selection);
        if !created.is_empty() {
            self.order_changed();
        }
        created
    }

    /// Parse an uploaded document off the current task and splice its pages in
    pub async fn insert_from_upload(
        &mut self,
        bytes: Vec<u8>,
        after: Option<PageId>,
    ) -> Result<SourceId> {
        let (bytes, page_count) = tokio::task::spawn_blocking(move || {
            let page_count = count_pages(&bytes)?;
            Ok::<_, PagesError>((Arc::new(bytes), page_count))
        })
        .await??;
        self.insert_source(bytes, page_count, after)
    }

    /// Splice in an upload that was already parsed
    pub fn insert_source(
        &mut self,
        bytes: Arc<Vec<u8>>,
        page_count: u32,
        after: Option<PageId>,
    ) -> Result<SourceId> {
        let source_id = self.model.insert_source(bytes, page_count, after)?;
        self.order_changed();
        Ok(source_id)
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn select(&mut self, id: PageId, additive: bool) {
        self.model.select(id, additive);
    }

    pub fn toggle(&mut self, id: PageId) {
        self.model.toggle(id);
    }

    pub fn select_all(&mut self) {
        self.model.select_all();
    }

    pub fn clear_selection(&mut self) {
        self.model.clear_selection();
    }

    // =========================================================================
    // Reconstruction
    // =========================================================================

    pub fn is_reconstructing(&self) -> bool {
        self.reconstructing.load(Ordering::SeqCst)
    }

    /// Validate the sequence, take the latch and snapshot everything a
    /// reconstruction needs. Fails with [`PagesError::Busy`] while another
    /// reconstruction is outstanding.
    pub fn begin_reconstruction(&self) -> Result<Reconstruction> {
        validate_pages(self.model.pages())?;

        if self
            .reconstructing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PagesError::Busy);
        }

        Ok(Reconstruction {
            revision: self.revision,
            pages: self.model.export_pages(),
            buffers: self.model.source_buffers(),
            default_page_size: self.options.default_page_size_pt,
            guard: LatchGuard(Arc::clone(&self.reconstructing)),
        })
    }

    /// Suggested name for an export made now
    pub fn export_file_name(&self) -> String {
        let timestamp = chrono::Local::now().format("%Y-%m-%dT%H-%M-%S");
        format!("{}-{}.pdf", self.options.export_file_prefix, timestamp)
    }

    /// Reconstruct the current sequence for download
    pub async fn export(&self) -> Result<ExportedDocument> {
        let reconstruction = self.begin_reconstruction()?;
        let file_name = self.export_file_name();
        let bytes = reconstruction.run().await?;
        log::info!("Exported {} ({} bytes)", file_name, bytes.len());
        Ok(ExportedDocument { bytes, file_name })
    }

    /// Reconstruct and make the result the new original.
    ///
    /// Returns the page count of the applied document.
    pub async fn apply_to_viewer(&mut self) -> Result<u32> {
        let bytes = self.begin_reconstruction()?.run().await?;
        let source = tokio::task::spawn_blocking(move || parse_output(bytes)).await??;
        Ok(self.apply_source(source))
    }

    /// Make already-reconstructed bytes the new original.
    ///
    /// `revision` is [`Reconstruction::revision`] of the run that produced
    /// `bytes`. If the session was reopened or edited since, the output is
    /// refused with [`PagesError::Stale`] and the session is left as is.
    pub fn apply_output(&mut self, revision: u64, bytes: Vec<u8>) -> Result<u32> {
        if revision != self.revision {
            log::warn!(
                "Discarding reconstruction of revision {} (session is at {})",
                revision,
                self.revision
            );
            return Err(PagesError::Stale);
        }
        let source = parse_output(bytes)?;
        Ok(self.apply_source(source))
    }

    fn apply_source(&mut self, source: SourceDocument) -> u32 {
        let page_count = source.page_count();
        self.emit(PageEvent::AppliedToViewer {
            bytes: Arc::clone(source.bytes()),
            page_count,
        });
        self.open(Some(source));
        log::info!("Applied reconstructed document with {} pages", page_count);
        page_count
    }

    // =========================================================================
    // Forms
    // =========================================================================

    /// Fill the original document's form with `fields`.
    ///
    /// Returns the filled document and how many fields were set.
    pub async fn fill_form(&self, fields: Vec<FormField>) -> Result<(ExportedDocument, usize)> {
        let original = self
            .model
            .source(SourceId::Original)
            .ok_or(ReconstructionError::MissingSource(SourceId::Original))?;
        let bytes = Arc::clone(original.bytes());

        let (bytes, set_count) =
            tokio::task::spawn_blocking(move || fill_form(&bytes, &fields)).await??;
        Ok((
            ExportedDocument {
                bytes,
                file_name: self.options.form_file_name.clone(),
            },
            set_count,
        ))
    }

    fn order_changed(&mut self) {
        self.revision += 1;
        self.emit(PageEvent::OrderChanged(self.model.pages().to_vec()));
    }

    fn emit(&self, event: PageEvent) {
        if let Some(events) = &self.events {
            if events.send(event).is_err() {
                log::debug!("Page event dropped: receiver closed");
            }
        }
    }
}

/// Read back a reconstructed document as the new original
fn parse_output(bytes: Vec<u8>) -> Result<SourceDocument> {
    let document = Document::load_mem(&bytes).map_err(ReconstructionError::from)?;
    let page_count = document.get_pages().len() as u32;
    if page_count == 0 {
        return Err(ReconstructionError::EmptyOutput.into());
    }
    Ok(SourceDocument::new(SourceId::Original, Arc::new(bytes), page_count))
}

impl Default for PageManager {
    fn default() -> Self {
        Self::new(PageManagerOptions::default())
    }
}
