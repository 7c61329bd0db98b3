//! Thumbnail grid controller
//!
//! Keeps one render request per visible page in flight through the render
//! queue and turns pointer input on the grid into selection changes,
//! navigation and reorders.

use crate::model::{PageId, PageModel};
use crate::options::PageManagerOptions;
use crate::render::{RenderBackend, RenderJob, RenderQueue, RenderTicket, Surface, Viewport};
use crate::session::PageManager;
use crate::types::RenderError;
use std::collections::HashMap;
use std::sync::Arc;

/// Where a thumbnail stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailState {
    /// Blank pages are drawn by the host and never rendered
    Blank,
    Loading,
    Ready,
    Failed(String),
}

/// A render the host should await and report back through
/// [`ThumbnailController::complete`]
#[derive(Debug)]
pub struct ThumbnailRequest {
    pub page_id: PageId,
    pub token: u64,
    pub ticket: RenderTicket,
}

/// Modifier keys held during a click
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Ctrl or Cmd: toggle instead of replace
    pub toggle: bool,
}

/// What a pointer release amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Click(PageId),
    Reordered { from: PageId, to: PageId },
    DragCancelled,
    Ignored,
}

#[derive(Debug)]
struct ThumbnailEntry {
    surface: Arc<Surface>,
    token: u64,
    state: ThumbnailState,
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    page_id: PageId,
    origin: (f32, f32),
    active: bool,
}

pub struct ThumbnailController {
    queue: RenderQueue,
    scale: f32,
    drag_threshold: f32,
    entries: HashMap<PageId, ThumbnailEntry>,
    next_token: u64,
    drag: Option<DragState>,
}

impl ThumbnailController {
    /// Must be created inside a tokio runtime
    pub fn new(backend: Arc<dyn RenderBackend>, options: &PageManagerOptions) -> Self {
        Self {
            queue: RenderQueue::new(backend),
            scale: options.thumbnail_scale,
            drag_threshold: options.drag_threshold_px,
            entries: HashMap::new(),
            next_token: 0,
            drag: None,
        }
    }

    /// Bring the thumbnails in line with `model`.
    ///
    /// Visible pages without a current render get one; pages that are gone
    /// or deleted have their surface detached and their job cancelled.
    pub fn sync(&mut self, model: &PageModel) -> Vec<ThumbnailRequest> {
        let visible: Vec<PageId> = model.visible_pages().map(|p| p.id).collect();

        let stale: Vec<PageId> = self
            .entries
            .keys()
            .filter(|id| !visible.contains(*id))
            .copied()
            .collect();
        for id in stale {
            self.release(id);
        }

        let mut requests = Vec::new();
        for page_id in visible {
            if self.entries.contains_key(&page_id) {
                continue;
            }

            self.next_token += 1;
            let token = self.next_token;
            let surface = Surface::new();

            let Some(page) = model.page_handle(page_id) else {
                self.entries.insert(
                    page_id,
                    ThumbnailEntry {
                        surface,
                        token,
                        state: ThumbnailState::Blank,
                    },
                );
                continue;
            };

            let ticket = self.queue.enqueue(
                page_id.to_string(),
                RenderJob {
                    surface: Arc::clone(&surface),
                    page,
                    viewport: Viewport::with_scale(self.scale),
                },
            );
            self.entries.insert(
                page_id,
                ThumbnailEntry {
                    surface,
                    token,
                    state: ThumbnailState::Loading,
                },
            );
            requests.push(ThumbnailRequest {
                page_id,
                token,
                ticket,
            });
        }

        if !requests.is_empty() {
            log::debug!("Requested {} thumbnails", requests.len());
        }
        requests
    }

    /// Record the outcome of a request. Returns `false` for stale tokens.
    ///
    /// A cancelled render forgets the entry so the next `sync` asks again.
    pub fn complete(&mut self, page_id: PageId, token: u64, outcome: Result<(), RenderError>) -> bool {
        let Some(entry) = self.entries.get_mut(&page_id) else {
            return false;
        };
        if entry.token != token {
            log::debug!("Ignoring stale thumbnail result for {}", page_id);
            return false;
        }

        match outcome {
            Ok(()) => entry.state = ThumbnailState::Ready,
            Err(RenderError::Cancelled) => {
                self.entries.remove(&page_id);
            }
            Err(RenderError::Backend(message)) => entry.state = ThumbnailState::Failed(message),
        }
        true
    }

    pub fn state(&self, page_id: PageId) -> Option<&ThumbnailState> {
        self.entries.get(&page_id).map(|entry| &entry.state)
    }

    pub fn surface(&self, page_id: PageId) -> Option<Arc<Surface>> {
        self.entries
            .get(&page_id)
            .map(|entry| Arc::clone(&entry.surface))
    }

    pub fn pending_renders(&self) -> usize {
        self.queue.pending()
    }

    // =========================================================================
    // Pointer input
    // =========================================================================

    /// Plain click selects only `page_id`; with the toggle modifier it flips
    /// membership instead
    pub fn click(&mut self, manager: &mut PageManager, page_id: PageId, modifiers: Modifiers) {
        if modifiers.toggle {
            manager.toggle(page_id);
        } else {
            manager.select(page_id, false);
        }
    }

    /// Display number to navigate to, for a plain double-click on a live page
    pub fn double_click(
        &self,
        manager: &PageManager,
        page_id: PageId,
        modifiers: Modifiers,
    ) -> Option<u32> {
        if modifiers.toggle {
            return None;
        }
        manager.model().get(page_id)?.display_number
    }

    pub fn pointer_down(&mut self, page_id: PageId, position: (f32, f32)) {
        self.drag = Some(DragState {
            page_id,
            origin: position,
            active: false,
        });
    }

    /// Returns whether a drag is active
    pub fn pointer_move(&mut self, position: (f32, f32)) -> bool {
        let threshold = self.drag_threshold;
        let Some(drag) = self.drag.as_mut() else {
            return false;
        };
        if !drag.active {
            let dx = position.0 - drag.origin.0;
            let dy = position.1 - drag.origin.1;
            drag.active = (dx * dx + dy * dy).sqrt() >= threshold;
        }
        drag.active
    }

    /// Finish a press. A press that never became a drag is a click; a drag
    /// dropped on another page moves the dragged page there.
    pub fn pointer_up(
        &mut self,
        manager: &mut PageManager,
        over: Option<PageId>,
        modifiers: Modifiers,
    ) -> Gesture {
        let Some(drag) = self.drag.take() else {
            return Gesture::Ignored;
        };

        if !drag.active {
            self.click(manager, drag.page_id, modifiers);
            return Gesture::Click(drag.page_id);
        }

        match over {
            Some(target) if target != drag.page_id && manager.reorder(drag.page_id, target) => {
                Gesture::Reordered {
                    from: drag.page_id,
                    to: target,
                }
            }
            _ => Gesture::DragCancelled,
        }
    }

    /// Tear down: cancel all rendering and forget every thumbnail
    pub fn close(&mut self) {
        self.queue.clear();
        for entry in self.entries.values() {
            entry.surface.detach();
        }
        self.entries.clear();
        self.drag = None;
    }

    fn release(&mut self, page_id: PageId) {
        if let Some(entry) = self.entries.remove(&page_id) {
            entry.surface.detach();
            self.queue.cancel(&page_id.to_string());
        }
    }
}
