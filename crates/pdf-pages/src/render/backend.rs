//! Rasterization backend contract and the values passed across it

use crate::model::SourceId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// A page of a loaded source document, as seen by the rendering backend
#[derive(Debug, Clone)]
pub struct PageHandle {
    pub source_id: SourceId,
    pub bytes: Arc<Vec<u8>>,
    /// 1-based page number within the source
    pub index: u32,
}

/// Target viewport for a render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Factor applied to the page's natural size in points
    pub scale: f32,
}

impl Viewport {
    pub fn with_scale(scale: f32) -> Self {
        Self { scale }
    }
}

/// Rendered page pixels
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pub width: usize,
    pub height: usize,
    pub rgba_data: Vec<u8>,
}

/// Cooperative cancellation flag handed to the backend with every job.
///
/// Backends check it at call granularity and return
/// [`BackendError::Cancelled`] once it trips.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A render target owned by the live view.
///
/// Once detached, queued jobs aimed at it are dropped instead of rendered.
#[derive(Debug)]
pub struct Surface {
    attached: AtomicBool,
    bitmap: Mutex<Option<Bitmap>>,
}

impl Surface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            attached: AtomicBool::new(true),
            bitmap: Mutex::new(None),
        })
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }

    pub fn present(&self, bitmap: Bitmap) {
        *self.bitmap.lock().unwrap_or_else(PoisonError::into_inner) = Some(bitmap);
    }

    /// Copy of the last presented bitmap
    pub fn bitmap(&self) -> Option<Bitmap> {
        self.bitmap
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has_bitmap(&self) -> bool {
        self.bitmap
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("render aborted")]
    Cancelled,
    #[error("{0}")]
    Failed(String),
}

/// Rasterizes single pages. Called from the blocking pool, one job at a time.
pub trait RenderBackend: Send + Sync + 'static {
    fn render(
        &self,
        page: &PageHandle,
        viewport: &Viewport,
        cancel: &CancelToken,
    ) -> Result<Bitmap, BackendError>;
}
