//! Rendering backend on top of pdfium

use super::backend::{BackendError, Bitmap, CancelToken, PageHandle, RenderBackend, Viewport};
use pdfium_render::prelude::*;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

thread_local! {
    /// Library bound on this thread, keyed by the directory it was bound from
    static PDFIUM: RefCell<Option<(Option<PathBuf>, Rc<Pdfium>)>> = const { RefCell::new(None) };
}

/// Renders pages with pdfium, binding the library once per rendering thread.
///
/// A vendored library directory is tried first, then the system library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumBackend {
    library_dir: Option<PathBuf>,
}

impl PdfiumBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library_dir(library_dir: impl Into<PathBuf>) -> Self {
        Self {
            library_dir: Some(library_dir.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, PdfiumError> {
        let vendor_dir = self.library_dir.clone().or_else(|| {
            std::env::current_dir().ok().and_then(|mut p| {
                p.push("vendor/pdfium/lib");
                if p.exists() { Some(p) } else { None }
            })
        });

        if let Some(dir) = vendor_dir {
            if let Ok(binding) =
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
            {
                return Ok(Pdfium::new(binding));
            }
        }

        Pdfium::bind_to_system_library().map(Pdfium::new)
    }

    fn pdfium(&self) -> Result<Rc<Pdfium>, BackendError> {
        PDFIUM.with(|cell| {
            let mut cached = cell.borrow_mut();
            if let Some((dir, pdfium)) = cached.as_ref() {
                if *dir == self.library_dir {
                    return Ok(Rc::clone(pdfium));
                }
            }
            let pdfium = Rc::new(self.bind().map_err(failed)?);
            log::debug!("Bound pdfium on {:?}", std::thread::current().id());
            *cached = Some((self.library_dir.clone(), Rc::clone(&pdfium)));
            Ok(pdfium)
        })
    }
}

/// Zero-based pdfium index for a 1-based page number
fn page_index(number: u32) -> Result<u16, BackendError> {
    number
        .checked_sub(1)
        .and_then(|index| u16::try_from(index).ok())
        .ok_or_else(|| BackendError::Failed(format!("page number {} is out of range", number)))
}

fn failed(e: PdfiumError) -> BackendError {
    BackendError::Failed(e.to_string())
}

impl RenderBackend for PdfiumBackend {
    fn render(
        &self,
        page: &PageHandle,
        viewport: &Viewport,
        cancel: &CancelToken,
    ) -> Result<Bitmap, BackendError> {
        let index = page_index(page.index)?;
        let pdfium = self.pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(&page.bytes, None)
            .map_err(failed)?;
        if cancel.is_cancelled() {
            return Err(BackendError::Cancelled);
        }

        let pdf_page = document.pages().get(index).map_err(failed)?;

        let config = PdfRenderConfig::new().scale_page_by_factor(viewport.scale);
        let bitmap = pdf_page.render_with_config(&config).map_err(failed)?;
        if cancel.is_cancelled() {
            return Err(BackendError::Cancelled);
        }

        Ok(Bitmap {
            rgba_data: bitmap.as_rgba_bytes().to_vec(),
            width: bitmap.width() as usize,
            height: bitmap.height() as usize,
        })
    }
}
