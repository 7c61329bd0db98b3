//! Document I/O helpers for hosts

use crate::model::{SourceDocument, SourceId};
use crate::types::*;
use lopdf::Document;
use std::path::Path;

/// Load a single PDF document
pub async fn load_pdf(path: impl AsRef<Path>) -> Result<Document> {
    let bytes = load_pdf_bytes(path).await?;
    let doc = tokio::task::spawn_blocking(move || Document::load_mem(&bytes)).await??;
    Ok(doc)
}

/// Read a PDF file's raw bytes
pub async fn load_pdf_bytes(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    Ok(bytes)
}

/// Read and parse a file as the original document of a session
pub async fn load_source(path: impl AsRef<Path>) -> Result<SourceDocument> {
    let bytes = load_pdf_bytes(path).await?;
    let source =
        tokio::task::spawn_blocking(move || SourceDocument::parse(SourceId::Original, bytes))
            .await??;
    Ok(source)
}

/// Write reconstructed bytes to disk
pub async fn save_pdf_bytes(bytes: &[u8], path: impl AsRef<Path>) -> Result<()> {
    tokio::fs::write(path.as_ref(), bytes).await?;
    Ok(())
}

/// Serialize a document and write it to disk
pub async fn save_pdf(mut doc: Document, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::task::spawn_blocking(move || {
        let mut writer = Vec::new();
        doc.save_to(&mut writer)?;
        Ok::<_, PagesError>(writer)
    })
    .await??;
    tokio::fs::write(&path, bytes).await?;
    Ok(())
}
