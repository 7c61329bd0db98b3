use crate::{PdfCommand, PdfUpdate};
use pdf_pages::render::RenderBackend;
use pdf_pages::*;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Results of work spawned off the command loop
enum Background {
    /// `revision` is the session revision the reconstruction snapshotted
    Applied {
        revision: u64,
        result: pdf_pages::Result<Vec<u8>>,
    },
    Thumbnail {
        page_id: PageId,
        token: u64,
        outcome: std::result::Result<(), RenderError>,
    },
}

struct WorkerState {
    manager: PageManager,
    events: mpsc::UnboundedReceiver<PageEvent>,
    thumbnails: Option<ThumbnailController>,
    background_tx: mpsc::UnboundedSender<Background>,
}

/// Async worker task that owns a page-manager session, processes commands
/// and sends updates.
///
/// Thumbnails are only rendered when a backend is supplied. Exports and
/// applies run off the command loop, so edits keep flowing meanwhile.
pub async fn worker_task(
    mut command_rx: mpsc::UnboundedReceiver<PdfCommand>,
    update_tx: mpsc::UnboundedSender<PdfUpdate>,
    options: PageManagerOptions,
    backend: Option<Arc<dyn RenderBackend>>,
) {
    let (background_tx, mut background_rx) = mpsc::unbounded_channel();
    let mut manager = PageManager::new(options);
    let events = manager.subscribe();
    let thumbnails = backend.map(|backend| ThumbnailController::new(backend, manager.options()));

    let mut state = WorkerState {
        manager,
        events,
        thumbnails,
        background_tx,
    };

    loop {
        tokio::select! {
            cmd = command_rx.recv() => {
                let Some(cmd) = cmd else { break };
                let closing = matches!(cmd, PdfCommand::Close);
                process_command(cmd, &mut state, &update_tx).await;
                state.flush_events(&update_tx);
                if closing {
                    break;
                }
            }
            Some(result) = background_rx.recv() => {
                process_background(result, &mut state, &update_tx);
                state.flush_events(&update_tx);
            }
        }
    }

    if let Some(thumbnails) = state.thumbnails.as_mut() {
        thumbnails.close();
    }
    log::debug!("Page worker stopped");
}

async fn process_command(
    cmd: PdfCommand,
    state: &mut WorkerState,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) {
    let manager = &mut state.manager;
    match cmd {
        PdfCommand::Open { path } => match load_source(&path).await {
            Ok(source) => {
                let page_count = source.page_count();
                manager.open(Some(source));
                log::info!("Opened {} ({} pages)", path.display(), page_count);
                let _ = update_tx.send(PdfUpdate::Loaded { page_count });
            }
            Err(e) => send_error(update_tx, format!("Failed to open PDF: {}", e)),
        },
        PdfCommand::Reorder { from, to } => {
            manager.reorder(from, to);
        }
        PdfCommand::DeletePages { ids } => {
            manager.delete_pages(&ids);
            send_selection(manager, update_tx);
        }
        PdfCommand::DeleteSelected => {
            manager.delete_selected();
            send_selection(manager, update_tx);
        }
        PdfCommand::InsertBlank { after } => {
            manager.insert_blank(after);
        }
        PdfCommand::Duplicate { source, after } => {
            if let Err(e) = manager.duplicate(source, after) {
                send_error(update_tx, format!("Failed to duplicate page: {}", e));
            }
        }
        PdfCommand::DuplicateSelected => {
            manager.duplicate_selected();
            send_selection(manager, update_tx);
        }
        PdfCommand::InsertUpload { path, after } => {
            let result = match load_pdf_bytes(&path).await {
                Ok(bytes) => manager.insert_from_upload(bytes, after).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                send_error(update_tx, format!("Failed to insert uploaded PDF: {}", e));
            }
        }
        PdfCommand::Select { id, additive } => {
            manager.select(id, additive);
            send_selection(manager, update_tx);
        }
        PdfCommand::Toggle { id } => {
            manager.toggle(id);
            send_selection(manager, update_tx);
        }
        PdfCommand::SelectAll => {
            manager.select_all();
            send_selection(manager, update_tx);
        }
        PdfCommand::ClearSelection => {
            manager.clear_selection();
            send_selection(manager, update_tx);
        }
        PdfCommand::Export { output_dir } => handle_export(manager, output_dir, update_tx),
        PdfCommand::ApplyToViewer => match manager.begin_reconstruction() {
            Ok(reconstruction) => {
                let background_tx = state.background_tx.clone();
                tokio::spawn(async move {
                    let revision = reconstruction.revision();
                    let result = reconstruction.run().await;
                    let _ = background_tx.send(Background::Applied { revision, result });
                });
            }
            Err(e) => send_error(update_tx, format!("Failed to apply changes: {}", e)),
        },
        PdfCommand::LoadFormFields => handle_load_form_fields(manager, update_tx).await,
        PdfCommand::FillForm { fields, output_dir } => {
            handle_fill_form(manager, fields, output_dir, update_tx).await;
        }
        PdfCommand::Close => {
            if let Some(thumbnails) = state.thumbnails.as_mut() {
                thumbnails.close();
            }
            let _ = update_tx.send(PdfUpdate::Closed);
        }
    }
}

fn process_background(
    result: Background,
    state: &mut WorkerState,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) {
    match result {
        Background::Applied {
            revision,
            result: Ok(bytes),
        } => {
            if let Err(e) = state.manager.apply_output(revision, bytes) {
                send_error(update_tx, format!("Failed to apply changes: {}", e));
            }
        }
        Background::Applied { result: Err(e), .. } => {
            send_error(update_tx, format!("Failed to apply changes: {}", e));
        }
        Background::Thumbnail {
            page_id,
            token,
            outcome,
        } => {
            let Some(thumbnails) = state.thumbnails.as_mut() else {
                return;
            };
            if !thumbnails.complete(page_id, token, outcome) {
                return;
            }
            match thumbnails.state(page_id) {
                Some(ThumbnailState::Ready) => {
                    if let Some(bitmap) = thumbnails.surface(page_id).and_then(|s| s.bitmap()) {
                        let _ = update_tx.send(PdfUpdate::ThumbnailRendered {
                            page_id,
                            width: bitmap.width,
                            height: bitmap.height,
                            rgba_data: bitmap.rgba_data,
                        });
                    }
                }
                Some(ThumbnailState::Failed(message)) => {
                    let _ = update_tx.send(PdfUpdate::ThumbnailFailed {
                        page_id,
                        message: message.clone(),
                    });
                }
                _ => {}
            }
        }
    }
}

fn handle_export(
    manager: &PageManager,
    output_dir: PathBuf,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) {
    let reconstruction = match manager.begin_reconstruction() {
        Ok(reconstruction) => reconstruction,
        Err(e) => {
            send_error(update_tx, format!("Failed to export PDF: {}", e));
            return;
        }
    };
    let path = output_dir.join(manager.export_file_name());

    let update_tx = update_tx.clone();
    tokio::spawn(async move {
        let result = async {
            let bytes = reconstruction.run().await?;
            save_pdf_bytes(&bytes, &path).await?;
            Ok::<_, PagesError>(())
        }
        .await;

        match result {
            Ok(()) => {
                log::info!("Exported {}", path.display());
                let _ = update_tx.send(PdfUpdate::Exported { path });
            }
            Err(e) => send_error(&update_tx, format!("Failed to export PDF: {}", e)),
        }
    });
}

async fn handle_load_form_fields(
    manager: &PageManager,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) {
    let Some(original) = manager.model().source(SourceId::Original) else {
        send_error(update_tx, "No document loaded".to_string());
        return;
    };
    let bytes = Arc::clone(original.bytes());

    match tokio::task::spawn_blocking(move || load_form_fields(&bytes)).await {
        Ok(Ok(fields)) => {
            let _ = update_tx.send(PdfUpdate::FormFieldsLoaded { fields });
        }
        Ok(Err(e)) => send_error(update_tx, format!("Failed to read form fields: {}", e)),
        Err(e) => send_error(update_tx, format!("Task join error: {}", e)),
    }
}

async fn handle_fill_form(
    manager: &PageManager,
    fields: Vec<FormField>,
    output_dir: PathBuf,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) {
    let warnings = validate_form_fields(&fields);

    let result = async {
        let (filled, set_count) = manager.fill_form(fields).await?;
        let path = output_dir.join(&filled.file_name);
        save_pdf_bytes(&filled.bytes, &path).await?;
        Ok::<_, PagesError>((path, set_count))
    }
    .await;

    match result {
        Ok((path, set_count)) => {
            let _ = update_tx.send(PdfUpdate::FormFilled {
                path,
                set_count,
                warnings,
            });
        }
        Err(e) => send_error(update_tx, format!("Failed to save filled form: {}", e)),
    }
}

impl WorkerState {
    /// Forward session events and keep thumbnails in step with the model
    fn flush_events(&mut self, update_tx: &mpsc::UnboundedSender<PdfUpdate>) {
        let mut order_changed = false;
        while let Ok(event) = self.events.try_recv() {
            match event {
                PageEvent::OrderChanged(pages) => {
                    order_changed = true;
                    let _ = update_tx.send(PdfUpdate::PagesChanged { pages });
                }
                PageEvent::AppliedToViewer { bytes, page_count } => {
                    let _ = update_tx.send(PdfUpdate::Applied { bytes, page_count });
                }
            }
        }

        if order_changed {
            self.sync_thumbnails();
        }
    }

    fn sync_thumbnails(&mut self) {
        let Some(thumbnails) = self.thumbnails.as_mut() else {
            return;
        };
        for request in thumbnails.sync(self.manager.model()) {
            let background_tx = self.background_tx.clone();
            tokio::spawn(async move {
                let outcome = request.ticket.await;
                let _ = background_tx.send(Background::Thumbnail {
                    page_id: request.page_id,
                    token: request.token,
                    outcome,
                });
            });
        }
    }
}

fn send_selection(manager: &PageManager, update_tx: &mpsc::UnboundedSender<PdfUpdate>) {
    let _ = update_tx.send(PdfUpdate::SelectionChanged {
        selection: manager.model().selection().to_vec(),
    });
}

fn send_error(update_tx: &mpsc::UnboundedSender<PdfUpdate>, message: String) {
    log::warn!("{}", message);
    let _ = update_tx.send(PdfUpdate::Error { message });
}
