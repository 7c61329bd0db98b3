use lopdf::{Dictionary, Document, Object, Stream};
use pdf_async_runtime::*;
use pdf_pages::render::*;
use pdf_pages::PageSource;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn write_test_pdf(path: &Path, num_pages: usize) {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for i in 0..num_pages {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"q Q".to_vec()));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(600 + i as i64 + 1),
                    Object::Integer(792),
                ]),
            ),
            ("Resources", Object::Dictionary(Dictionary::new())),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(num_pages as i64)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

struct Harness {
    commands: mpsc::UnboundedSender<PdfCommand>,
    updates: mpsc::UnboundedReceiver<PdfUpdate>,
}

impl Harness {
    fn start(backend: Option<Arc<dyn RenderBackend>>) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (update_tx, updates) = mpsc::unbounded_channel();
        tokio::spawn(worker_task(
            command_rx,
            update_tx,
            PageManagerOptions::default(),
            backend,
        ));
        Self { commands, updates }
    }

    fn send(&self, cmd: PdfCommand) {
        self.commands.send(cmd).unwrap();
    }

    /// Next update matching `pred`, skipping the rest
    async fn wait_for(&mut self, pred: impl Fn(&PdfUpdate) -> bool) -> PdfUpdate {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let update = self.updates.recv().await.expect("worker stopped");
                if pred(&update) {
                    return update;
                }
            }
        })
        .await
        .expect("timed out waiting for update")
    }

    async fn pages(&mut self) -> Vec<PageDescriptor> {
        match self
            .wait_for(|u| matches!(u, PdfUpdate::PagesChanged { .. }))
            .await
        {
            PdfUpdate::PagesChanged { pages } => pages,
            _ => unreachable!(),
        }
    }
}

#[tokio::test]
async fn test_open_edit_export() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.pdf");
    write_test_pdf(&input, 3);

    let mut harness = Harness::start(None);
    harness.send(PdfCommand::Open { path: input });

    let loaded = harness
        .wait_for(|u| matches!(u, PdfUpdate::Loaded { .. }))
        .await;
    assert!(matches!(loaded, PdfUpdate::Loaded { page_count: 3 }));
    let pages = harness.pages().await;
    assert_eq!(pages.len(), 3);

    harness.send(PdfCommand::Reorder {
        from: pages[2].id,
        to: pages[0].id,
    });
    let pages = harness.pages().await;
    assert_eq!(
        pages[0].source,
        PageSource::Page {
            source_id: SourceId::Original,
            index: 3
        }
    );

    harness.send(PdfCommand::Export {
        output_dir: dir.path().to_path_buf(),
    });
    let exported = harness
        .wait_for(|u| matches!(u, PdfUpdate::Exported { .. } | PdfUpdate::Error { .. }))
        .await;
    let PdfUpdate::Exported { path } = exported else {
        panic!("export failed: {:?}", exported);
    };

    let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(file_name.starts_with("modified-document-"));
    let doc = Document::load(&path).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
}

#[tokio::test]
async fn test_selection_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.pdf");
    write_test_pdf(&input, 2);

    let mut harness = Harness::start(None);
    harness.send(PdfCommand::Open { path: input });
    let pages = harness.pages().await;

    harness.send(PdfCommand::Select {
        id: pages[1].id,
        additive: false,
    });
    let selection = harness
        .wait_for(|u| matches!(u, PdfUpdate::SelectionChanged { .. }))
        .await;
    assert!(matches!(
        selection,
        PdfUpdate::SelectionChanged { selection } if selection == vec![pages[1].id]
    ));

    harness.send(PdfCommand::DeleteSelected);
    let after = harness.pages().await;
    assert!(after[1].deleted);
    assert_eq!(after[1].display_number, None);
}

#[tokio::test]
async fn test_apply_to_viewer() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.pdf");
    write_test_pdf(&input, 2);

    let mut harness = Harness::start(None);
    harness.send(PdfCommand::Open { path: input });
    let pages = harness.pages().await;

    harness.send(PdfCommand::InsertBlank {
        after: Some(pages[0].id),
    });
    harness.pages().await;
    harness.send(PdfCommand::ApplyToViewer);

    let applied = harness
        .wait_for(|u| matches!(u, PdfUpdate::Applied { .. } | PdfUpdate::Error { .. }))
        .await;
    assert!(matches!(applied, PdfUpdate::Applied { page_count: 3, .. }));

    let fresh = harness.pages().await;
    assert_eq!(fresh.len(), 3);
    assert!(fresh.iter().all(|p| !p.is_blank()));
    assert!(fresh.iter().all(|p| pages.iter().all(|old| old.id != p.id)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_open_during_apply_keeps_new_document() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.pdf");
    let second = dir.path().join("second.pdf");
    write_test_pdf(&first, 3);
    write_test_pdf(&second, 200);

    let mut harness = Harness::start(None);
    harness.send(PdfCommand::Open { path: first });
    harness
        .wait_for(|u| matches!(u, PdfUpdate::Loaded { page_count: 3 }))
        .await;

    harness.send(PdfCommand::ApplyToViewer);
    harness.send(PdfCommand::Open { path: second });
    harness
        .wait_for(|u| matches!(u, PdfUpdate::Loaded { page_count: 200 }))
        .await;

    // Let the apply come back, then look at what the session holds
    tokio::time::sleep(Duration::from_millis(500)).await;
    harness.send(PdfCommand::SelectAll);
    let selection = harness
        .wait_for(|u| matches!(u, PdfUpdate::SelectionChanged { .. }))
        .await;
    let PdfUpdate::SelectionChanged { selection } = selection else {
        unreachable!();
    };
    assert_eq!(selection.len(), 200);
}

#[tokio::test]
async fn test_errors_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut harness = Harness::start(None);

    harness.send(PdfCommand::Open {
        path: dir.path().join("missing.pdf"),
    });
    let error = harness
        .wait_for(|u| matches!(u, PdfUpdate::Error { .. }))
        .await;
    assert!(matches!(error, PdfUpdate::Error { message } if message.contains("Failed to open")));

    // Nothing loaded yet, so there is nothing to export
    harness.send(PdfCommand::Export {
        output_dir: dir.path().to_path_buf(),
    });
    let error = harness
        .wait_for(|u| matches!(u, PdfUpdate::Error { .. }))
        .await;
    assert!(matches!(error, PdfUpdate::Error { message } if message.contains("At least one page")));
}

struct CountingBackend;

impl RenderBackend for CountingBackend {
    fn render(
        &self,
        page: &PageHandle,
        _viewport: &Viewport,
        _cancel: &CancelToken,
    ) -> Result<Bitmap, BackendError> {
        if page.index == 2 {
            return Err(BackendError::Failed("broken page".to_string()));
        }
        Ok(Bitmap {
            width: page.index as usize,
            height: 1,
            rgba_data: vec![0; page.index as usize * 4],
        })
    }
}

#[tokio::test]
async fn test_thumbnails_follow_model() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.pdf");
    write_test_pdf(&input, 2);

    let mut harness = Harness::start(Some(Arc::new(CountingBackend)));
    harness.send(PdfCommand::Open { path: input });
    let pages = harness.pages().await;

    let rendered = harness
        .wait_for(|u| matches!(u, PdfUpdate::ThumbnailRendered { .. }))
        .await;
    assert!(matches!(
        rendered,
        PdfUpdate::ThumbnailRendered { page_id, width: 1, .. } if page_id == pages[0].id
    ));

    let failed = harness
        .wait_for(|u| matches!(u, PdfUpdate::ThumbnailFailed { .. }))
        .await;
    assert!(matches!(
        failed,
        PdfUpdate::ThumbnailFailed { page_id, message } if page_id == pages[1].id && message == "broken page"
    ));

    harness.send(PdfCommand::Close);
    harness
        .wait_for(|u| matches!(u, PdfUpdate::Closed))
        .await;
}
