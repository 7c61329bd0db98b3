mod common;

use common::*;
use pdf_pages::*;
use tempfile::tempdir;

fn opened(pages: usize) -> PageManager {
    let mut manager = PageManager::default();
    manager.open(Some(original(pages)));
    manager
}

#[tokio::test]
async fn test_mutations_emit_order_changed() {
    let mut manager = opened(3);
    let mut events = manager.subscribe();
    let [p1, p2, _] = ids(manager.model())[..] else {
        panic!("expected three pages");
    };

    manager.insert_blank(Some(p1));
    manager.reorder(p2, p1);
    manager.select(p1, false);
    manager.delete_selected();

    let mut changes = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            PageEvent::OrderChanged(pages) => changes.push(pages),
            other => panic!("unexpected event {:?}", other),
        }
    }
    // Selection changes are not structural
    assert_eq!(changes.len(), 3);
    assert_eq!(changes.last().unwrap(), manager.model().pages());
}

#[tokio::test]
async fn test_noop_mutations_stay_quiet() {
    let mut manager = opened(2);
    let mut events = manager.subscribe();
    let p1 = ids(manager.model())[0];

    assert!(!manager.reorder(p1, p1));
    assert_eq!(manager.delete_pages(&[PageId(999)]), 0);
    assert!(manager.duplicate_selected().is_empty());

    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_delete_clears_selection() {
    let mut manager = opened(3);
    let [p1, p2, p3] = ids(manager.model())[..] else {
        panic!("expected three pages");
    };
    manager.select(p1, false);
    manager.select(p3, true);

    manager.delete_pages(&[p1]);

    assert!(manager.model().selection().is_empty());
    assert_eq!(visible_ids(manager.model()), vec![p2, p3]);
}

#[tokio::test]
async fn test_export_names_and_builds_document() {
    let mut manager = opened(3);
    let p3 = ids(manager.model())[2];
    manager.delete_pages(&[p3]);

    let exported = manager.export().await.unwrap();

    assert!(exported.file_name.starts_with("modified-document-"));
    assert!(exported.file_name.ends_with(".pdf"));
    // modified-document-YYYY-MM-DDTHH-MM-SS.pdf
    assert_eq!(exported.file_name.len(), "modified-document-".len() + 19 + 4);
    assert!(!exported.file_name.contains(':'));
    assert_eq!(page_widths(&exported.bytes), vec![601.0, 602.0]);
    assert!(!manager.is_reconstructing());
}

#[tokio::test]
async fn test_export_rejects_empty_sequence() {
    let mut manager = opened(2);
    let all = ids(manager.model());
    manager.delete_pages(&all);

    let result = manager.export().await;
    assert!(matches!(
        result,
        Err(PagesError::Validation(ValidationError::NoPages))
    ));
    assert!(!manager.is_reconstructing());
}

#[tokio::test]
async fn test_second_reconstruction_is_busy() {
    let manager = opened(2);

    let first = manager.begin_reconstruction().unwrap();
    assert!(manager.is_reconstructing());
    assert!(matches!(manager.begin_reconstruction(), Err(PagesError::Busy)));
    assert!(matches!(manager.export().await, Err(PagesError::Busy)));

    drop(first);
    assert!(!manager.is_reconstructing());
    assert!(manager.begin_reconstruction().is_ok());
}

#[tokio::test]
async fn test_reconstruction_uses_snapshot() {
    let mut manager = opened(3);
    let [p1, _, p3] = ids(manager.model())[..] else {
        panic!("expected three pages");
    };

    let reconstruction = manager.begin_reconstruction().unwrap();
    manager.reorder(p3, p1);
    manager.insert_blank(None);

    assert_eq!(reconstruction.pages().len(), 3);
    let bytes = reconstruction.run().await.unwrap();
    assert_eq!(page_widths(&bytes), vec![601.0, 602.0, 603.0]);
    assert!(!manager.is_reconstructing());
}

#[tokio::test]
async fn test_apply_to_viewer_resets_model() {
    let mut manager = opened(3);
    let [p1, p2, p3] = ids(manager.model())[..] else {
        panic!("expected three pages");
    };
    manager
        .insert_from_upload(pdf_bytes(&[400]), Some(p1))
        .await
        .unwrap();
    manager.reorder(p3, p2);
    manager.delete_pages(&[p2]);
    let mut events = manager.subscribe();

    let page_count = manager.apply_to_viewer().await.unwrap();

    assert_eq!(page_count, 3);
    match events.try_recv() {
        Ok(PageEvent::AppliedToViewer { bytes, page_count }) => {
            assert_eq!(page_count, 3);
            assert_eq!(page_widths(&bytes), vec![601.0, 400.0, 603.0]);
        }
        other => panic!("expected AppliedToViewer, got {:?}", other),
    }
    assert!(matches!(events.try_recv(), Ok(PageEvent::OrderChanged(_))));

    // Fresh model over the applied document, uploads released
    let model = manager.model();
    assert_eq!(model.pages().len(), 3);
    assert!(model.sources().all(|s| s.id() == SourceId::Original));
    assert!(model.pages().iter().all(|p| !p.deleted));
    assert!(!ids(model).contains(&p1));
}

#[tokio::test]
async fn test_apply_output_rejects_garbage() {
    let mut manager = opened(2);
    let before = ids(manager.model());

    let revision = manager.revision();
    assert!(matches!(
        manager.apply_output(revision, b"%PDF-garbage".to_vec()),
        Err(PagesError::Reconstruction(ReconstructionError::Pdf(_)))
    ));
    assert_eq!(ids(manager.model()), before);
}

#[tokio::test]
async fn test_apply_output_refuses_output_after_reopen() {
    let mut manager = opened(3);
    let reconstruction = manager.begin_reconstruction().unwrap();
    let revision = reconstruction.revision();
    let bytes = reconstruction.run().await.unwrap();

    manager.open(Some(original(5)));
    let reopened = ids(manager.model());

    assert!(matches!(
        manager.apply_output(revision, bytes),
        Err(PagesError::Stale)
    ));
    assert_eq!(ids(manager.model()), reopened);
    assert_eq!(manager.model().visible_count(), 5);
}

#[tokio::test]
async fn test_apply_output_refuses_output_after_edit() {
    let mut manager = opened(3);
    let reconstruction = manager.begin_reconstruction().unwrap();
    let revision = reconstruction.revision();
    let bytes = reconstruction.run().await.unwrap();

    let blank = manager.insert_blank(None);
    assert!(matches!(
        manager.apply_output(revision, bytes.clone()),
        Err(PagesError::Stale)
    ));
    assert!(manager.model().get(blank).is_some());

    // Selection does not change the page sequence, so it does not invalidate
    let reconstruction = manager.begin_reconstruction().unwrap();
    let revision = reconstruction.revision();
    let bytes = reconstruction.run().await.unwrap();
    manager.select_all();
    assert_eq!(manager.apply_output(revision, bytes).unwrap(), 4);
}

#[tokio::test]
async fn test_insert_from_upload_async_rejects_garbage() {
    let mut manager = opened(1);
    let result = manager.insert_from_upload(b"garbage".to_vec(), None).await;
    assert!(matches!(result, Err(PagesError::UploadParse(_))));
    assert_eq!(manager.model().pages().len(), 1);
}

#[tokio::test]
async fn test_load_and_save_round_trip() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("input.pdf");
    let output = dir.path().join("output.pdf");
    save_pdf_bytes(&numbered_pdf(2), &input).await.unwrap();

    let mut manager = PageManager::default();
    manager.open(Some(load_source(&input).await.unwrap()));
    let p1 = ids(manager.model())[0];
    manager.duplicate(p1, None).unwrap();

    let exported = manager.export().await.unwrap();
    save_pdf_bytes(&exported.bytes, &output).await.unwrap();

    let doc = load_pdf(&output).await.unwrap();
    assert_eq!(doc.get_pages().len(), 3);
    assert_eq!(
        page_widths(&load_pdf_bytes(&output).await.unwrap()),
        vec![601.0, 601.0, 602.0]
    );
}

#[test]
fn test_run_blocking_outside_runtime() {
    let mut manager = opened(2);
    let p2 = ids(manager.model())[1];
    manager.insert_blank(Some(p2));

    let reconstruction = manager.begin_reconstruction().unwrap();
    let bytes = reconstruction.run_blocking().unwrap();
    assert_eq!(page_widths(&bytes), vec![601.0, 602.0, 602.0]);
    assert!(!manager.is_reconstructing());
}

#[tokio::test]
async fn test_save_pdf_document() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.pdf");

    save_pdf(create_test_pdf(&[500, 510]), &path).await.unwrap();

    let bytes = load_pdf_bytes(&path).await.unwrap();
    assert_eq!(count_pages(&bytes).unwrap(), 2);
}
