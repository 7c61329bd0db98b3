use pdf_pages::*;

#[test]
fn test_page_source_display() {
    assert_eq!(PageSource::Blank.to_string(), "blank");
    assert_eq!(
        PageSource::Page {
            source_id: SourceId::Upload(3),
            index: 2
        }
        .to_string(),
        "upload-3#2"
    );
}

#[test]
fn test_descriptor_accessors() {
    let page = PageDescriptor::new(
        PageId(1),
        PageSource::Page {
            source_id: SourceId::Original,
            index: 4,
        },
    );
    assert_eq!(page.source_id(), Some(SourceId::Original));
    assert_eq!(page.source_page_index(), Some(4));
    assert!(!page.is_blank());
    assert!(page.is_visible());

    let blank = PageDescriptor::new(PageId(2), PageSource::Blank);
    assert_eq!(blank.source_id(), None);
    assert_eq!(blank.source_page_index(), None);
}

#[test]
fn test_error_messages() {
    assert_eq!(
        ValidationError::NoPages.to_string(),
        "At least one page is required"
    );
    assert_eq!(
        ReconstructionError::MissingSource(SourceId::Upload(1)).to_string(),
        "source document 'upload-1' is not loaded"
    );
    assert_eq!(
        ReconstructionError::PageOutOfRange {
            source_id: SourceId::Original,
            index: 5,
            page_count: 3
        }
        .to_string(),
        "page 5 is out of range for source 'original' (3 pages)"
    );

    let wrapped: PagesError = ValidationError::DuplicateId(PageId(9)).into();
    assert_eq!(
        wrapped.to_string(),
        "Invalid page array: Duplicate page id found: page-9"
    );
}

#[test]
fn test_count_pages() {
    assert!(matches!(
        count_pages(b"definitely not a pdf"),
        Err(PagesError::UploadParse(_))
    ));
}

#[cfg(feature = "serde")]
#[test]
fn test_descriptor_json() {
    let page = PageDescriptor::new(PageId(5), PageSource::Blank);
    let json = serde_json::to_string(&page).unwrap();
    let back: PageDescriptor = serde_json::from_str(&json).unwrap();
    assert_eq!(back, page);
}
