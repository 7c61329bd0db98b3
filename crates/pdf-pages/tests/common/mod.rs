#![allow(dead_code)]

use lopdf::{Dictionary, Document, Object, Stream};
use pdf_pages::*;
use std::sync::Arc;

/// A PDF with one page per entry of `widths`; each page's MediaBox width
/// identifies it after reconstruction. All pages share one font object.
pub fn create_test_pdf(widths: &[i64]) -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));

    let mut kids = Vec::new();
    for (i, width) in widths.iter().enumerate() {
        let content = format!("BT /F1 12 Tf 72 720 Td (Page {}) Tj ET", i + 1);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(*width),
                    Object::Integer(792),
                ]),
            ),
            (
                "Resources",
                Object::Dictionary(Dictionary::from_iter(vec![(
                    "Font",
                    Object::Dictionary(Dictionary::from_iter(vec![(
                        "F1",
                        Object::Reference(font_id),
                    )])),
                )])),
            ),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(widths.len() as i64)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    doc
}

pub fn to_bytes(mut doc: Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

pub fn pdf_bytes(widths: &[i64]) -> Vec<u8> {
    to_bytes(create_test_pdf(widths))
}

/// Pages 1..=n with widths 601, 602, ...
pub fn numbered_pdf(pages: usize) -> Vec<u8> {
    let widths: Vec<i64> = (1..=pages as i64).map(|n| 600 + n).collect();
    pdf_bytes(&widths)
}

pub fn original(pages: usize) -> SourceDocument {
    SourceDocument::parse(SourceId::Original, numbered_pdf(pages)).unwrap()
}

/// MediaBox width of every page of `bytes`, in order
pub fn page_widths(bytes: &[u8]) -> Vec<f32> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|id| get_page_dimensions(&doc, *id).0)
        .collect()
}

/// Decoded content stream of every page of `bytes`, in order
pub fn page_contents(bytes: &[u8]) -> Vec<Vec<u8>> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|id| doc.get_page_content(*id).unwrap())
        .collect()
}

pub fn ids(model: &PageModel) -> Vec<PageId> {
    model.pages().iter().map(|p| p.id).collect()
}

pub fn visible_ids(model: &PageModel) -> Vec<PageId> {
    model.visible_pages().map(|p| p.id).collect()
}

pub fn buffers(sources: &[(SourceId, Vec<u8>)]) -> SourceBuffers {
    sources
        .iter()
        .map(|(id, bytes)| (*id, Arc::new(bytes.clone())))
        .collect()
}

/// Display numbers of visible pages are exactly 1..=count and deleted pages have none
pub fn assert_numbering(model: &PageModel) {
    let mut expected = 1;
    for page in model.pages() {
        if page.deleted {
            assert_eq!(page.display_number, None, "{} is deleted", page.id);
        } else {
            assert_eq!(page.display_number, Some(expected), "{}", page.id);
            expected += 1;
        }
    }
}
