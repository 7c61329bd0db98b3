//! Blank page creation

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Create a blank page of the given size (points) under `parent_id`
pub(crate) fn create_blank_page(
    doc: &mut Document,
    (width, height): (f32, f32),
    parent_id: ObjectId,
) -> ObjectId {
    let content_stream = Stream::new(Dictionary::new(), Vec::new());
    let content_id = doc.add_object(content_stream);

    let mut page_dict = Dictionary::new();
    page_dict.set("Type", Object::Name(b"Page".to_vec()));
    page_dict.set("Parent", Object::Reference(parent_id));
    page_dict.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(width),
            Object::Real(height),
        ]),
    );
    page_dict.set("Contents", Object::Reference(content_id));
    page_dict.set("Resources", Object::Dictionary(Dictionary::new()));

    doc.add_object(page_dict)
}
