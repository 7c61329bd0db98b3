//! Page geometry helpers shared by reconstruction and form extraction

use crate::constants::DEFAULT_PAGE_DIMENSIONS;
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Maximum depth followed when walking `/Parent` chains
pub(crate) const MAX_TREE_DEPTH: usize = 32;

/// Get page dimensions (width, height) in points.
///
/// Falls back to US Letter when the page has no usable MediaBox.
pub fn get_page_dimensions(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    let Ok(page_dict) = doc.get_dictionary(page_id) else {
        return DEFAULT_PAGE_DIMENSIONS;
    };

    inherited_attribute(doc, page_dict, b"MediaBox")
        .and_then(|obj| resolve(doc, obj).as_array().ok())
        .and_then(|mb| box_dimensions(mb))
        .unwrap_or(DEFAULT_PAGE_DIMENSIONS)
}

/// Width and height of a `[x1 y1 x2 y2]` box
pub(crate) fn box_dimensions(rect: &[Object]) -> Option<(f32, f32)> {
    let [x1, y1, x2, y2] = rect_numbers(rect)?;
    Some(((x2 - x1).abs(), (y2 - y1).abs()))
}

/// The four numbers of a `[x1 y1 x2 y2]` array
pub(crate) fn rect_numbers(rect: &[Object]) -> Option<[f32; 4]> {
    if rect.len() != 4 {
        return None;
    }
    Some([
        extract_number(&rect[0])?,
        extract_number(&rect[1])?,
        extract_number(&rect[2])?,
        extract_number(&rect[3])?,
    ])
}

/// Look up `key` on a page, falling back to its ancestors in the page tree
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    if let Ok(value) = page.get(key) {
        return Some(value);
    }

    let mut current = page;
    for _ in 0..MAX_TREE_DEPTH {
        let parent_id = current.get(b"Parent").ok()?.as_reference().ok()?;
        let parent = doc.get_dictionary(parent_id).ok()?;
        if let Ok(value) = parent.get(key) {
            return Some(value);
        }
        current = parent;
    }
    None
}

/// Follow a single level of indirection
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Extract numeric value from a PDF object
pub(crate) fn extract_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}
