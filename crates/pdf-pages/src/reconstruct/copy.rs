//! Page copying between documents
//!
//! A page is copied by rebuilding its dictionary in the output document and
//! deep-copying everything it references. Objects already copied from the
//! same source are reused, so pages sharing fonts or images (or duplicated
//! pages sharing content) carry a single copy. Annotations are the
//! exception: each copy of a page gets its own.

use crate::geometry::{inherited_attribute, resolve};
use crate::types::ReconstructionError;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;

/// Page attributes that may live on an ancestor `/Pages` node
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

// =============================================================================
// Page Copy
// =============================================================================

/// Copy one source page into `output` as a child of `parent_id`.
///
/// # Arguments
/// * `output` - The document being built
/// * `source` - The document containing the page
/// * `page_id` - Object ID of the page in `source`
/// * `parent_id` - The output `/Pages` node
/// * `cache` - Source object ID to output object ID map for this source
pub(crate) fn copy_page(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    parent_id: ObjectId,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<ObjectId, ReconstructionError> {
    let page_dict = source.get_dictionary(page_id)?;
    let new_page_id = output.new_object_id();

    let mut new_page = Dictionary::new();
    for (key, value) in page_dict.iter() {
        match key.as_slice() {
            b"Parent" => {}
            b"Annots" => {
                if let Some(annots) = copy_annotations(output, source, value, new_page_id, cache)? {
                    new_page.set("Annots", annots);
                }
            }
            _ => new_page.set(key.clone(), copy_object_deep(output, source, value, cache)?),
        }
    }

    // The page leaves its source tree, so inherited attributes become its own
    for key in INHERITABLE_KEYS {
        if new_page.has(key) {
            continue;
        }
        if let Some(value) = inherited_attribute(source, page_dict, key) {
            new_page.set(key.to_vec(), copy_object_deep(output, source, value, cache)?);
        }
    }

    new_page.set("Parent", Object::Reference(parent_id));
    output.objects.insert(new_page_id, Object::Dictionary(new_page));
    Ok(new_page_id)
}

// =============================================================================
// Annotations
// =============================================================================

/// Copy a page's `/Annots` into fresh objects owned by `page_id`.
///
/// While copying, the shared cache maps this page's annotations to their new
/// copies, so popups and replies link to siblings on the same page. The
/// mapping is withdrawn afterwards; appearance streams and fonts stay shared.
/// Returns `None` when `/Annots` is not an array.
fn copy_annotations(
    output: &mut Document,
    source: &Document,
    annots: &Object,
    page_id: ObjectId,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Option<Object>, ReconstructionError> {
    let Ok(entries) = resolve(source, annots).as_array() else {
        return Ok(None);
    };

    let mut own: Vec<(ObjectId, ObjectId)> = Vec::new();
    let mut shadowed: Vec<(ObjectId, Option<ObjectId>)> = Vec::new();
    for entry in entries {
        let Ok(id) = entry.as_reference() else {
            continue;
        };
        if own.iter().any(|(old, _)| *old == id) || source.get_object(id).is_err() {
            continue;
        }
        let new_id = output.new_object_id();
        shadowed.push((id, cache.insert(id, new_id)));
        own.push((id, new_id));
    }

    let copied = copy_annotation_entries(output, source, entries, &own, page_id, cache);

    for (id, previous) in shadowed {
        match previous {
            Some(previous) => cache.insert(id, previous),
            None => cache.remove(&id),
        };
    }
    copied.map(|entries| Some(Object::Array(entries)))
}

fn copy_annotation_entries(
    output: &mut Document,
    source: &Document,
    entries: &[Object],
    own: &[(ObjectId, ObjectId)],
    page_id: ObjectId,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Vec<Object>, ReconstructionError> {
    for (old_id, new_id) in own {
        let mut annot = copy_object_deep(output, source, source.get_object(*old_id)?, cache)?;
        set_owner(&mut annot, page_id);
        output.objects.insert(*new_id, annot);
    }

    let mut copied = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            Object::Reference(id) => {
                // Dangling entries are dropped
                if let Some((_, new_id)) = own.iter().find(|(old, _)| old == id) {
                    copied.push(Object::Reference(*new_id));
                }
            }
            inline => {
                let mut annot = copy_object_deep(output, source, inline, cache)?;
                set_owner(&mut annot, page_id);
                copied.push(annot);
            }
        }
    }
    Ok(copied)
}

fn set_owner(annot: &mut Object, page_id: ObjectId) {
    if let Object::Dictionary(dict) = annot {
        dict.set("P", Object::Reference(page_id));
    }
}

// =============================================================================
// Deep Copy
// =============================================================================

/// Deep copy an object from source to output document, following references.
///
/// References to page tree nodes (annotation `/P` back-links, explicit
/// destinations) become `null`. Dangling references do the same.
pub(crate) fn copy_object_deep(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object, ReconstructionError> {
    match obj {
        Object::Reference(id) => {
            // Check cache first
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }

            let Ok(referenced) = source.get_object(*id) else {
                return Ok(Object::Null);
            };
            if is_page_tree_node(referenced) {
                return Ok(Object::Null);
            }

            // Reserve the output id before recursing so cycles terminate
            let new_id = output.new_object_id();
            cache.insert(*id, new_id);
            let copied = copy_object_deep(output, source, referenced, cache)?;
            output.objects.insert(new_id, copied);

            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in dict.iter() {
                new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
            }
            Ok(Object::Dictionary(new_dict))
        }
        Object::Array(arr) => {
            let new_arr: Result<Vec<_>, _> = arr
                .iter()
                .map(|item| copy_object_deep(output, source, item, cache))
                .collect();
            Ok(Object::Array(new_arr?))
        }
        Object::Stream(stream) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
            }
            Ok(Object::Stream(Stream {
                dict: new_dict,
                content: stream.content.clone(),
                allows_compression: stream.allows_compression,
                start_position: None,
            }))
        }
        // Primitive types: just clone
        _ => Ok(obj.clone()),
    }
}

fn is_page_tree_node(obj: &Object) -> bool {
    let Object::Dictionary(dict) = obj else {
        return false;
    };
    matches!(
        dict.get(b"Type"),
        Ok(Object::Name(name)) if name.as_slice() == b"Page" || name.as_slice() == b"Pages"
    )
}
