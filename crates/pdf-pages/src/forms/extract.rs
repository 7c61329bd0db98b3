//! Reading fields from widget annotations

use super::text::object_text;
use super::{FieldKind, FormField, Rect, SelectOption};
use crate::constants::*;
use crate::geometry::{MAX_TREE_DEPTH, get_page_dimensions, inherited_attribute, rect_numbers, resolve};
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Every form field on every page, in page order.
///
/// Widgets without a usable rectangle or field type are skipped. Unnamed
/// fields are called `field_<page>_<n>`.
pub fn extract_form_fields(doc: &Document) -> Vec<FormField> {
    let mut fields = Vec::new();

    for (page_number, page_id) in doc.get_pages() {
        let (_, page_height) = get_page_dimensions(doc, page_id);
        let mut page_fields: Vec<FormField> = Vec::new();
        for widget in page_widgets(doc, page_id) {
            let ordinal = page_fields.len();
            if let Some(field) = read_field(doc, widget, page_number, page_height, ordinal) {
                page_fields.push(field);
            }
        }
        fields.extend(page_fields);
    }

    log::debug!("Extracted {} form fields", fields.len());
    fields
}

/// Whether any of the first few pages carries a widget annotation
pub fn has_form_fields(doc: &Document) -> bool {
    doc.get_pages()
        .into_values()
        .take(FORM_PROBE_PAGES as usize)
        .any(|page_id| !page_widgets(doc, page_id).is_empty())
}

fn page_widgets(doc: &Document, page_id: ObjectId) -> Vec<&Dictionary> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };
    let Some(annots) = page
        .get(b"Annots")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_array().ok())
    else {
        return Vec::new();
    };

    annots
        .iter()
        .filter_map(|annot| resolve(doc, annot).as_dict().ok())
        .filter(|annot| matches!(annot.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Widget"))
        .collect()
}

fn read_field(
    doc: &Document,
    widget: &Dictionary,
    page: u32,
    page_height: f32,
    ordinal: usize,
) -> Option<FormField> {
    let [x1, y1, x2, y2] = widget
        .get(b"Rect")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_array().ok())
        .and_then(|rect| rect_numbers(rect))?;
    let rect = Rect {
        x: x1.min(x2),
        y: page_height - y1.max(y2),
        width: (x2 - x1).abs(),
        height: (y2 - y1).abs(),
    };

    let field_type = attribute(doc, widget, b"FT").and_then(object_text)?;
    let name = qualified_name(doc, widget).unwrap_or_else(|| format!("field_{}_{}", page, ordinal));
    let flags = attribute(doc, widget, b"Ff")
        .and_then(|obj| obj.as_i64().ok())
        .unwrap_or(0);

    let value = attribute(doc, widget, b"V");
    let default_value = attribute(doc, widget, b"DV");
    let text_of = |obj: Option<&Object>| obj.and_then(object_text).unwrap_or_default();

    let kind = match field_type.as_str() {
        "Tx" => FieldKind::Text {
            value: text_of(value),
            default_value: text_of(default_value),
            multiline: flags & FIELD_FLAG_MULTILINE != 0,
            max_length: attribute(doc, widget, b"MaxLen")
                .and_then(|obj| obj.as_i64().ok())
                .and_then(|n| u32::try_from(n).ok()),
            placeholder: text_of(attribute(doc, widget, b"TU")),
        },
        "Btn" if flags & FIELD_FLAG_PUSHBUTTON != 0 => FieldKind::Button {
            label: caption(doc, widget)
                .or_else(|| attribute(doc, widget, b"TU").and_then(object_text))
                .unwrap_or_else(|| "Button".to_string()),
        },
        "Btn" if flags & FIELD_FLAG_RADIO != 0 => FieldKind::Radio {
            value: text_of(value),
            default_value: text_of(default_value),
            export_value: on_state(doc, widget).unwrap_or_else(|| name.clone()),
        },
        "Btn" => FieldKind::Checkbox {
            checked: is_on(value.or_else(|| widget.get(b"AS").ok())),
            default_checked: is_on(default_value),
            export_value: on_state(doc, widget).unwrap_or_else(|| "Yes".to_string()),
        },
        "Ch" => FieldKind::Select {
            value: choice_values(doc, value),
            default_value: choice_values(doc, default_value),
            options: choice_options(doc, widget),
            multi_select: flags & FIELD_FLAG_MULTI_SELECT != 0,
        },
        other => {
            log::debug!("Skipping field '{}' with type {}", name, other);
            return None;
        }
    };

    Some(FormField {
        id: format!("{}_{}_{}", name, page, ordinal),
        name,
        page,
        rect,
        required: flags & FIELD_FLAG_REQUIRED != 0,
        read_only: flags & FIELD_FLAG_READ_ONLY != 0,
        kind,
    })
}

/// Field attribute, inherited through the field hierarchy, indirection resolved
fn attribute<'a>(doc: &'a Document, widget: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    inherited_attribute(doc, widget, key).map(|obj| resolve(doc, obj))
}

/// Partial names joined with `.` from the root field down
pub(super) fn qualified_name(doc: &Document, node: &Dictionary) -> Option<String> {
    let mut parts = Vec::new();
    let mut current = Some(node);

    for _ in 0..MAX_TREE_DEPTH {
        let Some(dict) = current else { break };
        if let Some(part) = dict.get(b"T").ok().and_then(object_text) {
            parts.push(part);
        }
        current = dict
            .get(b"Parent")
            .ok()
            .and_then(|obj| obj.as_reference().ok())
            .and_then(|id| doc.get_dictionary(id).ok());
    }

    if parts.is_empty() {
        return None;
    }
    parts.reverse();
    Some(parts.join("."))
}

/// The widget's "on" appearance state: any normal appearance other than Off
pub(super) fn on_state(doc: &Document, widget: &Dictionary) -> Option<String> {
    let appearances = widget
        .get(b"AP")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_dict().ok())?;
    let normal = appearances
        .get(b"N")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_dict().ok())?;
    normal
        .iter()
        .map(|(state, _)| state)
        .find(|state| state.as_slice() != b"Off")
        .map(|state| String::from_utf8_lossy(state).into_owned())
}

fn is_on(obj: Option<&Object>) -> bool {
    obj.and_then(object_text)
        .is_some_and(|state| !state.is_empty() && state != "Off")
}

fn caption(doc: &Document, widget: &Dictionary) -> Option<String> {
    widget
        .get(b"MK")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_dict().ok())
        .and_then(|mk| mk.get(b"CA").ok())
        .and_then(object_text)
}

fn choice_values(doc: &Document, obj: Option<&Object>) -> Vec<String> {
    match obj {
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|item| object_text(resolve(doc, item)))
            .collect(),
        Some(other) => object_text(other)
            .filter(|value| !value.is_empty())
            .into_iter()
            .collect(),
        None => Vec::new(),
    }
}

fn choice_options(doc: &Document, widget: &Dictionary) -> Vec<SelectOption> {
    let Some(Object::Array(entries)) = attribute(doc, widget, b"Opt") else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match resolve(doc, entry) {
            Object::Array(pair) if pair.len() == 2 => Some(SelectOption {
                value: object_text(resolve(doc, &pair[0]))?,
                display_value: object_text(resolve(doc, &pair[1]))?,
            }),
            other => object_text(other).map(|text| SelectOption {
                value: text.clone(),
                display_value: text,
            }),
        })
        .collect()
}
