//! Writing user values back into the AcroForm

use super::extract::{on_state, qualified_name};
use super::text::{encode_text, object_text};
use super::{FieldKind, FormField};
use crate::constants::*;
use crate::geometry::{MAX_TREE_DEPTH, inherited_attribute, resolve};
use crate::types::*;
use lopdf::{Document, Object, ObjectId};
use std::collections::HashMap;

/// A terminal field of the AcroForm tree
struct TerminalField {
    id: ObjectId,
    name: String,
    field_type: String,
    flags: i64,
    /// Widget annotations drawing this field (the field itself when merged)
    widgets: Vec<ObjectId>,
}

/// Set the values of `fields` on the document in `bytes`.
///
/// Fields are matched by fully-qualified name and must agree in kind with the
/// document's field; anything else is skipped. Returns the new bytes and the
/// number of fields set. Viewers are asked to regenerate appearances.
pub fn fill_form(bytes: &[u8], fields: &[FormField]) -> Result<(Vec<u8>, usize)> {
    let mut doc = Document::load_mem(bytes)?;

    let mut by_name: HashMap<&str, &FormField> = HashMap::new();
    for field in fields {
        by_name.entry(field.name.as_str()).or_insert(field);
    }

    let terminals = collect_terminal_fields(&doc);
    let mut set_count = 0;
    for terminal in &terminals {
        let Some(user_field) = by_name.get(terminal.name.as_str()) else {
            continue;
        };
        match apply_value(&mut doc, terminal, user_field) {
            Ok(true) => set_count += 1,
            Ok(false) => log::debug!(
                "Field '{}' ({}) does not accept the supplied value",
                terminal.name,
                terminal.field_type
            ),
            Err(e) => log::warn!("Could not set field '{}': {}", terminal.name, e),
        }
    }

    if let Err(e) = request_appearance_regeneration(&mut doc) {
        log::warn!("Could not set NeedAppearances: {}", e);
    }

    let mut writer = Vec::new();
    doc.save_to(&mut writer)?;
    Ok((writer, set_count))
}

fn acro_form_fields(doc: &Document) -> Vec<ObjectId> {
    let Some(acro_form) = doc
        .trailer
        .get(b"Root")
        .ok()
        .and_then(|obj| obj.as_reference().ok())
        .and_then(|id| doc.get_dictionary(id).ok())
        .and_then(|catalog| catalog.get(b"AcroForm").ok())
        .and_then(|obj| resolve(doc, obj).as_dict().ok())
    else {
        return Vec::new();
    };

    acro_form
        .get(b"Fields")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_array().ok())
        .map(|fields| fields.iter().filter_map(|f| f.as_reference().ok()).collect())
        .unwrap_or_default()
}

fn collect_terminal_fields(doc: &Document) -> Vec<TerminalField> {
    let mut terminals = Vec::new();
    let mut stack: Vec<(ObjectId, usize)> = acro_form_fields(doc)
        .into_iter()
        .rev()
        .map(|id| (id, 0))
        .collect();

    while let Some((id, depth)) = stack.pop() {
        let Ok(node) = doc.get_dictionary(id) else {
            continue;
        };
        let kids: Vec<ObjectId> = node
            .get(b"Kids")
            .ok()
            .and_then(|obj| resolve(doc, obj).as_array().ok())
            .map(|kids| kids.iter().filter_map(|k| k.as_reference().ok()).collect())
            .unwrap_or_default();

        // Kids carrying a partial name are fields; the rest are widgets
        let child_fields: Vec<ObjectId> = kids
            .iter()
            .copied()
            .filter(|kid| {
                doc.get_dictionary(*kid)
                    .is_ok_and(|dict| dict.has(b"T"))
            })
            .collect();

        if !child_fields.is_empty() && depth < MAX_TREE_DEPTH {
            stack.extend(child_fields.into_iter().rev().map(|kid| (kid, depth + 1)));
            continue;
        }

        let Some(name) = qualified_name(doc, node) else {
            continue;
        };
        let Some(field_type) = inherited_attribute(doc, node, b"FT")
            .map(|obj| resolve(doc, obj))
            .and_then(object_text)
        else {
            continue;
        };
        let flags = inherited_attribute(doc, node, b"Ff")
            .and_then(|obj| resolve(doc, obj).as_i64().ok())
            .unwrap_or(0);

        terminals.push(TerminalField {
            id,
            name,
            field_type,
            flags,
            widgets: if kids.is_empty() { vec![id] } else { kids },
        });
    }

    terminals
}

/// Returns `Ok(false)` when the user's field kind does not fit the document's
fn apply_value(doc: &mut Document, field: &TerminalField, user: &FormField) -> Result<bool> {
    let is_radio = field.flags & FIELD_FLAG_RADIO != 0;
    let is_pushbutton = field.flags & FIELD_FLAG_PUSHBUTTON != 0;

    match (&user.kind, field.field_type.as_str()) {
        (FieldKind::Text { value, .. }, "Tx") => {
            set_field_value(doc, field.id, encode_text(value))?;
            Ok(true)
        }
        (FieldKind::Checkbox { checked, .. }, "Btn") if !is_radio && !is_pushbutton => {
            let state = if *checked {
                field
                    .widgets
                    .iter()
                    .find_map(|w| doc.get_dictionary(*w).ok().and_then(|d| on_state(doc, d)))
                    .unwrap_or_else(|| "Yes".to_string())
            } else {
                "Off".to_string()
            };
            set_field_value(doc, field.id, Object::Name(state.clone().into_bytes()))?;
            for widget in &field.widgets {
                set_appearance_state(doc, *widget, &state)?;
            }
            Ok(true)
        }
        (FieldKind::Radio { value, .. }, "Btn") if is_radio => {
            if value.is_empty() {
                return Ok(false);
            }
            set_field_value(doc, field.id, Object::Name(value.clone().into_bytes()))?;
            for widget in &field.widgets {
                let matches = doc
                    .get_dictionary(*widget)
                    .ok()
                    .and_then(|d| on_state(doc, d))
                    .is_some_and(|on| on == *value);
                set_appearance_state(doc, *widget, if matches { value.as_str() } else { "Off" })?;
            }
            Ok(true)
        }
        (FieldKind::Select { value, .. }, "Ch") => match value.first().filter(|v| !v.is_empty()) {
            Some(choice) => {
                set_field_value(doc, field.id, encode_text(choice))?;
                Ok(true)
            }
            None => Ok(false),
        },
        _ => Ok(false),
    }
}

fn set_field_value(doc: &mut Document, id: ObjectId, value: Object) -> Result<()> {
    doc.get_object_mut(id)?.as_dict_mut()?.set("V", value);
    Ok(())
}

fn set_appearance_state(doc: &mut Document, widget: ObjectId, state: &str) -> Result<()> {
    doc.get_object_mut(widget)?
        .as_dict_mut()?
        .set("AS", Object::Name(state.as_bytes().to_vec()));
    Ok(())
}

fn request_appearance_regeneration(doc: &mut Document) -> Result<()> {
    let root_id = doc.trailer.get(b"Root")?.as_reference()?;
    let acro_form_ref = doc
        .get_dictionary(root_id)?
        .get(b"AcroForm")
        .ok()
        .and_then(|obj| obj.as_reference().ok());

    let acro_form = match acro_form_ref {
        Some(id) => doc.get_object_mut(id)?.as_dict_mut()?,
        None => match doc.get_object_mut(root_id)?.as_dict_mut()?.get_mut(b"AcroForm") {
            Ok(obj) => obj.as_dict_mut()?,
            // No form at all; nothing to regenerate
            Err(_) => return Ok(()),
        },
    };
    acro_form.set("NeedAppearances", Object::Boolean(true));
    Ok(())
}
