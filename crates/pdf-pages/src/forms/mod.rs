//! Interactive form fields: extraction, validation and filling
//!
//! Fields are read from widget annotations page by page. Filling goes the
//! other way, through the document's AcroForm field tree, matching fields by
//! their fully-qualified name.

mod extract;
mod fill;
mod text;

pub use extract::{extract_form_fields, has_form_fields};
pub use fill::fill_form;

use crate::types::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Field rectangle in points, origin at the top-left of the page
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// An entry of a choice field
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SelectOption {
    pub value: String,
    pub display_value: String,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "lowercase"))]
pub enum FieldKind {
    Text {
        value: String,
        default_value: String,
        multiline: bool,
        max_length: Option<u32>,
        placeholder: String,
    },
    Checkbox {
        checked: bool,
        default_checked: bool,
        export_value: String,
    },
    Radio {
        value: String,
        default_value: String,
        export_value: String,
    },
    Select {
        value: Vec<String>,
        default_value: Vec<String>,
        options: Vec<SelectOption>,
        multi_select: bool,
    },
    Button {
        label: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FormField {
    /// Unique per extraction: `<name>_<page>_<n>`
    pub id: String,
    /// Fully-qualified field name
    pub name: String,
    /// 1-based page the widget sits on
    pub page: u32,
    pub rect: Rect,
    pub required: bool,
    pub read_only: bool,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub kind: FieldKind,
}

/// A user-supplied value for a field
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum FieldValue {
    Bool(bool),
    Text(String),
    List(Vec<String>),
}

impl FormField {
    /// Store `value` if it fits this field's kind. Returns whether it was taken.
    pub fn set_value(&mut self, value: FieldValue) -> bool {
        match (&mut self.kind, value) {
            (FieldKind::Text { value: current, .. }, FieldValue::Text(text)) => {
                *current = text;
                true
            }
            (FieldKind::Checkbox { checked, .. }, FieldValue::Bool(on)) => {
                *checked = on;
                true
            }
            (FieldKind::Radio { value: current, .. }, FieldValue::Text(choice)) => {
                *current = choice;
                true
            }
            (FieldKind::Select { value: current, .. }, FieldValue::Text(choice)) => {
                *current = if choice.is_empty() { Vec::new() } else { vec![choice] };
                true
            }
            (
                FieldKind::Select {
                    value: current,
                    multi_select,
                    ..
                },
                FieldValue::List(choices),
            ) => {
                *current = if *multi_select {
                    choices
                } else {
                    choices.into_iter().take(1).collect()
                };
                true
            }
            _ => false,
        }
    }

    fn is_filled(&self) -> bool {
        match &self.kind {
            FieldKind::Text { value, .. } | FieldKind::Radio { value, .. } => {
                !value.trim().is_empty()
            }
            FieldKind::Checkbox { checked, .. } => *checked,
            FieldKind::Select { value, .. } => value.iter().any(|v| !v.is_empty()),
            FieldKind::Button { .. } => true,
        }
    }
}

/// Parse `bytes` and extract their form fields
pub fn load_form_fields(bytes: &[u8]) -> Result<Vec<FormField>> {
    let doc = lopdf::Document::load_mem(bytes)?;
    Ok(extract_form_fields(&doc))
}

/// Messages for required, writable fields that are still empty
pub fn validate_form_fields(fields: &[FormField]) -> Vec<String> {
    fields
        .iter()
        .filter(|f| f.required && !f.read_only && !f.is_filled())
        .map(|f| format!("{} is required", f.name))
        .collect()
}
