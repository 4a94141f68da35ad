//! Field normalization.
//!
//! The search endpoint wraps text in different envelopes depending on the
//! column type:
//!
//! | Column | Wire shape |
//! |--------|-----------|
//! | Plain text | `"hello"` |
//! | Rich text | `[{"type": "text", "text": "hello"}, ...]` |
//! | Formula / lookup | `{"type": 1, "value": [{"text": "hello", ...}]}` |
//!
//! [`normalize`] collapses the last two into the plain string so the
//! reconciler only ever sees scalars. Anything else passes through as is.

use serde_json::{Map, Value};

use crate::models::RawRecord;

/// Normalize a page (or several concatenated pages) of raw items.
///
/// Input that is not an array, or an empty array, yields no records.
/// Items without a `fields` object are dropped.
pub fn normalize(items: &Value) -> Vec<RawRecord> {
    let Some(items) = items.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item.get("fields") {
            Some(Value::Object(fields)) => Some(RawRecord::new(normalize_fields(fields.clone()))),
            _ => {
                tracing::debug!(item = %item, "skipping record without fields");
                None
            }
        })
        .collect()
}

/// Normalize every value of one record's field map.
pub fn normalize_fields(fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(name, value)| (name, normalize_field(value)))
        .collect()
}

/// Collapse a single field value to its text when it has a known envelope.
pub fn normalize_field(value: Value) -> Value {
    if let Some(text) = rich_text(&value).or_else(|| formula_text(&value)) {
        return text.clone();
    }
    value
}

/// `[{"type": "text", "text": ...}, ...]`
fn rich_text(value: &Value) -> Option<&Value> {
    let first = value.as_array()?.first()?.as_object()?;
    if first.get("type")?.as_str()? != "text" {
        return None;
    }
    first.get("text")
}

/// `{"type": 1, "value": [{"text": ...}, ...]}`
fn formula_text(value: &Value) -> Option<&Value> {
    let obj = value.as_object()?;
    if obj.get("type")?.as_f64()? != 1.0 {
        return None;
    }
    obj.get("value")?.as_array()?.first()?.as_object()?.get("text")
}
