//! Raw form input captured on an edit event.
//!
//! The rendering layer hands over one [`RawFieldGroup`] per visible record
//! card (plus an optional group for the global fields) and the id of the
//! control that fired the event. Nothing here fails: malformed values are
//! coerced to `None` / `false` and logged at debug level.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dates::parse_date_prefix;

/// Opaque id of one input control, stable for the lifetime of the control.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ControlId(pub u64);

/// What kind of control produced a value. Decides how the value is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    #[default]
    Text,
    Checkbox,
    Date,
    Select,
    Hidden,
    TextArea,
}

/// Snapshot of one control.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawControl {
    pub id: ControlId,
    pub name: String,
    pub kind: ControlKind,
    pub value: String,
    pub checked: bool,
    pub disabled: bool,
}

/// Controls belonging to one record card, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFieldGroup {
    pub controls: Vec<RawControl>,
}

/// Everything visible on the form at the time of one edit event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSnapshot {
    pub globals: Option<RawFieldGroup>,
    pub occupations: Vec<RawFieldGroup>,
    pub persons: Vec<RawFieldGroup>,
    /// Control that fired the event, if known.
    pub changed: Option<ControlId>,
}

// ---------------------------------------------------------------------------
// FieldValue
// ---------------------------------------------------------------------------

/// A control value after control-type coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
    Null,
}

impl FieldValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Flag(_) | Self::Null => None,
        }
    }

    /// Loose truthiness: non-empty text or `true`.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Flag(b) => *b,
            Self::Text(s) => !s.is_empty(),
            Self::Null => false,
        }
    }
}

impl RawControl {
    /// Coerce by control type: checkbox → flag, empty date → null, else text.
    #[must_use]
    pub fn field_value(&self) -> FieldValue {
        match self.kind {
            ControlKind::Checkbox => FieldValue::Flag(self.checked),
            ControlKind::Date if self.value.is_empty() => FieldValue::Null,
            ControlKind::Date
            | ControlKind::Text
            | ControlKind::Select
            | ControlKind::Hidden
            | ControlKind::TextArea => FieldValue::Text(self.value.clone()),
        }
    }
}

impl RawFieldGroup {
    /// Name → value for every enabled, named control. A later control with
    /// the same name overrides an earlier one.
    #[must_use]
    pub fn values(&self) -> FieldValues {
        let mut map = BTreeMap::new();
        for control in &self.controls {
            if control.disabled || control.name.is_empty() {
                continue;
            }
            map.insert(control.name.clone(), control.field_value());
        }
        FieldValues(map)
    }

    #[must_use]
    pub fn contains(&self, id: ControlId) -> bool {
        self.controls.iter().any(|c| c.id == id)
    }
}

// ---------------------------------------------------------------------------
// FieldValues
// ---------------------------------------------------------------------------

/// Coerced values of one group, with lenient typed accessors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldValues(pub BTreeMap<String, FieldValue>);

impl FieldValues {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    /// Numeric identity field: empty, absent or non-numeric → `None`.
    #[must_use]
    pub fn id(&self, name: &str) -> Option<i64> {
        coerce_id(self.get(name))
    }

    /// Text that is kept even when empty. Absent → empty string.
    #[must_use]
    pub fn text(&self, name: &str) -> String {
        self.get(name)
            .and_then(FieldValue::as_text)
            .unwrap_or_default()
            .to_string()
    }

    /// Optional text: absent or null → `None`.
    #[must_use]
    pub fn opt_text(&self, name: &str) -> Option<String> {
        coerce_text(self.get(name))
    }

    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        coerce_flag(self.get(name))
    }

    #[must_use]
    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        coerce_date(name, self.get(name))
    }
}

// ---------------------------------------------------------------------------
// Coercions
// ---------------------------------------------------------------------------

/// Empty or non-numeric ids become `None`.
#[must_use]
pub fn coerce_id(value: Option<&FieldValue>) -> Option<i64> {
    let text = value?.as_text()?.trim();
    if text.is_empty() {
        return None;
    }
    match text.parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::debug!(raw = text, "non-numeric identity field coerced to null");
            None
        }
    }
}

#[must_use]
pub fn coerce_text(value: Option<&FieldValue>) -> Option<String> {
    match value? {
        FieldValue::Text(s) => Some(s.clone()),
        FieldValue::Flag(b) => Some(b.to_string()),
        FieldValue::Null => None,
    }
}

/// Checkbox flags pass through; text counts as `true` for `"true"`, `"on"`
/// and `"1"` (hidden inputs echo flags back as text).
#[must_use]
pub fn coerce_flag(value: Option<&FieldValue>) -> bool {
    match value {
        Some(FieldValue::Flag(b)) => *b,
        Some(FieldValue::Text(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "on" | "1"
        ),
        Some(FieldValue::Null) | None => false,
    }
}

#[must_use]
pub fn coerce_date(name: &str, value: Option<&FieldValue>) -> Option<NaiveDate> {
    let text = value?.as_text()?;
    if text.is_empty() {
        return None;
    }
    let parsed = parse_date_prefix(text);
    if parsed.is_none() {
        tracing::debug!(field = name, raw = text, "unparseable date coerced to null");
    }
    parsed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn control(id: u64, name: &str, kind: ControlKind, value: &str) -> RawControl {
        RawControl {
            id: ControlId(id),
            name: name.to_string(),
            kind,
            value: value.to_string(),
            ..RawControl::default()
        }
    }

    #[test]
    fn control_type_decides_coercion() {
        let mut checkbox = control(1, "ContactCurrentEmployer", ControlKind::Checkbox, "on");
        checkbox.checked = true;
        assert_eq!(checkbox.field_value(), FieldValue::Flag(true));

        let empty_date = control(2, "EndDate", ControlKind::Date, "");
        assert_eq!(empty_date.field_value(), FieldValue::Null);

        let text = control(3, "CompanyName", ControlKind::Text, "");
        assert_eq!(text.field_value(), FieldValue::Text(String::new()));
    }

    #[test]
    fn disabled_and_unnamed_controls_are_skipped() {
        let mut disabled = control(1, "CompanyName", ControlKind::Text, "Acme");
        disabled.disabled = true;
        let unnamed = control(2, "", ControlKind::Text, "x");
        let group = RawFieldGroup {
            controls: vec![disabled, unnamed],
        };
        assert!(group.values().0.is_empty());
    }

    #[test]
    fn later_control_overrides_earlier() {
        let group = RawFieldGroup {
            controls: vec![
                control(1, "Phone", ControlKind::Text, "111"),
                control(2, "Phone", ControlKind::Text, "222"),
            ],
        };
        assert_eq!(group.values().opt_text("Phone").as_deref(), Some("222"));
    }

    #[test]
    fn identity_fields_coerce_to_number_or_null() {
        let group = RawFieldGroup {
            controls: vec![
                control(1, "OriginalApplicantReferenceId", ControlKind::Hidden, "42"),
                control(2, "ApplicantReferenceRequestId", ControlKind::Hidden, ""),
                control(3, "__unsavedId", ControlKind::Hidden, "abc"),
            ],
        };
        let values = group.values();
        assert_eq!(values.id("OriginalApplicantReferenceId"), Some(42));
        assert_eq!(values.id("ApplicantReferenceRequestId"), None);
        assert_eq!(values.id("__unsavedId"), None);
        assert_eq!(values.id("Missing"), None);
    }

    #[test]
    fn flags_from_hidden_text() {
        assert!(coerce_flag(Some(&FieldValue::Text("true".into()))));
        assert!(!coerce_flag(Some(&FieldValue::Text(String::new()))));
        assert!(!coerce_flag(None));
    }

    #[test]
    fn malformed_dates_become_null() {
        let v = FieldValue::Text("not a date".into());
        assert_eq!(coerce_date("StartDate", Some(&v)), None);
        let ok = FieldValue::Text("2024-02-29".into());
        assert!(coerce_date("StartDate", Some(&ok)).is_some());
    }

    #[test]
    fn snapshot_deserializes_with_defaults() {
        let json = r#"{
            "occupations": [{"controls": [{"id": 7, "name": "StartDate", "kind": "date", "value": "2021-01-01"}]}],
            "changed": 7
        }"#;
        let snap: RawSnapshot = serde_json::from_str(json).unwrap();
        assert!(snap.globals.is_none());
        assert!(snap.persons.is_empty());
        assert!(snap.occupations[0].contains(ControlId(7)));
        assert_eq!(snap.changed, Some(ControlId(7)));
    }
}
