//! Typed reference records and the form aggregate that owns them.

pub mod reference;
pub mod wire;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub use reference::{
    GapDetails, Identity, OccupationDetails, PeriodKind, PeriodReference, PersonalReference,
    ReferenceTypeId, WorkDetails, WorkKind,
};
pub use wire::ReferenceRecord;

use crate::raw::{FieldValue, FieldValues};

/// Errors raised when decoding persisted references.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Neither a persistence id nor a local handle is present.
    #[error("reference has neither a saved id nor an unsaved handle")]
    MissingIdentity,

    #[error("unsaved handle {0} is out of range")]
    HandleOutOfRange(u64),

    #[error("unknown reference type id {0}")]
    UnknownReferenceType(i64),

    #[error("reference type '{found}' where {expected} was expected")]
    UnexpectedReferenceType {
        found: ReferenceTypeId,
        expected: &'static str,
    },
}

// ---------------------------------------------------------------------------
// GlobalFields
// ---------------------------------------------------------------------------

/// Form-level fields that are not part of any reference (parent names and
/// the like). Stored by field name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalFields(BTreeMap<String, FieldValue>);

impl GlobalFields {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    /// Overlay freshly read values; fields not present in `values` keep
    /// their previous value.
    #[must_use]
    pub fn merged(&self, values: FieldValues) -> Self {
        let mut next = self.0.clone();
        next.extend(values.0);
        Self(next)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// FormState
// ---------------------------------------------------------------------------

/// The whole editing session's data. Replaced wholesale on every change.
///
/// Records sit behind `Arc` so callers can detect which ones changed with
/// `Arc::ptr_eq`; `PartialEq` compares by value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "FormStateRecord", try_from = "FormStateRecord")]
pub struct FormState {
    pub globals: GlobalFields,
    pub occupations: Vec<Arc<PeriodReference>>,
    pub persons: Vec<Arc<PersonalReference>>,
}

impl FormState {
    #[must_use]
    pub fn new(
        globals: GlobalFields,
        occupations: Vec<PeriodReference>,
        persons: Vec<PersonalReference>,
    ) -> Self {
        Self {
            globals,
            occupations: occupations.into_iter().map(Arc::new).collect(),
            persons: persons.into_iter().map(Arc::new).collect(),
        }
    }

    /// Position of `occupation` by reference identity.
    #[must_use]
    pub fn occupation_index(&self, occupation: &Arc<PeriodReference>) -> Option<usize> {
        self.occupations
            .iter()
            .position(|o| Arc::ptr_eq(o, occupation))
    }

    #[must_use]
    pub fn person_index(&self, person: &Arc<PersonalReference>) -> Option<usize> {
        self.persons.iter().position(|p| Arc::ptr_eq(p, person))
    }

    /// Every handle used by an unsaved record.
    pub fn unsaved_handles(&self) -> impl Iterator<Item = crate::identity::Handle> + '_ {
        self.occupations
            .iter()
            .map(|o| o.identity)
            .chain(self.persons.iter().map(|p| p.identity))
            .filter_map(|identity| identity.handle())
    }
}

/// Serialized form of [`FormState`].
///
/// Deserializing this checks only the JSON shape. `FormState::try_from`
/// then checks each record and reports a [`ModelError`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormStateRecord {
    #[serde(rename = "globals")]
    globals: GlobalFields,
    #[serde(rename = "OccupationReferences")]
    occupations: Vec<ReferenceRecord>,
    #[serde(rename = "PersonalReferences")]
    persons: Vec<ReferenceRecord>,
}

impl From<FormState> for FormStateRecord {
    fn from(state: FormState) -> Self {
        Self {
            globals: state.globals,
            occupations: state
                .occupations
                .into_iter()
                .map(|o| ReferenceRecord::from(Arc::unwrap_or_clone(o)))
                .collect(),
            persons: state
                .persons
                .into_iter()
                .map(|p| ReferenceRecord::from(Arc::unwrap_or_clone(p)))
                .collect(),
        }
    }
}

impl TryFrom<FormStateRecord> for FormState {
    type Error = ModelError;

    fn try_from(record: FormStateRecord) -> Result<Self, Self::Error> {
        let occupations = record
            .occupations
            .into_iter()
            .map(PeriodReference::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let persons = record
            .persons
            .into_iter()
            .map(PersonalReference::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(record.globals, occupations, persons))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
