//! Flat wire shape shared by persisted JSON and raw form input.
//!
//! The persistence collaborator stores every reference as one flat object
//! whose discriminator is `ReferenceTypeValueId`. Field names here must match
//! it exactly; `OriginalApplicantReferenceId` and
//! `ApplicantReferenceRequestId` are opaque ids that cross the boundary.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::reference::{
    GapDetails, Identity, OccupationDetails, PeriodKind, PeriodReference, PersonalReference,
    ReferenceTypeId, WorkDetails, WorkKind,
};
use super::ModelError;
use crate::dates::parse_date_prefix;
use crate::identity::Handle;
use crate::raw::FieldValues;

pub const FIELD_REFERENCE_TYPE: &str = "ReferenceTypeValueId";
pub const FIELD_ORIGINAL_ID: &str = "OriginalApplicantReferenceId";
pub const FIELD_REQUEST_ID: &str = "ApplicantReferenceRequestId";
pub const FIELD_UNSAVED_ID: &str = "__unsavedId";
pub const FIELD_CHANGED: &str = "__changed";

/// One reference as a flat record. Every field is optional on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ReferenceRecord {
    pub reference_type_value_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_applicant_reference_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicant_reference_request_id: Option<i64>,
    #[serde(rename = "__unsavedId", skip_serializing_if = "Option::is_none")]
    pub unsaved_id: Option<u64>,
    #[serde(rename = "__changed", skip_serializing_if = "is_false")]
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(deserialize_with = "lenient_date", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient_date", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referee_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_current_employer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_for_not_contact_current_employer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_activities: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_support: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation_frequency: Option<String>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Accept `YYYY-MM-DD`, an ISO datetime, null or garbage (→ `None`).
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_date_prefix))
}

impl ReferenceRecord {
    /// Build a record from coerced form values. Never fails; anything that
    /// does not coerce is left absent.
    #[must_use]
    pub fn from_fields(values: &FieldValues) -> Self {
        Self {
            reference_type_value_id: values.id(FIELD_REFERENCE_TYPE),
            original_applicant_reference_id: values.id(FIELD_ORIGINAL_ID),
            applicant_reference_request_id: values.id(FIELD_REQUEST_ID),
            unsaved_id: values
                .id(FIELD_UNSAVED_ID)
                .and_then(|id| u64::try_from(id).ok()),
            changed: values.flag(FIELD_CHANGED),
            address: values.opt_text("Address"),
            start_date: values.date("StartDate"),
            end_date: values.date("EndDate"),
            company_name: values.opt_text("CompanyName"),
            email: values.opt_text("Email"),
            phone: values.opt_text("Phone"),
            job_role: values.opt_text("JobRole"),
            referee_name: values.opt_text("RefereeName"),
            contact_current_employer: values
                .get("ContactCurrentEmployer")
                .map(|_| values.flag("ContactCurrentEmployer")),
            reason_for_not_contact_current_employer: values
                .opt_text("ReasonForNotContactCurrentEmployer"),
            comments: values.opt_text("Comments"),
            gap_reason: values.opt_text("GapReason"),
            gap_activities: values.opt_text("GapActivities"),
            gap_support: values.opt_text("GapSupport"),
            occupation: values.opt_text("Occupation"),
            relation_duration: values.opt_text("RelationDuration"),
            relation_type: values.opt_text("RelationType"),
            relation_frequency: values.opt_text("RelationFrequency"),
        }
    }

    /// Identity carried by the record. Saved ids win over a local handle.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        Identity::saved(
            self.original_applicant_reference_id,
            self.applicant_reference_request_id,
        )
        .or_else(|| self.unsaved_id.map(|h| Identity::unsaved(Handle::from_raw(h))))
    }

    /// Identity of a persisted record, which must carry one.
    fn persisted_identity(&self) -> Result<Identity, ModelError> {
        if let Some(handle) = self.unsaved_id.filter(|h| *h > Handle::MAX.get()) {
            return Err(ModelError::HandleOutOfRange(handle));
        }
        self.identity().ok_or(ModelError::MissingIdentity)
    }

    /// Decode the occupation variant from the discriminator.
    ///
    /// # Errors
    ///
    /// [`ModelError::UnknownReferenceType`] for an id outside the known list,
    /// [`ModelError::UnexpectedReferenceType`] for a personal-contact id.
    pub fn period_kind(&self) -> Result<PeriodKind, ModelError> {
        let Some(id) = self.reference_type_value_id else {
            return Ok(PeriodKind::New);
        };
        let ty = ReferenceTypeId::from_id(id).ok_or(ModelError::UnknownReferenceType(id))?;
        let kind = match ty {
            ReferenceTypeId::Gap => PeriodKind::Gap(GapDetails {
                gap_reason: self.gap_reason.clone().unwrap_or_default(),
                gap_activities: self.gap_activities.clone(),
                gap_support: self.gap_support.clone(),
            }),
            ReferenceTypeId::Education => PeriodKind::Education(self.occupation_details()),
            ReferenceTypeId::PersonalContact => {
                return Err(ModelError::UnexpectedReferenceType {
                    found: ty,
                    expected: "an occupation period",
                });
            }
            ReferenceTypeId::EmploymentAgency
            | ReferenceTypeId::Employment
            | ReferenceTypeId::SelfEmployment
            | ReferenceTypeId::FamilyBusiness
            | ReferenceTypeId::Voluntary
            | ReferenceTypeId::BenefitsOffice => PeriodKind::Work {
                kind: WorkKind::from_reference_type(ty).unwrap_or(WorkKind::Employment),
                details: WorkDetails {
                    occupation: self.occupation_details(),
                    referee_name: self.referee_name.clone(),
                    contact_current_employer_allowed: self
                        .contact_current_employer
                        .unwrap_or(false),
                    reason_if_not_allowed: self.reason_for_not_contact_current_employer.clone(),
                    leaving_comments: self.comments.clone(),
                },
            },
        };
        Ok(kind)
    }

    fn occupation_details(&self) -> OccupationDetails {
        OccupationDetails {
            company_name: self.company_name.clone().unwrap_or_default(),
            contact_email: self.email.clone().unwrap_or_default(),
            phone: self.phone.clone(),
            job_role: self.job_role.clone(),
        }
    }

    /// Assemble a period with an already resolved identity and kind.
    #[must_use]
    pub fn into_period(self, identity: Identity, kind: PeriodKind) -> PeriodReference {
        PeriodReference {
            identity,
            changed: self.changed,
            address: self.address,
            start_date: self.start_date,
            end_date: self.end_date,
            kind,
        }
    }

    /// Assemble a personal reference with an already resolved identity.
    #[must_use]
    pub fn into_person(self, identity: Identity) -> PersonalReference {
        PersonalReference {
            identity,
            changed: self.changed,
            address: self.address,
            referee_name: self.referee_name.unwrap_or_default(),
            occupation: self.occupation.unwrap_or_default(),
            relation_duration: self.relation_duration.unwrap_or_default(),
            relation_type: self.relation_type.unwrap_or_default(),
            relation_frequency: self.relation_frequency.unwrap_or_default(),
            contact_email: self.email.unwrap_or_default(),
            phone: self.phone,
        }
    }

    fn with_identity(mut self, identity: Identity) -> Self {
        match identity {
            Identity::Saved {
                original_reference_id,
                request_id,
            } => {
                self.original_applicant_reference_id = original_reference_id;
                self.applicant_reference_request_id = request_id;
            }
            Identity::Unsaved { handle } => self.unsaved_id = Some(handle.get()),
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl TryFrom<ReferenceRecord> for PeriodReference {
    type Error = ModelError;

    fn try_from(record: ReferenceRecord) -> Result<Self, Self::Error> {
        let identity = record.persisted_identity()?;
        let kind = record.period_kind()?;
        Ok(record.into_period(identity, kind))
    }
}

impl From<PeriodReference> for ReferenceRecord {
    fn from(period: PeriodReference) -> Self {
        let mut record = Self {
            reference_type_value_id: period.reference_type().map(ReferenceTypeId::id),
            changed: period.changed,
            address: period.address,
            start_date: period.start_date,
            end_date: period.end_date,
            ..Self::default()
        };
        match period.kind {
            PeriodKind::New => {}
            PeriodKind::Education(o) => record.set_occupation(o),
            PeriodKind::Work { details, .. } => {
                record.set_occupation(details.occupation);
                record.referee_name = details.referee_name;
                record.contact_current_employer = Some(details.contact_current_employer_allowed);
                record.reason_for_not_contact_current_employer = details.reason_if_not_allowed;
                record.comments = details.leaving_comments;
            }
            PeriodKind::Gap(g) => {
                record.gap_reason = Some(g.gap_reason);
                record.gap_activities = g.gap_activities;
                record.gap_support = g.gap_support;
            }
        }
        record.with_identity(period.identity)
    }
}

impl ReferenceRecord {
    fn set_occupation(&mut self, o: OccupationDetails) {
        self.company_name = Some(o.company_name);
        self.email = Some(o.contact_email);
        self.phone = o.phone;
        self.job_role = o.job_role;
    }
}

impl TryFrom<ReferenceRecord> for PersonalReference {
    type Error = ModelError;

    fn try_from(record: ReferenceRecord) -> Result<Self, Self::Error> {
        if let Some(id) = record.reference_type_value_id {
            let ty = ReferenceTypeId::from_id(id).ok_or(ModelError::UnknownReferenceType(id))?;
            if ty != PersonalReference::REFERENCE_TYPE {
                return Err(ModelError::UnexpectedReferenceType {
                    found: ty,
                    expected: "a personal contact",
                });
            }
        }
        let identity = record.persisted_identity()?;
        Ok(record.into_person(identity))
    }
}

impl From<PersonalReference> for ReferenceRecord {
    fn from(person: PersonalReference) -> Self {
        Self {
            reference_type_value_id: Some(PersonalReference::REFERENCE_TYPE.id()),
            changed: person.changed,
            address: person.address,
            referee_name: Some(person.referee_name),
            occupation: Some(person.occupation),
            relation_duration: Some(person.relation_duration),
            relation_type: Some(person.relation_type),
            relation_frequency: Some(person.relation_frequency),
            email: Some(person.contact_email),
            phone: person.phone,
            ..Self::default()
        }
        .with_identity(person.identity)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
