use chrono::NaiveDate;
use std::fmt;

use crate::dates::{self, CoverageWindow};
use crate::identity::Handle;

/// Persistence discriminator of a reference, with its list-value id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceTypeId {
    Gap,
    PersonalContact,
    Education,
    /// No longer offered for new references.
    EmploymentAgency,
    Employment,
    SelfEmployment,
    /// No longer offered for new references.
    FamilyBusiness,
    Voluntary,
    BenefitsOffice,
}

impl ReferenceTypeId {
    #[must_use]
    pub const fn id(self) -> i64 {
        match self {
            Self::Gap => 1075,
            Self::PersonalContact => 1076,
            Self::Education => 1077,
            Self::EmploymentAgency => 1078,
            Self::Employment => 1079,
            Self::SelfEmployment => 1080,
            Self::FamilyBusiness => 1081,
            Self::Voluntary => 1082,
            Self::BenefitsOffice => 1083,
        }
    }

    #[must_use]
    pub const fn from_id(id: i64) -> Option<Self> {
        match id {
            1075 => Some(Self::Gap),
            1076 => Some(Self::PersonalContact),
            1077 => Some(Self::Education),
            1078 => Some(Self::EmploymentAgency),
            1079 => Some(Self::Employment),
            1080 => Some(Self::SelfEmployment),
            1081 => Some(Self::FamilyBusiness),
            1082 => Some(Self::Voluntary),
            1083 => Some(Self::BenefitsOffice),
            _ => None,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Gap => "gap",
            Self::PersonalContact => "personal contact",
            Self::Education => "education",
            Self::EmploymentAgency => "employment agency",
            Self::Employment => "employment",
            Self::SelfEmployment => "self-employment",
            Self::FamilyBusiness => "family business",
            Self::Voluntary => "voluntary",
            Self::BenefitsOffice => "benefits office",
        }
    }
}

impl fmt::Display for ReferenceTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-kinds of work references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkKind {
    Employment,
    SelfEmployment,
    Voluntary,
    BenefitsOffice,
    EmploymentAgency,
    FamilyBusiness,
}

impl WorkKind {
    #[must_use]
    pub const fn reference_type(self) -> ReferenceTypeId {
        match self {
            Self::Employment => ReferenceTypeId::Employment,
            Self::SelfEmployment => ReferenceTypeId::SelfEmployment,
            Self::Voluntary => ReferenceTypeId::Voluntary,
            Self::BenefitsOffice => ReferenceTypeId::BenefitsOffice,
            Self::EmploymentAgency => ReferenceTypeId::EmploymentAgency,
            Self::FamilyBusiness => ReferenceTypeId::FamilyBusiness,
        }
    }

    #[must_use]
    pub const fn from_reference_type(ty: ReferenceTypeId) -> Option<Self> {
        match ty {
            ReferenceTypeId::Employment => Some(Self::Employment),
            ReferenceTypeId::SelfEmployment => Some(Self::SelfEmployment),
            ReferenceTypeId::Voluntary => Some(Self::Voluntary),
            ReferenceTypeId::BenefitsOffice => Some(Self::BenefitsOffice),
            ReferenceTypeId::EmploymentAgency => Some(Self::EmploymentAgency),
            ReferenceTypeId::FamilyBusiness => Some(Self::FamilyBusiness),
            ReferenceTypeId::Gap | ReferenceTypeId::PersonalContact | ReferenceTypeId::Education => {
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// How a reference is identified. Fixed for the life of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity {
    /// Ids assigned by the persistence layer. At least one is present.
    Saved {
        original_reference_id: Option<i64>,
        request_id: Option<i64>,
    },
    /// Session-local handle; never persisted.
    Unsaved { handle: Handle },
}

impl Identity {
    /// `None` when both ids are absent.
    #[must_use]
    pub const fn saved(original_reference_id: Option<i64>, request_id: Option<i64>) -> Option<Self> {
        if original_reference_id.is_none() && request_id.is_none() {
            return None;
        }
        Some(Self::Saved {
            original_reference_id,
            request_id,
        })
    }

    #[must_use]
    pub const fn unsaved(handle: Handle) -> Self {
        Self::Unsaved { handle }
    }

    #[must_use]
    pub const fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }

    #[must_use]
    pub const fn handle(&self) -> Option<Handle> {
        match self {
            Self::Unsaved { handle } => Some(*handle),
            Self::Saved { .. } => None,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saved {
                original_reference_id,
                request_id,
            } => match (original_reference_id, request_id) {
                (Some(o), Some(r)) => write!(f, "ref:{o}/req:{r}"),
                (Some(o), None) => write!(f, "ref:{o}"),
                (None, Some(r)) => write!(f, "req:{r}"),
                (None, None) => f.write_str("ref:?"),
            },
            Self::Unsaved { handle } => write!(f, "new{handle}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Variant payloads
// ---------------------------------------------------------------------------

/// Fields shared by education and work references.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OccupationDetails {
    /// Company or institution name.
    pub company_name: String,
    pub contact_email: String,
    pub phone: Option<String>,
    pub job_role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkDetails {
    pub occupation: OccupationDetails,
    pub referee_name: Option<String>,
    pub contact_current_employer_allowed: bool,
    pub reason_if_not_allowed: Option<String>,
    /// Reason for leaving.
    pub leaving_comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GapDetails {
    pub gap_reason: String,
    pub gap_activities: Option<String>,
    pub gap_support: Option<String>,
}

/// Type-specific part of a period reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodKind {
    /// Added but not yet classified by the user.
    New,
    Education(OccupationDetails),
    Work { kind: WorkKind, details: WorkDetails },
    Gap(GapDetails),
}

impl PeriodKind {
    /// `None` for [`PeriodKind::New`].
    #[must_use]
    pub const fn reference_type(&self) -> Option<ReferenceTypeId> {
        match self {
            Self::New => None,
            Self::Education(_) => Some(ReferenceTypeId::Education),
            Self::Work { kind, .. } => Some(kind.reference_type()),
            Self::Gap(_) => Some(ReferenceTypeId::Gap),
        }
    }

    #[must_use]
    pub const fn occupation(&self) -> Option<&OccupationDetails> {
        match self {
            Self::Education(details) => Some(details),
            Self::Work { details, .. } => Some(&details.occupation),
            Self::New | Self::Gap(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// PeriodReference
// ---------------------------------------------------------------------------

/// A dated entry in the applicant's occupation history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodReference {
    pub identity: Identity,
    /// Set once any input of this record has been edited. Never reset.
    pub changed: bool,
    pub address: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub kind: PeriodKind,
}

impl PeriodReference {
    /// A freshly added record. Marked changed.
    #[must_use]
    pub const fn unsaved(handle: Handle, kind: PeriodKind) -> Self {
        Self {
            identity: Identity::unsaved(handle),
            changed: true,
            address: None,
            start_date: None,
            end_date: None,
            kind,
        }
    }

    #[must_use]
    pub fn with_dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    #[must_use]
    pub const fn reference_type(&self) -> Option<ReferenceTypeId> {
        self.kind.reference_type()
    }

    /// Company or institution name, if one has been entered.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.kind
            .occupation()
            .map(|o| o.company_name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Raw end date lies before the raw start date.
    #[must_use]
    pub fn has_inverted_dates(&self) -> bool {
        matches!((self.start_date, self.end_date), (Some(s), Some(e)) if e < s)
    }

    #[must_use]
    pub fn effective_start(&self, window: &CoverageWindow) -> NaiveDate {
        dates::effective_start(self, window)
    }

    #[must_use]
    pub fn effective_end(&self, window: &CoverageWindow) -> NaiveDate {
        dates::effective_end(self, window)
    }

    /// Effective span in 365-day years.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_years(&self, window: &CoverageWindow) -> f64 {
        let days = (self.effective_end(window) - self.effective_start(window)).num_days();
        days as f64 / 365.0
    }
}

// ---------------------------------------------------------------------------
// PersonalReference
// ---------------------------------------------------------------------------

/// Someone who can vouch for the applicant. Not dated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalReference {
    pub identity: Identity,
    pub changed: bool,
    pub address: Option<String>,
    pub referee_name: String,
    pub occupation: String,
    pub relation_duration: String,
    pub relation_type: String,
    pub relation_frequency: String,
    pub contact_email: String,
    pub phone: Option<String>,
}

impl PersonalReference {
    pub const REFERENCE_TYPE: ReferenceTypeId = ReferenceTypeId::PersonalContact;

    /// An empty, freshly added record. Marked changed.
    #[must_use]
    pub const fn unsaved(handle: Handle) -> Self {
        Self {
            identity: Identity::unsaved(handle),
            changed: true,
            address: None,
            referee_name: String::new(),
            occupation: String::new(),
            relation_duration: String::new(),
            relation_type: String::new(),
            relation_frequency: String::new(),
            contact_email: String::new(),
            phone: None,
        }
    }

    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        Some(self.referee_name.as_str()).filter(|name| !name.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
