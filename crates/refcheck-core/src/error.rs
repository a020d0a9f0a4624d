use std::fmt;

use crate::model::ModelError;

/// Machine-readable error codes for tooling that wraps the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    SnapshotParseError,
    RawInputParseError,
    MissingIdentity,
    UnknownReferenceType,
    UnexpectedReferenceType,
    HandleOutOfRange,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::SnapshotParseError => "E2001",
            Self::RawInputParseError => "E2002",
            Self::MissingIdentity => "E3001",
            Self::UnknownReferenceType => "E3002",
            Self::UnexpectedReferenceType => "E3003",
            Self::HandleOutOfRange => "E3004",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::SnapshotParseError => "Form snapshot parse error",
            Self::RawInputParseError => "Raw input snapshot parse error",
            Self::MissingIdentity => "Reference without identity",
            Self::UnknownReferenceType => "Unknown reference type",
            Self::UnexpectedReferenceType => "Reference type in the wrong list",
            Self::HandleOutOfRange => "Unsaved handle out of range",
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .refcheck/config.toml and retry."),
            Self::SnapshotParseError | Self::RawInputParseError => {
                Some("Check that the file is valid JSON in the expected shape.")
            }
            Self::MissingIdentity => Some(
                "Every reference needs OriginalApplicantReferenceId, ApplicantReferenceRequestId or __unsavedId.",
            ),
            Self::UnknownReferenceType => {
                Some("Use one of the ReferenceTypeValueId values 1075-1083.")
            }
            Self::UnexpectedReferenceType => Some(
                "Personal contacts (1076) belong in PersonalReferences; all others in OccupationReferences.",
            ),
            Self::HandleOutOfRange => {
                Some("Drop the __unsavedId field; a new handle is assigned on load.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<&ModelError> for ErrorCode {
    fn from(err: &ModelError) -> Self {
        match err {
            ModelError::MissingIdentity => Self::MissingIdentity,
            ModelError::UnknownReferenceType(_) => Self::UnknownReferenceType,
            ModelError::UnexpectedReferenceType { .. } => Self::UnexpectedReferenceType,
            ModelError::HandleOutOfRange(_) => Self::HandleOutOfRange,
        }
    }
}
