//! # Application Status Enumeration
//!
//! The four stages of a credit application's approval workflow. Serialized
//! names use `SCREAMING_SNAKE_CASE` to match the API contract and to prevent
//! free-form status strings from being stored.
//!
//! ## No Transition Graph
//!
//! Any status may follow any other, including transitions out of
//! [`ApplicationStatus::Approved`] and [`ApplicationStatus::Rejected`].
//! Back-office operators routinely re-open decided applications (appeal,
//! data correction), so the workflow is intentionally permissive. The
//! lifecycle engine records every change; it does not police ordering.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The status of a credit application in its approval workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    /// Application has been submitted by the applicant. Initial status.
    Submitted,
    /// Application is under review by a credit officer.
    InReview,
    /// Application has been approved.
    Approved,
    /// Application has been rejected.
    Rejected,
}

impl ApplicationStatus {
    /// All statuses, in workflow order. Used for validation messages.
    pub const ALL: [ApplicationStatus; 4] = [
        Self::Submitted,
        Self::InReview,
        Self::Approved,
        Self::Rejected,
    ];

    /// Return the canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::InReview => "IN_REVIEW",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Convert a canonical status name to an `ApplicationStatus`.
    ///
    /// Only accepts the four canonical names. Returns `None` for any other
    /// input, including lowercase or otherwise mangled variants.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SUBMITTED" => Some(Self::Submitted),
            "IN_REVIEW" => Some(Self::InReview),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Parse a status name, producing a [`ValidationError`] that lists the
    /// accepted values on failure. Used at the API boundary.
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        Self::from_name(name).ok_or_else(|| ValidationError::InvalidStatus(name.to_string()))
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_roundtrips_through_from_name() {
        for status in ApplicationStatus::ALL {
            assert_eq!(ApplicationStatus::from_name(status.as_str()), Some(status));
        }
    }

    #[test]
    fn serialization_uses_screaming_snake_case() {
        let cases = [
            (ApplicationStatus::Submitted, "\"SUBMITTED\""),
            (ApplicationStatus::InReview, "\"IN_REVIEW\""),
            (ApplicationStatus::Approved, "\"APPROVED\""),
            (ApplicationStatus::Rejected, "\"REJECTED\""),
        ];
        for (status, expected_json) in cases {
            assert_eq!(serde_json::to_string(&status).unwrap(), expected_json);
            let back: ApplicationStatus = serde_json::from_str(expected_json).unwrap();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn mangled_names_rejected() {
        let invalid = ["submitted", "In_Review", "PENDING", "DONE", "", " APPROVED"];
        for name in invalid {
            assert!(
                ApplicationStatus::from_name(name).is_none(),
                "{name:?} must not be a valid status"
            );
            let result: Result<ApplicationStatus, _> =
                serde_json::from_str(&format!("{name:?}"));
            assert!(result.is_err(), "{name:?} must not deserialize");
        }
    }

    #[test]
    fn parse_error_carries_input() {
        let err = ApplicationStatus::parse("PENDING").unwrap_err();
        assert!(format!("{err}").contains("PENDING"));
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(format!("{}", ApplicationStatus::InReview), "IN_REVIEW");
    }
}
