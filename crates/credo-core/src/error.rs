//! # Validation Error Hierarchy
//!
//! Structured errors for domain primitive construction, built with
//! `thiserror`. Each variant carries the rejected input and the expected
//! format so operators can diagnose bad requests without guesswork.

use thiserror::Error;

/// Validation errors for domain primitive newtypes.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Status name is not one of the four canonical workflow statuses.
    #[error("invalid status: \"{0}\" (expected one of SUBMITTED, IN_REVIEW, APPROVED, REJECTED)")]
    InvalidStatus(String),

    /// Application code does not match the `L-NNNN` format.
    #[error("invalid application code: \"{0}\" (expected L- followed by at least four digits)")]
    InvalidApplicationCode(String),

    /// National identity number fails format validation.
    #[error("invalid national identity number: \"{0}\" (expected 16 digits)")]
    InvalidNationalId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_status_display() {
        let err = ValidationError::InvalidStatus("PENDING".to_string());
        let msg = format!("{err}");
        assert!(msg.contains("PENDING"));
        assert!(msg.contains("IN_REVIEW"));
    }

    #[test]
    fn invalid_code_display() {
        let err = ValidationError::InvalidApplicationCode("X-1".to_string());
        assert!(format!("{err}").contains("X-1"));
    }

    #[test]
    fn invalid_national_id_display() {
        let err = ValidationError::InvalidNationalId("123".to_string());
        assert!(format!("{err}").contains("16 digits"));
    }
}
