//! # Sequential Application Codes
//!
//! Human-readable application codes in the form `L-0001`, `L-0002`, …
//! Codes are assigned from a monotonically increasing sequence, are unique,
//! and are never reused — even after the application they belong to is
//! deleted. Allocation of the sequence number itself belongs to the
//! persistence layer; this type only formats and validates.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Prefix shared by every application code.
const CODE_PREFIX: &str = "L-";

/// A human-readable sequential application code (`L-0001`).
///
/// Serializes as a plain string. The numeric part is zero-padded to four
/// digits and widens naturally once the sequence passes 9999.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationCode(String);

impl ApplicationCode {
    /// Format a code from a sequence number.
    pub fn from_seq(seq: u64) -> Self {
        Self(format!("{CODE_PREFIX}{seq:04}"))
    }

    /// Parse and validate a code string.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidApplicationCode`] unless the value
    /// is the `L-` prefix followed by at least four digits.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let digits = match s.strip_prefix(CODE_PREFIX) {
            Some(rest) => rest,
            None => return Err(ValidationError::InvalidApplicationCode(s)),
        };
        if digits.len() < 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidApplicationCode(s));
        }
        Ok(Self(s))
    }

    /// Return the sequence number encoded in this code.
    pub fn seq(&self) -> u64 {
        self.0[CODE_PREFIX.len()..]
            .parse()
            .expect("validated at construction")
    }

    /// Access the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ApplicationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn from_seq_zero_pads_to_four_digits() {
        assert_eq!(ApplicationCode::from_seq(1).as_str(), "L-0001");
        assert_eq!(ApplicationCode::from_seq(42).as_str(), "L-0042");
        assert_eq!(ApplicationCode::from_seq(9999).as_str(), "L-9999");
    }

    #[test]
    fn from_seq_widens_past_9999() {
        assert_eq!(ApplicationCode::from_seq(10000).as_str(), "L-10000");
        assert_eq!(ApplicationCode::from_seq(123456).as_str(), "L-123456");
    }

    #[test]
    fn parse_accepts_canonical_codes() {
        let code = ApplicationCode::parse("L-0007").unwrap();
        assert_eq!(code.seq(), 7);
        assert_eq!(code.as_str(), "L-0007");
    }

    #[test]
    fn parse_rejects_invalid() {
        assert!(ApplicationCode::parse("").is_err());
        assert!(ApplicationCode::parse("0001").is_err()); // missing prefix
        assert!(ApplicationCode::parse("L-01").is_err()); // too short
        assert!(ApplicationCode::parse("L-00a1").is_err()); // non-digit
        assert!(ApplicationCode::parse("K-0001").is_err()); // wrong prefix
        assert!(ApplicationCode::parse("l-0001").is_err()); // lowercase prefix
    }

    #[test]
    fn serializes_as_plain_string() {
        let code = ApplicationCode::from_seq(12);
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"L-0012\"");
    }

    proptest! {
        #[test]
        fn seq_roundtrips(seq in 1u64..10_000_000) {
            let code = ApplicationCode::from_seq(seq);
            prop_assert_eq!(code.seq(), seq);
            let reparsed = ApplicationCode::parse(code.as_str()).unwrap();
            prop_assert_eq!(reparsed, code);
        }
    }
}
