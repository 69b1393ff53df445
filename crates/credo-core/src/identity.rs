//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout the back office.
//! Each identifier is a distinct type — you cannot pass a [`ProfileId`]
//! where an [`ApplicationId`] is expected.
//!
//! UUID-based identifiers ([`ApplicationId`], [`ProfileId`]) are always
//! valid by construction. The string-based [`NationalId`] validates its
//! format at construction time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// A unique identifier for a credit application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(Uuid);

impl ApplicationId {
    /// Create a new random application identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an application identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ApplicationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unique identifier for a user profile (applicant or back-office staff).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileId(Uuid);

impl ProfileId {
    /// Create a new random profile identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a profile identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProfileId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Applicant national identity number.
///
/// The canonical storage format is 16 digits without separators. Validated
/// at construction so malformed identity numbers never reach persistence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NationalId(String);

impl NationalId {
    /// Create a national identity number from a string, validating format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidNationalId`] if the value is not
    /// exactly 16 digits.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.len() != 16 || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidNationalId(s));
        }
        Ok(Self(s))
    }

    /// Access the identity number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NationalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
