#![deny(missing_docs)]

//! # credo-core — Foundational Types for the Credo Back Office
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It has no internal crate dependencies — only `serde`, `thiserror`,
//! `chrono`, and `uuid` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** Every identifier is a
//!    distinct type. You cannot pass a [`ProfileId`] where an
//!    [`ApplicationId`] is expected.
//!
//! 2. **Single [`ApplicationStatus`] enum.** One definition, four variants,
//!    exhaustive `match` everywhere. Free-form status strings cannot enter
//!    the system: anything that is not one of the four canonical names is
//!    rejected at the boundary.
//!
//! 3. **[`ValidationError`] hierarchy.** Structured errors with `thiserror`
//!    — no `Box<dyn Error>`, no `.unwrap()` outside tests.

pub mod code;
pub mod error;
pub mod identity;
pub mod status;

// Re-export primary types at crate root for ergonomic imports.
pub use code::ApplicationCode;
pub use error::ValidationError;
pub use identity::{ApplicationId, NationalId, ProfileId};
pub use status::ApplicationStatus;
