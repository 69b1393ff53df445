//! # API Route Modules
//!
//! Route modules for the back-office API surface:
//!
//! - `applications` — application registry: create (with initial status
//!   and sequential code), list, fetch, amend, delete.
//! - `status` — status lifecycle: record a transition (admin), read an
//!   application's history.
//! - `sla` — SLA reporting: per-application summary, global feed for
//!   monitoring dashboards.

pub mod applications;
pub mod sla;
pub mod status;
