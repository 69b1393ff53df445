//! # Lifecycle Records
//!
//! The two durable record types of the lifecycle engine, plus the command
//! and outcome types that flow through [`LifecycleStore::apply`].
//!
//! [`StatusRecord`]s are facts: "at time T this application's status became
//! S, set by actor A, with note N". [`SlaRecord`]s are derived facts: "this
//! application spent D minutes transitioning from F to T". Neither is ever
//! mutated after insertion.
//!
//! [`LifecycleStore::apply`]: crate::store::LifecycleStore::apply

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use credo_core::{ApplicationId, ApplicationStatus, ProfileId};

/// One immutable entry in an application's status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Unique record identifier.
    pub id: Uuid,
    /// The application this record belongs to.
    pub application_id: ApplicationId,
    /// The status the application entered.
    pub status: ApplicationStatus,
    /// Free-text note. Defaults to a generated message when the caller
    /// supplies none.
    pub note: String,
    /// Who performed the change. Required for audit.
    pub changed_by: ProfileId,
    /// When the record was appended. History per application is totally
    /// ordered by this timestamp, ties broken by insertion order.
    pub created_at: DateTime<Utc>,
}

/// One immutable entry in the SLA ledger: the measured duration of a single
/// status-changing transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaRecord {
    /// Unique record identifier.
    pub id: Uuid,
    /// The application this measurement belongs to.
    pub application_id: ApplicationId,
    /// Status the application was leaving.
    pub from_status: ApplicationStatus,
    /// Status the application entered.
    pub to_status: ApplicationStatus,
    /// When the from-status was assigned.
    pub started_at: DateTime<Utc>,
    /// When the to-status was assigned.
    pub ended_at: DateTime<Utc>,
    /// Whole minutes between `started_at` and `ended_at`. Never negative.
    pub duration_minutes: i64,
    /// Generated note describing the transition.
    pub note: String,
    /// When the ledger entry was written.
    pub created_at: DateTime<Utc>,
}

/// The input to one atomic transition attempt.
#[derive(Debug, Clone)]
pub struct TransitionCommand {
    /// The application whose status is being recorded.
    pub application_id: ApplicationId,
    /// The requested new status.
    pub status: ApplicationStatus,
    /// Optional caller-supplied note.
    pub note: Option<String>,
    /// Who is performing the change.
    pub changed_by: ProfileId,
    /// The wall-clock instant of the attempt. Supplied by the engine so
    /// tests can run against a deterministic clock.
    pub now: DateTime<Utc>,
}

/// The result of one transition attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    /// The newly appended record, or the existing latest record when the
    /// requested status equals the current status (no-op).
    pub record: StatusRecord,
    /// The SLA measurement, when one was produced. Absent for the first
    /// status of an application, for no-ops, and when a clock anomaly
    /// forced the measurement to be discarded.
    pub sla: Option<SlaRecord>,
    /// Whether a new status record was appended.
    pub changed: bool,
    /// True when the computed duration was negative (clock skew) and the
    /// SLA measurement was discarded. The status record still applies.
    pub clock_anomaly: bool,
}

/// Default note for a status record when the caller supplies none.
pub(crate) fn default_note(status: ApplicationStatus) -> String {
    format!("status changed to {status}")
}

/// Generated note for an SLA ledger entry.
pub(crate) fn sla_note(from: ApplicationStatus, to: ApplicationStatus) -> String {
    format!("transition from {from} to {to}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_note_names_the_status() {
        assert_eq!(
            default_note(ApplicationStatus::InReview),
            "status changed to IN_REVIEW"
        );
    }

    #[test]
    fn sla_note_names_both_statuses() {
        assert_eq!(
            sla_note(ApplicationStatus::Submitted, ApplicationStatus::Approved),
            "transition from SUBMITTED to APPROVED"
        );
    }

    #[test]
    fn status_record_serialization_roundtrip() {
        let record = StatusRecord {
            id: Uuid::new_v4(),
            application_id: ApplicationId::new(),
            status: ApplicationStatus::Submitted,
            note: "application created".to_string(),
            changed_by: ProfileId::new(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: StatusRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
