//! # Transition Planning
//!
//! The pure decision function of the lifecycle engine. Storage backends
//! call [`plan_transition`] *inside* their unit of work, with the latest
//! record as read under the transaction's own locking. Keeping the
//! decision in one place means the in-memory and Postgres backends cannot
//! drift apart on the core semantics:
//!
//! - the first status of an application never produces an SLA measurement;
//! - re-asserting the current status is a no-op (no history append, no SLA);
//! - a real change appends exactly one history record and at most one SLA
//!   record, measuring from the prior record's timestamp;
//! - a negative elapsed time (clock skew) discards the measurement and
//!   flags the anomaly instead of writing a corrupt ledger entry.

use chrono::Duration;
use uuid::Uuid;

use crate::record::{default_note, sla_note, SlaRecord, StatusRecord, TransitionCommand};

/// What a transition attempt should do to the stores.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionPlan {
    /// The requested status equals the current status. Nothing is written;
    /// the existing latest record is returned to the caller.
    Noop {
        /// The existing latest record.
        current: StatusRecord,
    },
    /// Append `record`, and `sla` when present, atomically.
    Apply {
        /// The status record to append.
        record: StatusRecord,
        /// The SLA ledger entry to append, when the transition replaces a
        /// prior status and the clock is sane.
        sla: Option<SlaRecord>,
        /// True when an SLA measurement was due but discarded because the
        /// computed duration was negative.
        clock_anomaly: bool,
    },
}

/// Decide what a transition attempt does, given the latest history record.
///
/// `prior` must be the latest record for `cmd.application_id` as observed
/// under the caller's unit of work. Existence of the application itself is
/// the caller's concern.
pub fn plan_transition(prior: Option<&StatusRecord>, cmd: &TransitionCommand) -> TransitionPlan {
    if let Some(prior) = prior {
        if prior.status == cmd.status {
            return TransitionPlan::Noop {
                current: prior.clone(),
            };
        }
    }

    let record = StatusRecord {
        id: Uuid::new_v4(),
        application_id: cmd.application_id,
        status: cmd.status,
        note: cmd
            .note
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| default_note(cmd.status)),
        changed_by: cmd.changed_by,
        created_at: cmd.now,
    };

    let (sla, clock_anomaly) = match prior {
        // First-ever status: nothing to measure against.
        None => (None, false),
        Some(prior) => {
            let elapsed = cmd.now - prior.created_at;
            if elapsed < Duration::zero() {
                // Clock skew. Discard the measurement rather than persist
                // a negative duration; the caller logs the anomaly.
                (None, true)
            } else {
                (
                    Some(SlaRecord {
                        id: Uuid::new_v4(),
                        application_id: cmd.application_id,
                        from_status: prior.status,
                        to_status: cmd.status,
                        started_at: prior.created_at,
                        ended_at: cmd.now,
                        duration_minutes: elapsed.num_minutes(),
                        note: sla_note(prior.status, cmd.status),
                        created_at: cmd.now,
                    }),
                    false,
                )
            }
        }
    };

    TransitionPlan::Apply {
        record,
        sla,
        clock_anomaly,
    }
}
