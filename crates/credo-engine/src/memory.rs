//! # In-Memory Lifecycle Store
//!
//! Thread-safe in-process backend for development and tests. All operations
//! are synchronous under a `parking_lot::RwLock` (never held across an
//! `.await`); `apply` runs entirely under one write lock, which both
//! serializes racing writers and makes the two appends atomic.
//!
//! The [`FailPoint`] hook lets the storage conformance tests force a commit
//! failure in the middle of the unit of work and observe that no partial
//! state becomes visible.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use credo_core::ApplicationId;

use crate::plan::{plan_transition, TransitionPlan};
use crate::record::{SlaRecord, StatusRecord, TransitionCommand, TransitionOutcome};
use crate::store::{LifecycleStore, StorageError};

/// Injectable failure for storage conformance tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailPoint {
    /// Normal operation.
    #[default]
    None,
    /// Fail the unit of work after the status record has been staged but
    /// before commit. The staged append must be rolled back.
    AfterStatusAppend,
}

#[derive(Debug, Default)]
struct Inner {
    applications: HashSet<ApplicationId>,
    history: HashMap<ApplicationId, Vec<StatusRecord>>,
    sla: HashMap<ApplicationId, Vec<SlaRecord>>,
    fail_point: FailPoint,
}

/// In-memory implementation of [`LifecycleStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an application so transitions against it are accepted.
    pub fn register_application(&self, id: ApplicationId) {
        self.inner.write().applications.insert(id);
    }

    /// Remove an application and its history and ledger entries.
    /// Referential cleanup only — live records are never mutated.
    pub fn deregister_application(&self, id: ApplicationId) {
        let mut inner = self.inner.write();
        inner.applications.remove(&id);
        inner.history.remove(&id);
        inner.sla.remove(&id);
    }

    /// The highest known status-record count across all applications.
    /// Used by tests asserting the append-only property.
    pub fn total_status_records(&self) -> usize {
        self.inner.read().history.values().map(Vec::len).sum()
    }

    /// Arm a failure injection point. Conformance-test hook.
    pub fn set_fail_point(&self, fail_point: FailPoint) {
        self.inner.write().fail_point = fail_point;
    }
}

#[async_trait]
impl LifecycleStore for MemoryStore {
    async fn application_exists(&self, id: ApplicationId) -> Result<bool, StorageError> {
        Ok(self.inner.read().applications.contains(&id))
    }

    async fn latest_status(
        &self,
        id: ApplicationId,
    ) -> Result<Option<StatusRecord>, StorageError> {
        Ok(self
            .inner
            .read()
            .history
            .get(&id)
            .and_then(|records| records.last())
            .cloned())
    }

    async fn history(&self, id: ApplicationId) -> Result<Vec<StatusRecord>, StorageError> {
        Ok(self
            .inner
            .read()
            .history
            .get(&id)
            .map(|records| records.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn sla_for(&self, id: ApplicationId) -> Result<Vec<SlaRecord>, StorageError> {
        let mut records: Vec<SlaRecord> = self
            .inner
            .read()
            .sla
            .get(&id)
            .cloned()
            .unwrap_or_default();
        records.sort_by_key(|r| r.started_at);
        Ok(records)
    }

    async fn sla_all(&self) -> Result<Vec<SlaRecord>, StorageError> {
        let mut records: Vec<SlaRecord> = self
            .inner
            .read()
            .sla
            .values()
            .flatten()
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn apply(&self, cmd: TransitionCommand) -> Result<TransitionOutcome, StorageError> {
        // One write lock for the whole unit of work: read-latest, plan,
        // and both appends happen without interleaving writers.
        let mut inner = self.inner.write();

        if !inner.applications.contains(&cmd.application_id) {
            return Err(StorageError::ApplicationNotFound(cmd.application_id));
        }

        let prior = inner
            .history
            .get(&cmd.application_id)
            .and_then(|records| records.last())
            .cloned();

        match plan_transition(prior.as_ref(), &cmd) {
            TransitionPlan::Noop { current } => Ok(TransitionOutcome {
                record: current,
                sla: None,
                changed: false,
                clock_anomaly: false,
            }),
            TransitionPlan::Apply {
                record,
                sla,
                clock_anomaly,
            } => {
                inner
                    .history
                    .entry(cmd.application_id)
                    .or_default()
                    .push(record.clone());

                if inner.fail_point == FailPoint::AfterStatusAppend {
                    // Roll the staged append back before reporting failure.
                    if let Some(records) = inner.history.get_mut(&cmd.application_id) {
                        records.pop();
                    }
                    return Err(StorageError::Unavailable(
                        "injected commit failure".to_string(),
                    ));
                }

                if let Some(sla_record) = &sla {
                    inner
                        .sla
                        .entry(cmd.application_id)
                        .or_default()
                        .push(sla_record.clone());
                }

                Ok(TransitionOutcome {
                    record,
                    sla,
                    changed: true,
                    clock_anomaly,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use credo_core::{ApplicationStatus, ProfileId};

    fn t(minute: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 10, minute, 0).unwrap()
    }

    fn cmd(
        id: ApplicationId,
        status: ApplicationStatus,
        now: chrono::DateTime<Utc>,
    ) -> TransitionCommand {
        TransitionCommand {
            application_id: id,
            status,
            note: None,
            changed_by: ProfileId::new(),
            now,
        }
    }

    #[tokio::test]
    async fn apply_rejects_unregistered_application() {
        let store = MemoryStore::new();
        let id = ApplicationId::new();
        let err = store
            .apply(cmd(id, ApplicationStatus::Submitted, t(0)))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ApplicationNotFound(_)));
    }

    #[tokio::test]
    async fn history_is_newest_first() {
        let store = MemoryStore::new();
        let id = ApplicationId::new();
        store.register_application(id);

        store
            .apply(cmd(id, ApplicationStatus::Submitted, t(0)))
            .await
            .unwrap();
        store
            .apply(cmd(id, ApplicationStatus::InReview, t(5)))
            .await
            .unwrap();
        store
            .apply(cmd(id, ApplicationStatus::Approved, t(9)))
            .await
            .unwrap();

        let history = store.history(id).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].status, ApplicationStatus::Approved);
        assert_eq!(history[2].status, ApplicationStatus::Submitted);

        let latest = store.latest_status(id).await.unwrap().unwrap();
        assert_eq!(latest.status, ApplicationStatus::Approved);
    }

    #[tokio::test]
    async fn history_timestamps_are_monotonic() {
        let store = MemoryStore::new();
        let id = ApplicationId::new();
        store.register_application(id);

        for (minute, status) in [
            (0, ApplicationStatus::Submitted),
            (3, ApplicationStatus::InReview),
            (7, ApplicationStatus::Rejected),
            (20, ApplicationStatus::InReview),
        ] {
            store.apply(cmd(id, status, t(minute))).await.unwrap();
        }

        let mut history = store.history(id).await.unwrap();
        history.reverse(); // oldest first
        for pair in history.windows(2) {
            assert!(pair[1].created_at >= pair[0].created_at);
        }
    }

    #[tokio::test]
    async fn injected_commit_failure_leaves_no_partial_state() {
        let store = MemoryStore::new();
        let id = ApplicationId::new();
        store.register_application(id);

        store
            .apply(cmd(id, ApplicationStatus::Submitted, t(0)))
            .await
            .unwrap();

        store.set_fail_point(FailPoint::AfterStatusAppend);
        let err = store
            .apply(cmd(id, ApplicationStatus::InReview, t(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));

        // Neither the status record nor the SLA record is visible.
        let history = store.history(id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, ApplicationStatus::Submitted);
        assert!(store.sla_for(id).await.unwrap().is_empty());

        // A retry after the outage succeeds and measures from the original
        // record.
        store.set_fail_point(FailPoint::None);
        let outcome = store
            .apply(cmd(id, ApplicationStatus::InReview, t(10)))
            .await
            .unwrap();
        let sla = outcome.sla.unwrap();
        assert_eq!(sla.duration_minutes, 10);
        assert_eq!(sla.from_status, ApplicationStatus::Submitted);
    }

    #[tokio::test]
    async fn sla_all_is_newest_first_across_applications() {
        let store = MemoryStore::new();
        let a = ApplicationId::new();
        let b = ApplicationId::new();
        store.register_application(a);
        store.register_application(b);

        store
            .apply(cmd(a, ApplicationStatus::Submitted, t(0)))
            .await
            .unwrap();
        store
            .apply(cmd(b, ApplicationStatus::Submitted, t(1)))
            .await
            .unwrap();
        store
            .apply(cmd(a, ApplicationStatus::InReview, t(2)))
            .await
            .unwrap();
        store
            .apply(cmd(b, ApplicationStatus::Rejected, t(4)))
            .await
            .unwrap();

        let all = store.sla_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].application_id, b);
        assert_eq!(all[1].application_id, a);
        assert!(all[0].created_at >= all[1].created_at);
    }

    #[tokio::test]
    async fn deregister_removes_history_and_ledger() {
        let store = MemoryStore::new();
        let id = ApplicationId::new();
        store.register_application(id);
        store
            .apply(cmd(id, ApplicationStatus::Submitted, t(0)))
            .await
            .unwrap();
        store
            .apply(cmd(id, ApplicationStatus::InReview, t(1)))
            .await
            .unwrap();

        store.deregister_application(id);
        assert!(!store.application_exists(id).await.unwrap());
        assert!(store.history(id).await.unwrap().is_empty());
        assert!(store.sla_for(id).await.unwrap().is_empty());
    }
}
