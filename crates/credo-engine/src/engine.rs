//! # Transition Engine
//!
//! The write-side entry point of the lifecycle core. The engine validates
//! that the referenced application exists, delegates the atomic work to
//! the injected [`LifecycleStore`], and logs clock anomalies. It owns no
//! retry policy: a failed commit is reported once, and the storage
//! contract guarantees the caller may retry safely.
//!
//! Requested statuses arrive as [`ApplicationStatus`] values, so a status
//! outside the enumeration cannot reach the engine at all — the API
//! boundary rejects unknown names with a validation error before
//! constructing a request.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use credo_core::{ApplicationId, ApplicationStatus, ProfileId};

use crate::record::{StatusRecord, TransitionCommand, TransitionOutcome};
use crate::store::{LifecycleStore, StorageError};

/// Errors surfaced by the [`TransitionEngine`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// The referenced application does not exist.
    #[error("application not found: {0}")]
    NotFound(ApplicationId),

    /// The unit of work failed. No partial state was left behind, so a
    /// retry is always safe with respect to storage state.
    #[error("storage failure: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ApplicationNotFound(id) => Self::NotFound(id),
            other => Self::Storage(other),
        }
    }
}

/// A request to record a new status for an application.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    /// The application whose status is being recorded.
    pub application_id: ApplicationId,
    /// The requested new status.
    pub status: ApplicationStatus,
    /// Optional note; a generated message is used when absent.
    pub note: Option<String>,
    /// Who is performing the change.
    pub changed_by: ProfileId,
}

/// Records status transitions atomically and computes SLA measurements.
///
/// The store is an injected dependency with explicit lifecycle — opened at
/// process start, shared via `Arc`, dropped at shutdown. There is no
/// process-wide singleton.
#[derive(Clone)]
pub struct TransitionEngine {
    store: Arc<dyn LifecycleStore>,
}

impl TransitionEngine {
    /// Create an engine over the given store.
    pub fn new(store: Arc<dyn LifecycleStore>) -> Self {
        Self { store }
    }

    /// Record a transition at the current wall-clock time.
    pub async fn record_transition(
        &self,
        req: TransitionRequest,
    ) -> Result<TransitionOutcome, EngineError> {
        self.record_transition_at(req, Utc::now()).await
    }

    /// Record a transition at an explicit instant. Deterministic-clock
    /// variant used by tests; `record_transition` is the production path.
    pub async fn record_transition_at(
        &self,
        req: TransitionRequest,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, EngineError> {
        let outcome = self
            .store
            .apply(TransitionCommand {
                application_id: req.application_id,
                status: req.status,
                note: req.note,
                changed_by: req.changed_by,
                now,
            })
            .await?;

        if outcome.clock_anomaly {
            tracing::warn!(
                application_id = %req.application_id,
                status = %req.status,
                "negative transition duration discarded (clock skew) — no SLA record written"
            );
        }

        if outcome.changed {
            tracing::info!(
                application_id = %req.application_id,
                status = %outcome.record.status,
                sla_minutes = outcome.sla.as_ref().map(|s| s.duration_minutes),
                "status transition recorded"
            );
        } else {
            tracing::debug!(
                application_id = %req.application_id,
                status = %outcome.record.status,
                "status unchanged — transition is a no-op"
            );
        }

        Ok(outcome)
    }

    /// Status history for an application, newest first.
    ///
    /// Returns [`EngineError::NotFound`] for an unknown application; an
    /// empty history for a known one is impossible in practice because
    /// registration records the initial status.
    pub async fn history(&self, id: ApplicationId) -> Result<Vec<StatusRecord>, EngineError> {
        if !self.store.application_exists(id).await? {
            return Err(EngineError::NotFound(id));
        }
        Ok(self.store.history(id).await?)
    }

    /// The current (latest) status record for an application, if any.
    pub async fn latest(&self, id: ApplicationId) -> Result<Option<StatusRecord>, EngineError> {
        if !self.store.application_exists(id).await? {
            return Err(EngineError::NotFound(id));
        }
        Ok(self.store.latest_status(id).await?)
    }
}
