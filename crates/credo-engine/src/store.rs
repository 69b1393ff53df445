//! # Storage Contract
//!
//! [`LifecycleStore`] is the single transactional boundary over the status
//! history and the SLA ledger. Both tables are append-only: the contract
//! deliberately has no update or delete operations for records, only
//! application-level registration for referential cleanup.
//!
//! ## Atomicity
//!
//! [`LifecycleStore::apply`] is the unit of work. Implementations must:
//!
//! 1. re-read the latest status record *inside* the transaction,
//! 2. run [`plan_transition`] on what they read,
//! 3. append the status record and (when planned) the SLA record,
//! 4. commit both or neither.
//!
//! Concurrent `apply` calls for the same application must be serialized by
//! the backend (a single write lock in memory, row-level locking in
//! Postgres) so that each SLA measurement is taken against the record that
//! was actually latest at commit time. A failed commit leaves no partial
//! state; callers may safely retry.
//!
//! [`plan_transition`]: crate::plan::plan_transition

use async_trait::async_trait;
use thiserror::Error;

use credo_core::ApplicationId;

use crate::record::{SlaRecord, StatusRecord, TransitionCommand, TransitionOutcome};

/// All errors that can be returned by a [`LifecycleStore`] implementation.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The referenced application is not registered with the store.
    #[error("application not registered: {0}")]
    ApplicationNotFound(ApplicationId),

    /// The unit of work could not commit. No partial state was left
    /// behind; the caller may retry.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A backend-specific storage error (connection, serialization, …).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Transactional storage for status history and the SLA ledger.
///
/// Implementations must be `Send + Sync + 'static` to be shared in axum
/// application state and across async task boundaries.
#[async_trait]
pub trait LifecycleStore: Send + Sync + 'static {
    /// Whether the application is registered with the store.
    async fn application_exists(&self, id: ApplicationId) -> Result<bool, StorageError>;

    /// The most recent status record for the application, if any.
    /// Most recent means latest `created_at`, ties broken by insertion
    /// order.
    async fn latest_status(&self, id: ApplicationId)
        -> Result<Option<StatusRecord>, StorageError>;

    /// Full status history for the application, newest first.
    async fn history(&self, id: ApplicationId) -> Result<Vec<StatusRecord>, StorageError>;

    /// SLA ledger entries for the application, oldest first by start time.
    async fn sla_for(&self, id: ApplicationId) -> Result<Vec<SlaRecord>, StorageError>;

    /// Every SLA ledger entry across all applications, newest first by
    /// creation time. Feeds the monitoring dashboard.
    async fn sla_all(&self) -> Result<Vec<SlaRecord>, StorageError>;

    /// Execute one transition attempt as an atomic unit of work.
    ///
    /// Returns [`StorageError::ApplicationNotFound`] when the application
    /// is not registered, and [`StorageError::Unavailable`] when the
    /// commit fails — in which case neither record is visible afterwards.
    async fn apply(&self, cmd: TransitionCommand) -> Result<TransitionOutcome, StorageError>;
}
