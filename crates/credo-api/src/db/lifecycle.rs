//! Postgres lifecycle store — append-only status history and SLA ledger.
//!
//! [`PgStore`] implements the engine's `LifecycleStore` contract. The unit
//! of work in [`PgStore::apply`] takes a row-level lock on the application
//! (`SELECT … FOR UPDATE`), which serializes concurrent transitions for
//! the same application: the latest record is re-read under the lock, so
//! every SLA measurement is taken against the record that is actually
//! latest at commit time. Both inserts ride the same transaction — they
//! commit together or not at all.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use credo_core::{ApplicationId, ApplicationStatus, ProfileId};
use credo_engine::{
    plan_transition, LifecycleStore, SlaRecord, StatusRecord, StorageError, TransitionCommand,
    TransitionOutcome, TransitionPlan,
};

/// Postgres-backed implementation of `LifecycleStore`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a read-path error. The connection may be fine and the data bad, so
/// these surface as backend errors, not retryable outages.
fn read_err(e: sqlx::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// Map a write-path error. The transaction did not commit and left no
/// partial state, so the caller may retry.
fn commit_err(e: sqlx::Error) -> StorageError {
    StorageError::Unavailable(e.to_string())
}

/// Internal row type for status history.
#[derive(sqlx::FromRow)]
struct StatusRow {
    id: Uuid,
    application_id: Uuid,
    status: String,
    note: String,
    changed_by: Uuid,
    created_at: DateTime<Utc>,
}

impl StatusRow {
    fn into_record(self) -> Result<StatusRecord, StorageError> {
        let status = ApplicationStatus::from_name(&self.status).ok_or_else(|| {
            tracing::error!(id = %self.id, status = %self.status, "corrupt status name in status_history");
            StorageError::Backend(format!("corrupt status name: {}", self.status))
        })?;
        Ok(StatusRecord {
            id: self.id,
            application_id: ApplicationId::from_uuid(self.application_id),
            status,
            note: self.note,
            changed_by: ProfileId::from_uuid(self.changed_by),
            created_at: self.created_at,
        })
    }
}

/// Internal row type for the SLA ledger.
#[derive(sqlx::FromRow)]
struct SlaRow {
    id: Uuid,
    application_id: Uuid,
    from_status: String,
    to_status: String,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    duration_minutes: i64,
    note: String,
    created_at: DateTime<Utc>,
}

impl SlaRow {
    fn into_record(self) -> Result<SlaRecord, StorageError> {
        let from_status = ApplicationStatus::from_name(&self.from_status).ok_or_else(|| {
            StorageError::Backend(format!("corrupt status name: {}", self.from_status))
        })?;
        let to_status = ApplicationStatus::from_name(&self.to_status).ok_or_else(|| {
            StorageError::Backend(format!("corrupt status name: {}", self.to_status))
        })?;
        Ok(SlaRecord {
            id: self.id,
            application_id: ApplicationId::from_uuid(self.application_id),
            from_status,
            to_status,
            started_at: self.started_at,
            ended_at: self.ended_at,
            duration_minutes: self.duration_minutes,
            note: self.note,
            created_at: self.created_at,
        })
    }
}

const LATEST_STATUS_SQL: &str = "SELECT id, application_id, status, note, changed_by, created_at
     FROM status_history WHERE application_id = $1
     ORDER BY created_at DESC, seq DESC LIMIT 1";

#[async_trait]
impl LifecycleStore for PgStore {
    async fn application_exists(&self, id: ApplicationId) -> Result<bool, StorageError> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM applications WHERE id = $1)")
            .bind(id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(read_err)
    }

    async fn latest_status(
        &self,
        id: ApplicationId,
    ) -> Result<Option<StatusRecord>, StorageError> {
        let row = sqlx::query_as::<_, StatusRow>(LATEST_STATUS_SQL)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(read_err)?;
        row.map(StatusRow::into_record).transpose()
    }

    async fn history(&self, id: ApplicationId) -> Result<Vec<StatusRecord>, StorageError> {
        let rows = sqlx::query_as::<_, StatusRow>(
            "SELECT id, application_id, status, note, changed_by, created_at
             FROM status_history WHERE application_id = $1
             ORDER BY created_at DESC, seq DESC",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;
        rows.into_iter().map(StatusRow::into_record).collect()
    }

    async fn sla_for(&self, id: ApplicationId) -> Result<Vec<SlaRecord>, StorageError> {
        let rows = sqlx::query_as::<_, SlaRow>(
            "SELECT id, application_id, from_status, to_status, started_at,
             ended_at, duration_minutes, note, created_at
             FROM application_sla WHERE application_id = $1
             ORDER BY started_at ASC",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;
        rows.into_iter().map(SlaRow::into_record).collect()
    }

    async fn sla_all(&self) -> Result<Vec<SlaRecord>, StorageError> {
        let rows = sqlx::query_as::<_, SlaRow>(
            "SELECT id, application_id, from_status, to_status, started_at,
             ended_at, duration_minutes, note, created_at
             FROM application_sla ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;
        rows.into_iter().map(SlaRow::into_record).collect()
    }

    async fn apply(&self, cmd: TransitionCommand) -> Result<TransitionOutcome, StorageError> {
        let mut tx = self.pool.begin().await.map_err(commit_err)?;

        // Lock the application row. Racing transitions for the same
        // application queue here; each sees the history as of the moment
        // its predecessor committed.
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM applications WHERE id = $1 FOR UPDATE")
                .bind(cmd.application_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(commit_err)?;
        if locked.is_none() {
            // Dropping the transaction rolls it back.
            return Err(StorageError::ApplicationNotFound(cmd.application_id));
        }

        let prior = sqlx::query_as::<_, StatusRow>(LATEST_STATUS_SQL)
            .bind(cmd.application_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(commit_err)?
            .map(StatusRow::into_record)
            .transpose()?;

        match plan_transition(prior.as_ref(), &cmd) {
            TransitionPlan::Noop { current } => {
                // Nothing to write; release the lock.
                tx.commit().await.map_err(commit_err)?;
                Ok(TransitionOutcome {
                    record: current,
                    sla: None,
                    changed: false,
                    clock_anomaly: false,
                })
            }
            TransitionPlan::Apply {
                record,
                sla,
                clock_anomaly,
            } => {
                sqlx::query(
                    "INSERT INTO status_history (id, application_id, status, note, changed_by, created_at)
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(record.id)
                .bind(record.application_id.as_uuid())
                .bind(record.status.as_str())
                .bind(&record.note)
                .bind(record.changed_by.as_uuid())
                .bind(record.created_at)
                .execute(&mut *tx)
                .await
                .map_err(commit_err)?;

                if let Some(sla_record) = &sla {
                    sqlx::query(
                        "INSERT INTO application_sla (id, application_id, from_status, to_status,
                         started_at, ended_at, duration_minutes, note, created_at)
                         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                    )
                    .bind(sla_record.id)
                    .bind(sla_record.application_id.as_uuid())
                    .bind(sla_record.from_status.as_str())
                    .bind(sla_record.to_status.as_str())
                    .bind(sla_record.started_at)
                    .bind(sla_record.ended_at)
                    .bind(sla_record.duration_minutes)
                    .bind(&sla_record.note)
                    .bind(sla_record.created_at)
                    .execute(&mut *tx)
                    .await
                    .map_err(commit_err)?;
                }

                tx.commit().await.map_err(commit_err)?;

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
