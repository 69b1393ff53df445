//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor.
//!
//! ## Architecture
//!
//! AppState holds the application registry (in-memory directory with
//! optional Postgres write-through), the lifecycle engine and aggregator
//! bound to exactly one storage backend, the sequential code allocator,
//! and the notification dispatcher. The lifecycle store is injected at
//! startup — there is no process-wide database singleton.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPool;
use utoipa::ToSchema;

use credo_core::{ApplicationCode, ApplicationId, NationalId, ProfileId};
use credo_engine::{LifecycleStore, MemoryStore, SlaAggregator, TransitionEngine};

use crate::notify::Notifier;

// -- Application Registry -----------------------------------------------------

/// One registered credit application.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApplicationRecord {
    /// Unique identifier.
    #[schema(value_type = uuid::Uuid)]
    pub id: ApplicationId,
    /// Human-readable sequential code (`L-0001`). Unique, never reused.
    #[schema(value_type = String)]
    pub code: ApplicationCode,
    /// Applicant national identity number.
    #[schema(value_type = String)]
    pub national_id: NationalId,
    /// Applicant full name.
    pub full_name: String,
    /// Applicant address.
    pub address: String,
    /// Applicant place of birth.
    pub birth_place: String,
    /// Applicant date of birth.
    pub birth_date: NaiveDate,
    /// Applicant email, used for status notifications.
    pub email: String,
    /// Requested credit product type.
    pub credit_type: String,
    /// Requested amount, string-encoded decimal. Money is never a float.
    pub amount: String,
    /// Collateral description.
    pub collateral: String,
    /// The profile that owns this application.
    #[schema(value_type = uuid::Uuid)]
    pub owner: ProfileId,
    /// When the application was registered.
    pub created_at: DateTime<Utc>,
    /// When the application fields were last amended.
    pub updated_at: DateTime<Utc>,
}

/// Thread-safe in-memory directory of registered applications.
///
/// All operations are synchronous (`parking_lot::RwLock`, never held across
/// an `.await`). In Postgres mode the directory acts as a write-through
/// cache hydrated at startup, so reads stay fast and synchronous.
#[derive(Debug, Default, Clone)]
pub struct ApplicationDirectory {
    data: Arc<RwLock<HashMap<ApplicationId, ApplicationRecord>>>,
}

impl ApplicationDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, returning the previous value if the id existed.
    pub fn insert(&self, record: ApplicationRecord) -> Option<ApplicationRecord> {
        self.data.write().insert(record.id, record)
    }

    /// Retrieve a record by id.
    pub fn get(&self, id: ApplicationId) -> Option<ApplicationRecord> {
        self.data.read().get(&id).cloned()
    }

    /// Retrieve a record by its human-readable code.
    pub fn find_by_code(&self, code: &ApplicationCode) -> Option<ApplicationRecord> {
        self.data
            .read()
            .values()
            .find(|record| record.code == *code)
            .cloned()
    }

    /// All applications, newest first.
    pub fn list(&self) -> Vec<ApplicationRecord> {
        let mut records: Vec<ApplicationRecord> = self.data.read().values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    /// Applications owned by the given profile, newest first.
    pub fn list_owned(&self, owner: ProfileId) -> Vec<ApplicationRecord> {
        let mut records: Vec<ApplicationRecord> = self
            .data
            .read()
            .values()
            .filter(|record| record.owner == owner)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    /// Update a record in place. Returns the updated record, or `None` if
    /// the id is unknown.
    pub fn update(
        &self,
        id: ApplicationId,
        f: impl FnOnce(&mut ApplicationRecord),
    ) -> Option<ApplicationRecord> {
        let mut guard = self.data.write();
        if let Some(entry) = guard.get_mut(&id) {
            f(entry);
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Remove a record by id.
    pub fn remove(&self, id: ApplicationId) -> Option<ApplicationRecord> {
        self.data.write().remove(&id)
    }

    /// The highest code sequence number currently registered. Seeds the
    /// in-memory code allocator after hydration.
    pub fn highest_code_seq(&self) -> u64 {
        self.data
            .read()
            .values()
            .map(|record| record.code.seq())
            .max()
            .unwrap_or(0)
    }

    /// Number of registered applications.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// -- Code Allocation ----------------------------------------------------------

/// Allocates sequential application codes in memory mode.
///
/// Postgres mode allocates from the `application_code_seq` database
/// sequence instead, so codes stay monotonic across restarts.
#[derive(Debug, Clone)]
pub struct CodeAllocator {
    next: Arc<AtomicU64>,
}

impl CodeAllocator {
    /// Create an allocator whose next code is `L-0001`.
    pub fn new() -> Self {
        Self {
            next: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Create an allocator that continues after the given sequence number.
    pub fn starting_after(highest_seen: u64) -> Self {
        Self {
            next: Arc::new(AtomicU64::new(highest_seen + 1)),
        }
    }

    /// Allocate the next code. Codes are never handed out twice.
    pub fn allocate(&self) -> ApplicationCode {
        ApplicationCode::from_seq(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for CodeAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// -- Application State --------------------------------------------------------

/// Application configuration.
///
/// Custom `Debug` redacts the `auth_token` to prevent credential leakage
/// in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer token secret. If `None`, authentication is disabled
    /// and every request runs with admin identity (development mode).
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
        }
    }
}

/// Shared application state accessible to all route handlers.
///
/// Clone-friendly via `Arc` internals in each component.
#[derive(Clone)]
pub struct AppState {
    /// Registered applications (in-memory, optionally write-through to db).
    pub applications: ApplicationDirectory,
    /// The lifecycle storage backend shared by engine and aggregator.
    pub store: Arc<dyn LifecycleStore>,
    /// The transition engine.
    pub engine: TransitionEngine,
    /// Read-side SLA aggregation.
    pub aggregator: SlaAggregator,
    /// Sequential code allocator (memory mode).
    pub codes: CodeAllocator,
    /// Fire-and-forget status notification dispatcher.
    pub notifier: Notifier,
    /// Postgres pool when running with durable persistence, `None` in
    /// memory-only mode. Exactly one of `db_pool`/`memory` is `Some`.
    pub db_pool: Option<PgPool>,
    /// The in-memory lifecycle backend, kept for application
    /// registration in memory-only mode.
    pub memory: Option<Arc<MemoryStore>>,
    /// Application configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Create a memory-only state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create a memory-only state with the given configuration.
    pub fn with_config(config: AppConfig) -> Self {
        let memory = Arc::new(MemoryStore::new());
        let store: Arc<dyn LifecycleStore> = Arc::clone(&memory) as Arc<dyn LifecycleStore>;
        Self {
            applications: ApplicationDirectory::new(),
            engine: TransitionEngine::new(Arc::clone(&store)),
            aggregator: SlaAggregator::new(Arc::clone(&store)),
            store,
            codes: CodeAllocator::new(),
            notifier: Notifier::log_sink(),
            db_pool: None,
            memory: Some(memory),
            config,
        }
    }

    /// Create a state bound to the Postgres lifecycle backend.
    pub fn with_postgres(config: AppConfig, pool: PgPool) -> Self {
        let store: Arc<dyn LifecycleStore> =
            Arc::new(crate::db::lifecycle::PgStore::new(pool.clone()));
        Self {
            applications: ApplicationDirectory::new(),
            engine: TransitionEngine::new(Arc::clone(&store)),
            aggregator: SlaAggregator::new(Arc::clone(&store)),
            store,
            codes: CodeAllocator::new(),
            notifier: Notifier::log_sink(),
            db_pool: Some(pool),
            memory: None,
            config,
        }
    }

    /// Hydrate the application directory from the database.
    ///
    /// Called once on startup when a pool is available, so reads stay
    /// fast and synchronous afterwards.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let records = crate::db::applications::load_all(pool)
            .await
            .map_err(|e| format!("failed to load applications: {e}"))?;
        let count = records.len();
        for record in records {
            self.applications.insert(record);
        }

        tracing::info!(applications = count, "hydrated application directory from database");
        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
