//! # SLA Aggregator
//!
//! Read-only summaries over the SLA ledger. Pure reads: no side effects,
//! no failure modes beyond storage read errors. Totals are reported in
//! minutes, plus hours and days formatted to two decimals for dashboard
//! display.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use credo_core::ApplicationId;

use crate::engine::EngineError;
use crate::record::SlaRecord;
use crate::store::LifecycleStore;

/// Per-application SLA summary: the ordered transitions plus totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaSummary {
    /// SLA ledger entries, oldest first by start time.
    pub transitions: Vec<SlaRecord>,
    /// Arithmetic sum of all transition durations, in whole minutes.
    pub total_duration_minutes: i64,
    /// Total duration in hours, two decimals.
    pub total_duration_hours: String,
    /// Total duration in days, two decimals.
    pub total_duration_days: String,
}

/// Read-only aggregation over the SLA ledger.
#[derive(Clone)]
pub struct SlaAggregator {
    store: Arc<dyn LifecycleStore>,
}

impl SlaAggregator {
    /// Create an aggregator over the given store.
    pub fn new(store: Arc<dyn LifecycleStore>) -> Self {
        Self { store }
    }

    /// Summarize the SLA ledger for one application.
    ///
    /// An application with no ledger entries (unknown, or never past its
    /// first status) summarizes to zero totals and an empty transition
    /// list.
    pub async fn summarize(&self, id: ApplicationId) -> Result<SlaSummary, EngineError> {
        let transitions = self.store.sla_for(id).await?;
        let total: i64 = transitions.iter().map(|r| r.duration_minutes).sum();
        Ok(SlaSummary {
            transitions,
            total_duration_minutes: total,
            total_duration_hours: format!("{:.2}", total as f64 / 60.0),
            total_duration_days: format!("{:.2}", total as f64 / (60.0 * 24.0)),
        })
    }

    /// Every SLA ledger entry across all applications, newest first.
    pub async fn summarize_all(&self) -> Result<Vec<SlaRecord>, EngineError> {
        Ok(self.store.sla_all().await?)
    }
}
