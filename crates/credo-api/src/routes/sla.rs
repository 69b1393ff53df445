//! # SLA Reporting API
//!
//! Read-only surface over the SLA aggregator:
//!
//! - **GET `/v1/sla/application/:id`** — Per-application summary: ordered
//!   transitions plus totals in minutes, hours, and days (owner or admin).
//! - **GET `/v1/sla`** — Global feed of SLA records, newest first, for
//!   monitoring dashboards (admin only).

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use credo_core::ApplicationId;
use credo_engine::{SlaRecord, SlaSummary};

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::state::AppState;

/// Response for a per-application SLA summary.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SlaSummaryResponse {
    /// SLA records, oldest first by start time.
    #[schema(value_type = Vec<Object>)]
    pub transitions: Vec<SlaRecord>,
    /// Sum of all durations in whole minutes.
    pub total_duration_minutes: i64,
    /// Total duration in hours, two decimals.
    pub total_duration_hours: String,
    /// Total duration in days, two decimals.
    pub total_duration_days: String,
}

impl From<SlaSummary> for SlaSummaryResponse {
    fn from(summary: SlaSummary) -> Self {
        Self {
            transitions: summary.transitions,
            total_duration_minutes: summary.total_duration_minutes,
            total_duration_hours: summary.total_duration_hours,
            total_duration_days: summary.total_duration_days,
        }
    }
}

/// Response for the global SLA feed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SlaFeedResponse {
    /// SLA records across all applications, newest first.
    #[schema(value_type = Vec<Object>)]
    pub records: Vec<SlaRecord>,
}

/// Build the SLA router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/sla", get(sla_feed))
        .route("/v1/sla/application/:id", get(sla_for_application))
}

/// GET /v1/sla/application/:id — SLA summary for one application.
#[utoipa::path(
    get,
    path = "/v1/sla/application/{id}",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "SLA summary", body = SlaSummaryResponse),
        (status = 403, description = "Caller may not view this application"),
        (status = 404, description = "Unknown application"),
    ),
    tag = "sla"
)]
pub async fn sla_for_application(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<SlaSummaryResponse>, AppError> {
    let id = ApplicationId::from_uuid(id);
    let application = state
        .applications
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("application {id} not found")))?;

    if !caller.can_view_application(&application) {
        return Err(AppError::Forbidden(
            "no access to this application".to_string(),
        ));
    }

    let summary = state.aggregator.summarize(id).await?;
    Ok(Json(SlaSummaryResponse::from(summary)))
}

/// GET /v1/sla — Global SLA feed for monitoring.
#[utoipa::path(
    get,
    path = "/v1/sla",
    responses(
        (status = 200, description = "All SLA records, newest first", body = SlaFeedResponse),
        (status = 403, description = "Admin role required"),
    ),
    tag = "sla"
)]
pub async fn sla_feed(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<SlaFeedResponse>, AppError> {
    require_role(&caller, Role::Admin)?;
    let records = state.aggregator.summarize_all().await?;
    Ok(Json(SlaFeedResponse { records }))
}
