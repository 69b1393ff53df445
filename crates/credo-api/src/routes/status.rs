//! # Status Lifecycle API
//!
//! HTTP surface for the transition engine:
//!
//! - **POST `/v1/status`** — Record a status transition (admin only).
//!   Returns 201 with the new record plus the SLA measurement when one was
//!   produced, or 200 with the existing record when the requested status
//!   equals the current status (no-op).
//! - **GET `/v1/status/application/:id`** — An application's status
//!   history, newest first (owner or admin).
//!
//! On a successful transition the handler hands the event to the
//! notification dispatcher; delivery is fire-and-forget and never affects
//! the response.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use credo_core::{ApplicationId, ApplicationStatus};
use credo_engine::{SlaRecord, StatusRecord, TransitionRequest};

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::notify::StatusNotification;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Request to record a status transition.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTransitionRequest {
    /// The application whose status is being recorded.
    pub application_id: Uuid,
    /// The requested status (SUBMITTED, IN_REVIEW, APPROVED, REJECTED).
    pub status: String,
    /// Optional note; a generated message is used when absent.
    pub note: Option<String>,
}

impl Validate for CreateTransitionRequest {
    fn validate(&self) -> Result<(), String> {
        if self.status.trim().is_empty() {
            return Err("status must not be empty".to_string());
        }
        if let Some(note) = &self.note {
            if note.len() > 1000 {
                return Err("note must not exceed 1000 characters".to_string());
            }
        }
        Ok(())
    }
}

/// Response for a transition attempt.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransitionResponse {
    /// The appended record, or the existing record for a no-op.
    #[schema(value_type = Object)]
    pub status: StatusRecord,
    /// The SLA measurement, when the transition produced one.
    #[schema(value_type = Option<Object>)]
    pub sla: Option<SlaRecord>,
    /// Whether a new record was appended.
    pub changed: bool,
}

/// Response for a history query.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    /// Status records, newest first.
    #[schema(value_type = Vec<Object>)]
    pub records: Vec<StatusRecord>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the status router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/status", post(record_transition))
        .route("/v1/status/application/:id", get(get_history))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/status — Record a status transition.
#[utoipa::path(
    post,
    path = "/v1/status",
    request_body = CreateTransitionRequest,
    responses(
        (status = 201, description = "Transition recorded", body = TransitionResponse),
        (status = 200, description = "Status unchanged — no-op", body = TransitionResponse),
        (status = 404, description = "Unknown application"),
        (status = 422, description = "Status outside the enumeration"),
        (status = 503, description = "Storage could not commit — retryable"),
    ),
    tag = "status"
)]
pub async fn record_transition(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateTransitionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TransitionResponse>), AppError> {
    require_role(&caller, Role::Admin)?;
    let actor = caller.require_profile()?;
    let req = extract_validated_json(body)?;

    let application_id = ApplicationId::from_uuid(req.application_id);
    let application = state
        .applications
        .get(application_id)
        .ok_or_else(|| AppError::NotFound(format!("application {application_id} not found")))?;

    let status = ApplicationStatus::parse(&req.status)?;

    let outcome = state
        .engine
        .record_transition(TransitionRequest {
            application_id,
            status,
            note: req.note,
            changed_by: actor,
        })
        .await?;

    // Notify stakeholders after the commit. Fire-and-forget: a delivery
    // failure never rolls back or fails the transition.
    if outcome.changed {
        state.notifier.dispatch(StatusNotification {
            application_id,
            code: application.code.clone(),
            applicant_email: application.email.clone(),
            applicant_name: application.full_name.clone(),
            from_status: outcome.sla.as_ref().map(|s| s.from_status),
            to_status: outcome.record.status,
            note: outcome.record.note.clone(),
        });
    }

    let http_status = if outcome.changed {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        http_status,
        Json(TransitionResponse {
            status: outcome.record,
            sla: outcome.sla,
            changed: outcome.changed,
        }),
    ))
}

/// GET /v1/status/application/:id — Status history for an application.
#[utoipa::path(
    get,
    path = "/v1/status/application/{id}",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Status history, newest first", body = HistoryResponse),
        (status = 403, description = "Caller may not view this application"),
        (status = 404, description = "Unknown application"),
    ),
    tag = "status"
)]
pub async fn get_history(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, AppError> {
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

    let records = state.engine.history(id).await?;
    Ok(Json(HistoryResponse { records }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::testing::{create_payload, memory_app, memory_app_with_token, request_json};

    async fn register_application(app: axum::Router) -> Uuid {
        let (status, body) = request_json(
            app,
            "POST",
            "/v1/applications",
            None,
            Some(create_payload()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        serde_json::from_value(body["application"]["id"].clone()).unwrap()
    }

    #[tokio::test]
    async fn transition_after_registration_measures_from_submitted() {
        let (app, _state) = memory_app();
        let id = register_application(app.clone()).await;

        // Registration already wrote SUBMITTED; move to IN_REVIEW.
        let (status, body) = request_json(
            app,
            "POST",
            "/v1/status",
            None,
            Some(serde_json::json!({"application_id": id, "status": "IN_REVIEW"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"]["status"], "IN_REVIEW");
        assert_eq!(body["changed"], true);
        // SUBMITTED → IN_REVIEW is a real transition, so an SLA exists.
        assert_eq!(body["sla"]["from_status"], "SUBMITTED");
        assert_eq!(body["sla"]["to_status"], "IN_REVIEW");
        assert!(body["sla"]["duration_minutes"].as_i64().unwrap() >= 0);
    }

    #[tokio::test]
    async fn repeating_the_current_status_is_a_noop() {
        let (app, _state) = memory_app();
        let id = register_application(app.clone()).await;

        let (status, body) = request_json(
            app,
            "POST",
            "/v1/status",
            None,
            Some(serde_json::json!({"application_id": id, "status": "SUBMITTED"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], false);
        assert!(body["sla"].is_null());
        assert_eq!(body["status"]["note"], "application created");
    }

    #[tokio::test]
    async fn unknown_status_name_is_rejected() {
        let (app, _state) = memory_app();
        let id = register_application(app.clone()).await;

        let (status, body) = request_json(
            app,
            "POST",
            "/v1/status",
            None,
            Some(serde_json::json!({"application_id": id, "status": "PENDING"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("PENDING"));
    }

    #[tokio::test]
    async fn unknown_application_is_not_found() {
        let (app, _state) = memory_app();

        let (status, _body) = request_json(
            app,
            "POST",
            "/v1/status",
            None,
            Some(serde_json::json!({
                "application_id": Uuid::new_v4(),
                "status": "IN_REVIEW"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn applicants_cannot_record_transitions() {
        let (app, _state) = memory_app_with_token("secret");
        let applicant_token = format!("applicant:{}:secret", Uuid::new_v4());

        let (status, body) = request_json(
            app,
            "POST",
            "/v1/status",
            Some(&applicant_token),
            Some(serde_json::json!({
                "application_id": Uuid::new_v4(),
                "status": "APPROVED"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn history_is_gated_by_ownership() {
        let (app, _state) = memory_app_with_token("secret");
        let alice = Uuid::new_v4();
        let alice_token = format!("applicant:{alice}:secret");
        let stranger_token = format!("applicant:{}:secret", Uuid::new_v4());

        let (_status, body) = request_json(
            app.clone(),
            "POST",
            "/v1/applications",
            Some(&alice_token),
            Some(create_payload()),
        )
        .await;
        let id = body["application"]["id"].as_str().unwrap().to_string();

        // The owner sees the history.
        let (status, body) = request_json(
            app.clone(),
            "GET",
            &format!("/v1/status/application/{id}"),
            Some(&alice_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["records"].as_array().unwrap().len(), 1);
        assert_eq!(body["records"][0]["status"], "SUBMITTED");

        // A stranger does not.
        let (status, _body) = request_json(
            app,
            "GET",
            &format!("/v1/status/application/{id}"),
            Some(&stranger_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn history_is_newest_first_after_transitions() {
        let (app, _state) = memory_app();
        let id = register_application(app.clone()).await;

        for status_name in ["IN_REVIEW", "APPROVED"] {
            request_json(
                app.clone(),
                "POST",
                "/v1/status",
                None,
                Some(serde_json::json!({"application_id": id, "status": status_name})),
            )
            .await;
        }

        let (status, body) = request_json(
            app,
            "GET",
            &format!("/v1/status/application/{id}"),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let records = body["records"].as_array().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["status"], "APPROVED");
        assert_eq!(records[1]["status"], "IN_REVIEW");
        assert_eq!(records[2]["status"], "SUBMITTED");
    }
}
