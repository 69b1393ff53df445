//! # Application Registry API
//!
//! Handles credit application CRUD. Creation allocates the next
//! sequential code and records the initial `SUBMITTED` status through the
//! lifecycle engine; amendment is owner-only and allowed only while the
//! application is still in its initial status.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use credo_core::{ApplicationCode, ApplicationId, ApplicationStatus, NationalId};
use credo_engine::{StatusRecord, TransitionRequest};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{ApplicationRecord, AppState};

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Request to register a new credit application.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateApplicationRequest {
    /// Applicant national identity number (16 digits).
    pub national_id: String,
    /// Applicant full name.
    pub full_name: String,
    /// Applicant address.
    pub address: String,
    /// Applicant place of birth.
    pub birth_place: String,
    /// Applicant date of birth (YYYY-MM-DD).
    pub birth_date: NaiveDate,
    /// Applicant email, used for status notifications.
    pub email: String,
    /// Requested credit product type.
    pub credit_type: String,
    /// Requested amount, string-encoded decimal.
    pub amount: String,
    /// Collateral description.
    pub collateral: String,
}

fn validate_common_fields(
    full_name: &str,
    address: &str,
    birth_place: &str,
    email: &str,
    credit_type: &str,
    amount: &str,
    collateral: &str,
) -> Result<(), String> {
    if full_name.trim().is_empty() || full_name.len() > 255 {
        return Err("full_name must be 1-255 characters".to_string());
    }
    if address.trim().is_empty() || address.len() > 1000 {
        return Err("address must be 1-1000 characters".to_string());
    }
    if birth_place.trim().is_empty() || birth_place.len() > 255 {
        return Err("birth_place must be 1-255 characters".to_string());
    }
    if email.trim().is_empty() || email.len() > 320 || !email.contains('@') {
        return Err("email must be a valid address".to_string());
    }
    if credit_type.trim().is_empty() || credit_type.len() > 100 {
        return Err("credit_type must be 1-100 characters".to_string());
    }
    if amount.trim().is_empty() {
        return Err("amount must not be empty".to_string());
    }
    // Validate amount is a parseable non-negative number; it is stored as
    // a string so no precision is lost.
    match amount.trim().parse::<f64>() {
        Ok(v) if v < 0.0 => return Err("amount must not be negative".to_string()),
        Err(_) => return Err("amount must be a valid number".to_string()),
        _ => {}
    }
    if collateral.trim().is_empty() || collateral.len() > 1000 {
        return Err("collateral must be 1-1000 characters".to_string());
    }
    Ok(())
}

impl Validate for CreateApplicationRequest {
    fn validate(&self) -> Result<(), String> {
        validate_common_fields(
            &self.full_name,
            &self.address,
            &self.birth_place,
            &self.email,
            &self.credit_type,
            &self.amount,
            &self.collateral,
        )
    }
}

/// Request to amend an application's fields. Only allowed while the
/// application is in its initial status; omitted fields are unchanged.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateApplicationRequest {
    /// New national identity number.
    pub national_id: Option<String>,
    /// New full name.
    pub full_name: Option<String>,
    /// New address.
    pub address: Option<String>,
    /// New place of birth.
    pub birth_place: Option<String>,
    /// New date of birth.
    pub birth_date: Option<NaiveDate>,
    /// New email address.
    pub email: Option<String>,
    /// New credit product type.
    pub credit_type: Option<String>,
    /// New requested amount.
    pub amount: Option<String>,
    /// New collateral description.
    pub collateral: Option<String>,
}

impl Validate for UpdateApplicationRequest {
    fn validate(&self) -> Result<(), String> {
        validate_common_fields(
            self.full_name.as_deref().unwrap_or("placeholder"),
            self.address.as_deref().unwrap_or("placeholder"),
            self.birth_place.as_deref().unwrap_or("placeholder"),
            self.email.as_deref().unwrap_or("a@b"),
            self.credit_type.as_deref().unwrap_or("placeholder"),
            self.amount.as_deref().unwrap_or("0"),
            self.collateral.as_deref().unwrap_or("placeholder"),
        )
    }
}

/// Response for application creation: the record plus its initial status.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApplicationResponse {
    /// The registered application.
    pub application: ApplicationRecord,
    /// The initial status record.
    #[schema(value_type = Object)]
    pub status: StatusRecord,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the applications router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/applications",
            get(list_applications).post(create_application),
        )
        .route(
            "/v1/applications/:code",
            get(get_application)
                .put(update_application)
                .delete(delete_application),
        )
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/applications — Register a new credit application.
#[utoipa::path(
    post,
    path = "/v1/applications",
    request_body = CreateApplicationRequest,
    responses(
        (status = 201, description = "Application registered", body = ApplicationResponse),
        (status = 422, description = "Validation failed"),
    ),
    tag = "applications"
)]
pub async fn create_application(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateApplicationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApplicationResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let owner = caller.require_profile()?;
    let national_id = NationalId::new(req.national_id)?;

    let now = Utc::now();
    let id = ApplicationId::new();
    let code = match &state.db_pool {
        Some(pool) => {
            let seq = crate::db::applications::next_code_seq(pool)
                .await
                .map_err(|e| AppError::Internal(format!("code allocation failed: {e}")))?;
            ApplicationCode::from_seq(seq)
        }
        None => state.codes.allocate(),
    };

    let record = ApplicationRecord {
        id,
        code,
        national_id,
        full_name: req.full_name,
        address: req.address,
        birth_place: req.birth_place,
        birth_date: req.birth_date,
        email: req.email,
        credit_type: req.credit_type,
        amount: req.amount,
        collateral: req.collateral,
        owner,
        created_at: now,
        updated_at: now,
    };

    state.applications.insert(record.clone());
    if let Some(memory) = &state.memory {
        memory.register_application(id);
    }

    // Persist to database (write-through). Failure is surfaced to the
    // client because the in-memory record would be lost on restart.
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::applications::insert(pool, &record).await {
            tracing::error!(application_id = %id, error = %e, "failed to persist application to database");
            state.applications.remove(id);
            return Err(AppError::Internal(
                "application registered in-memory but database persist failed".to_string(),
            ));
        }
    }

    // Record the initial status through the engine so the history starts
    // with a SUBMITTED entry attributed to the owner.
    let outcome = state
        .engine
        .record_transition(TransitionRequest {
            application_id: id,
            status: ApplicationStatus::Submitted,
            note: Some("application created".to_string()),
            changed_by: owner,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApplicationResponse {
            application: record,
            status: outcome.record,
        }),
    ))
}

/// GET /v1/applications — List applications.
///
/// Admins see every application; applicants only their own.
#[utoipa::path(
    get,
    path = "/v1/applications",
    responses(
        (status = 200, description = "Applications, newest first", body = Vec<ApplicationRecord>),
    ),
    tag = "applications"
)]
pub async fn list_applications(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<ApplicationRecord>>, AppError> {
    let records = match caller.role {
        crate::auth::Role::Admin => state.applications.list(),
        crate::auth::Role::Applicant => state.applications.list_owned(caller.require_profile()?),
    };
    Ok(Json(records))
}

/// GET /v1/applications/:code — Fetch one application by code.
#[utoipa::path(
    get,
    path = "/v1/applications/{code}",
    params(("code" = String, Path, description = "Application code (L-0001)")),
    responses(
        (status = 200, description = "Application found", body = ApplicationRecord),
        (status = 404, description = "Unknown code"),
    ),
    tag = "applications"
)]
pub async fn get_application(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(code): Path<String>,
) -> Result<Json<ApplicationRecord>, AppError> {
    let code = ApplicationCode::parse(code)?;
    let record = state
        .applications
        .find_by_code(&code)
        .ok_or_else(|| AppError::NotFound(format!("application {code} not found")))?;

    if !caller.can_view_application(&record) {
        return Err(AppError::Forbidden(
            "no access to this application".to_string(),
        ));
    }
    Ok(Json(record))
}

/// PUT /v1/applications/:code — Amend an application's fields.
///
/// Owner-only, and only while the current status is `SUBMITTED`.
#[utoipa::path(
    put,
    path = "/v1/applications/{code}",
    params(("code" = String, Path, description = "Application code (L-0001)")),
    request_body = UpdateApplicationRequest,
    responses(
        (status = 200, description = "Application amended", body = ApplicationRecord),
        (status = 403, description = "Caller does not own the application"),
        (status = 409, description = "Application is past its initial status"),
    ),
    tag = "applications"
)]
pub async fn update_application(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(code): Path<String>,
    body: Result<Json<UpdateApplicationRequest>, JsonRejection>,
) -> Result<Json<ApplicationRecord>, AppError> {
    let req = extract_validated_json(body)?;
    let code = ApplicationCode::parse(code)?;
    let existing = state
        .applications
        .find_by_code(&code)
        .ok_or_else(|| AppError::NotFound(format!("application {code} not found")))?;

    if !caller.owns_application(&existing) {
        return Err(AppError::Forbidden(
            "only the owner may amend an application".to_string(),
        ));
    }

    // Fields are mutable only while the application is in its initial
    // status.
    if let Some(latest) = state.engine.latest(existing.id).await? {
        if latest.status != ApplicationStatus::Submitted {
            return Err(AppError::Conflict(format!(
                "application {code} is {}: fields are only amendable while SUBMITTED",
                latest.status
            )));
        }
    }

    let national_id = req.national_id.map(NationalId::new).transpose()?;

    let updated = state
        .applications
        .update(existing.id, |record| {
            if let Some(value) = national_id {
                record.national_id = value;
            }
            if let Some(value) = req.full_name {
                record.full_name = value;
            }
            if let Some(value) = req.address {
                record.address = value;
            }
            if let Some(value) = req.birth_place {
                record.birth_place = value;
            }
            if let Some(value) = req.birth_date {
                record.birth_date = value;
            }
            if let Some(value) = req.email {
                record.email = value;
            }
            if let Some(value) = req.credit_type {
                record.credit_type = value;
            }
            if let Some(value) = req.amount {
                record.amount = value;
            }
            if let Some(value) = req.collateral {
                record.collateral = value;
            }
            record.updated_at = Utc::now();
        })
        .ok_or_else(|| AppError::NotFound(format!("application {code} not found")))?;

    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::applications::update_fields(pool, &updated).await {
            tracing::error!(application_id = %updated.id, error = %e, "failed to persist application amendment");
            return Err(AppError::Internal(
                "application amended in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok(Json(updated))
}

/// DELETE /v1/applications/:code — Delete an application.
///
/// Owner-only. Removes the registry entry and its history and ledger rows
/// (referential cleanup); the application code is never reused.
#[utoipa::path(
    delete,
    path = "/v1/applications/{code}",
    params(("code" = String, Path, description = "Application code (L-0001)")),
    responses(
        (status = 204, description = "Application deleted"),
        (status = 403, description = "Caller does not own the application"),
        (status = 404, description = "Unknown code"),
    ),
    tag = "applications"
)]
pub async fn delete_application(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(code): Path<String>,
) -> Result<StatusCode, AppError> {
    let code = ApplicationCode::parse(code)?;
    let existing = state
        .applications
        .find_by_code(&code)
        .ok_or_else(|| AppError::NotFound(format!("application {code} not found")))?;

    if !caller.owns_application(&existing) {
        return Err(AppError::Forbidden(
            "only the owner may delete an application".to_string(),
        ));
    }

    state.applications.remove(existing.id);
    if let Some(memory) = &state.memory {
        memory.deregister_application(existing.id);
    }
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::applications::delete(pool, existing.id).await {
            tracing::error!(application_id = %existing.id, error = %e, "failed to delete application from database");
            return Err(AppError::Internal(
                "application removed in-memory but database delete failed".to_string(),
            ));
        }
    }

    Ok(StatusCode::NO_CONTENT)
}
