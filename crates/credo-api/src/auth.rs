//! # Authentication & Access Gate
//!
//! Bearer token middleware with role-based access control.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {role}:{profile_id}:{secret}   — role-bound format
//! Bearer {secret}                        — legacy format (treated as admin)
//! ```
//!
//! ## Access Gate
//!
//! Every authenticated request gets a [`CallerIdentity`] injected into the
//! request extensions; handlers extract it via `FromRequestParts` and
//! consult the gate *before* touching the lifecycle engine:
//!
//! - [`CallerIdentity::can_view_application`] — admins see every
//!   application's history; applicants only their own.
//! - [`require_role`] — mutation of status history requires admin.
//!
//! The engine itself assumes the gate has already approved the call.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;
use uuid::Uuid;

use credo_core::ProfileId;

use crate::error::{AppError, ErrorBody, ErrorDetail};
use crate::state::ApplicationRecord;

// ── Role ────────────────────────────────────────────────────────────────────

/// Roles in the back office, ordered by privilege level.
///
/// The `Ord` derivation respects variant declaration order:
/// `Applicant < Admin`. This enables `>=` comparison for role checks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Can create applications and read their own applications' history.
    Applicant,
    /// Full access: reads everything, records status transitions.
    Admin,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applicant => "applicant",
            Self::Admin => "admin",
        }
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller, extracted from the auth context
/// and available to all route handlers via Axum's `FromRequestParts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// The caller's role in the system.
    pub role: Role,
    /// The caller's profile id. Required for applicants; optional for
    /// admin tokens (legacy tokens carry no profile binding).
    pub profile_id: Option<ProfileId>,
}

impl CallerIdentity {
    /// Check if the caller has at least the given minimum role.
    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }

    /// Check if the caller may view the given application and its history.
    ///
    /// - `Admin` can view any application.
    /// - `Applicant` can only view applications they own.
    pub fn can_view_application(&self, application: &ApplicationRecord) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Applicant => self.profile_id == Some(application.owner),
        }
    }

    /// Check if the caller owns the given application. Field amendment and
    /// deletion are owner-only operations, regardless of role.
    pub fn owns_application(&self, application: &ApplicationRecord) -> bool {
        self.profile_id == Some(application.owner)
    }

    /// The caller's profile id, or `Forbidden` when the token carries no
    /// profile binding. Used by operations that need an audit actor.
    pub fn require_profile(&self) -> Result<ProfileId, AppError> {
        self.profile_id.ok_or_else(|| {
            AppError::Forbidden("token carries no profile identity".to_string())
        })
    }
}

/// Axum `FromRequestParts` implementation for `CallerIdentity`.
///
/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present (middleware didn't run or failed).
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Check that the caller has at least the required role.
/// Returns 403 Forbidden if the caller's role is insufficient.
pub fn require_role(caller: &CallerIdentity, minimum: Role) -> Result<(), AppError> {
    if caller.has_role(minimum) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{}' required, caller has '{}'",
            minimum.as_str(),
            caller.role.as_str()
        )))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value to prevent credential leakage
/// in logs.
#[derive(Clone)]
pub struct AuthConfig {
    /// The expected token secret; `None` disables authentication.
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer tokens.
///
/// Prevents timing side-channels that could reveal token length or prefix.
/// When lengths differ, performs a dummy comparison to avoid leaking
/// length information through timing variance.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token in format `{role}:{profile_id}:{secret}` or
/// `{secret}` (legacy, treated as admin).
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();

    match parts.len() {
        // Legacy format: just the secret. Treated as admin for backward compat.
        1 => {
            if constant_time_token_eq(provided, expected_secret) {
                Ok(CallerIdentity {
                    role: Role::Admin,
                    profile_id: None,
                })
            } else {
                Err("invalid bearer token".into())
            }
        }
        // Role-bound format: role:profile_id:secret (profile_id may be empty
        // for admin tokens).
        3 => {
            let role_str = parts[0];
            let profile_str = parts[1];
            let secret = parts[2];

            if !constant_time_token_eq(secret, expected_secret) {
                return Err("invalid bearer token".into());
            }

            let role = match role_str {
                "admin" => Role::Admin,
                "applicant" => Role::Applicant,
                other => return Err(format!("unknown role: {other}")),
            };

            let profile_id = if profile_str.is_empty() {
                None
            } else {
                Some(ProfileId::from_uuid(
                    profile_str
                        .parse::<Uuid>()
                        .map_err(|e| format!("invalid profile_id: {e}"))?,
                ))
            };

            // An applicant without a profile binding could never pass the
            // ownership gate; reject the token outright.
            if role == Role::Applicant && profile_id.is_none() {
                return Err("applicant tokens must carry a profile_id".into());
            }

            Ok(CallerIdentity { role, profile_id })
        }
        _ => Err("invalid token format — expected {role}:{profile_id}:{secret} or {secret}".into()),
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Extract and validate the Bearer token from the Authorization header.
///
/// Parses the token to extract `CallerIdentity` (role + profile binding)
/// and injects it into request extensions for downstream handlers.
///
/// When `AuthConfig.token` is `None`, all requests are allowed with admin
/// identity (auth disabled / development mode).
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected_token = request.extensions().get::<AuthConfig>().cloned();

    match expected_token {
        Some(AuthConfig {
            token: Some(ref expected),
        }) => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());

            match auth_header {
                Some(header_value) if header_value.starts_with("Bearer ") => {
                    let provided = &header_value[7..];
                    match parse_bearer_token(provided, expected) {
                        Ok(identity) => {
                            request.extensions_mut().insert(identity);
                            next.run(request).await
                        }
                        Err(msg) => {
                            tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                            unauthorized_response(&msg)
                        }
                    }
                }
                Some(_) => {
                    tracing::warn!("authentication failed: non-Bearer authorization scheme");
                    unauthorized_response("authorization header must use Bearer scheme")
                }
                None => {
                    tracing::warn!("authentication failed: missing authorization header");
                    unauthorized_response("missing authorization header")
                }
            }
        }
        _ => {
            // Auth disabled — inject an admin identity bound to the system
            // profile so audit-requiring operations still work.
            request.extensions_mut().insert(CallerIdentity {
                role: Role::Admin,
                profile_id: Some(system_profile()),
            });
            next.run(request).await
        }
    }
}

/// The profile identity used when authentication is disabled. Status
/// records written in development mode carry this actor.
pub fn system_profile() -> ProfileId {
    ProfileId::from_uuid(Uuid::nil())
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
