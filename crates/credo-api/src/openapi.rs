//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Credo API — Credit Application Back Office",
        version = "0.2.7",
        description = "Application registry, status lifecycle with SLA tracking, and SLA reporting.",
        license(name = "Apache-2.0")
    ),
    paths(
        // Applications
        crate::routes::applications::create_application,
        crate::routes::applications::list_applications,
        crate::routes::applications::get_application,
        crate::routes::applications::update_application,
        crate::routes::applications::delete_application,
        // Status lifecycle
        crate::routes::status::record_transition,
        crate::routes::status::get_history,
        // SLA reporting
        crate::routes::sla::sla_for_application,
        crate::routes::sla::sla_feed,
    ),
    components(schemas(
        crate::state::ApplicationRecord,
        crate::auth::Role,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::applications::CreateApplicationRequest,
        crate::routes::applications::UpdateApplicationRequest,
        crate::routes::applications::ApplicationResponse,
        crate::routes::status::CreateTransitionRequest,
        crate::routes::status::TransitionResponse,
        crate::routes::status::HistoryResponse,
        crate::routes::sla::SlaSummaryResponse,
        crate::routes::sla::SlaFeedResponse,
    )),
    tags(
        (name = "applications", description = "Application registry"),
        (name = "status", description = "Status lifecycle"),
        (name = "sla", description = "SLA reporting"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(serve_openapi))
}

/// GET /openapi.json — the assembled spec.
async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
