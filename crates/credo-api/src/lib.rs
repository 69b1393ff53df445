//! # credo-api — Axum API Service for the Credo Back Office
//!
//! The HTTP surface over the lifecycle engine: application registry,
//! status transitions with SLA tracking, and SLA reporting, gated by
//! bearer-token role checks.
//!
//! ## API Surface
//!
//! | Prefix                        | Module                  | Domain               |
//! |-------------------------------|-------------------------|----------------------|
//! | `/v1/applications/*`          | [`routes::applications`]| Application registry |
//! | `/v1/status/*`                | [`routes::status`]      | Status lifecycle     |
//! | `/v1/sla/*`                   | [`routes::sla`]         | SLA reporting        |
//! | `/health/*`                   | (unauthenticated)       | Probes               |
//! | `/openapi.json`               | [`openapi`]             | Spec                 |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod notify;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) are mounted outside the auth middleware so
/// they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();

    // Authenticated API routes.
    let api = Router::new()
        .merge(routes::applications::router())
        .merge(routes::status::router())
        .merge(routes::sla::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(metrics))
        .with_state(state);

    // Unauthenticated health probes.
    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_probes_bypass_auth() {
        let state = AppState::with_config(state::AppConfig {
            port: 8080,
            auth_token: Some("secret".to_string()),
        });
        let app = app(state);

        for uri in ["/health/liveness", "/health/readiness"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
        }
    }

    #[tokio::test]
    async fn api_routes_require_auth_when_token_set() {
        let state = AppState::with_config(state::AppConfig {
            port: 8080,
            auth_token: Some("secret".to_string()),
        });
        let app = app(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/applications")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
