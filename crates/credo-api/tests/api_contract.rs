//! End-to-end API contract test: an application travels the full approval
//! workflow over the in-memory backend, and the history and SLA surfaces
//! stay consistent with each other at every step.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use credo_api::state::AppState;

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn full_workflow_keeps_history_and_sla_consistent() {
    let app = credo_api::app(AppState::new());

    // Register an application.
    let (status, body) = send(
        &app,
        "POST",
        "/v1/applications",
        Some(serde_json::json!({
            "national_id": "3201011503990001",
            "full_name": "Rina Wulandari",
            "address": "Jl. Merdeka 45",
            "birth_place": "Bandung",
            "birth_date": "1993-07-21",
            "email": "rina@example.com",
            "credit_type": "working-capital",
            "amount": "250000000",
            "collateral": "vehicle BPKB"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["application"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["application"]["code"], "L-0001");
    assert_eq!(body["status"]["status"], "SUBMITTED");

    // Walk the workflow: review, reject, re-open, approve.
    let workflow = ["IN_REVIEW", "REJECTED", "IN_REVIEW", "APPROVED"];
    for next in workflow {
        let (status, body) = send(
            &app,
            "POST",
            "/v1/status",
            Some(serde_json::json!({"application_id": id, "status": next})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{next}: {body}");
        assert_eq!(body["changed"], true);
        assert_eq!(body["sla"]["to_status"], next);
    }

    // Re-asserting the final status is a no-op.
    let (status, body) = send(
        &app,
        "POST",
        "/v1/status",
        Some(serde_json::json!({"application_id": id, "status": "APPROVED"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], false);
    assert!(body["sla"].is_null());

    // History: one record per accepted transition plus the initial status,
    // newest first.
    let (status, body) = send(&app, "GET", &format!("/v1/status/application/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 1 + workflow.len());
    assert_eq!(records[0]["status"], "APPROVED");
    assert_eq!(records[records.len() - 1]["status"], "SUBMITTED");

    // SLA summary: one measurement per status-changing transition, chained
    // from SUBMITTED through the whole workflow.
    let (status, body) = send(&app, "GET", &format!("/v1/sla/application/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let transitions = body["transitions"].as_array().unwrap();
    assert_eq!(transitions.len(), workflow.len());
    assert_eq!(transitions[0]["from_status"], "SUBMITTED");
    for pair in transitions.windows(2) {
        assert_eq!(pair[1]["from_status"], pair[0]["to_status"]);
    }
    let sum: i64 = transitions
        .iter()
        .map(|t| t["duration_minutes"].as_i64().unwrap())
        .sum();
    assert_eq!(body["total_duration_minutes"].as_i64().unwrap(), sum);

    // The global feed carries the same measurements.
    let (status, body) = send(&app, "GET", "/v1/sla", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"].as_array().unwrap().len(), workflow.len());

    // The OpenAPI spec is served.
    let (status, body) = send(&app, "GET", "/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].as_object().unwrap().len() >= 6);
}
