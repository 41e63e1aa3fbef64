use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::credit::agents::{AgentKind, ScriptedReply};
use crate::workflows::credit::applications::router::{
    fraud_check_handler, score_handler, status_handler,
};

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("serializable body")))
        .expect("valid request")
}

#[tokio::test]
async fn submit_route_returns_pipeline_result() {
    let harness = build_service(healthy_transport());
    let router = application_router_with_service(harness.service);

    let response = router
        .oneshot(post_json("/api/v1/applications", &submission_json()))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert!(payload["application_id"]
        .as_str()
        .is_some_and(|id| id.starts_with("APP-")));
    assert_eq!(payload["result"]["decision"]["decision"], "approved");
    assert_eq!(payload["result"]["stages"]["credit_scoring"]["status"], "ok");
    assert_eq!(payload["result"]["audit"], "written");
}

#[tokio::test]
async fn submit_route_rejects_missing_fields() {
    let harness = build_service(healthy_transport());
    let router = application_router_with_service(harness.service);

    let response = router
        .oneshot(post_json(
            "/api/v1/applications",
            &json!({ "applicant_id": "A-100", "personal_info": {} }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "Missing required field: financial_info");
}

#[tokio::test]
async fn status_handler_returns_stage_statuses() {
    let harness = build_service(healthy_transport());
    let service = Arc::new(harness.service);
    let receipt = service.submit(submission()).await.expect("submission succeeds");

    let response = status_handler::<MemoryRepository>(
        State(service.clone()),
        Path(receipt.application_id.0.clone()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "completed");
    assert_eq!(payload["processing_stages"]["fraud_detection"], "ok");
    assert_eq!(payload["processing_stages"]["final_decision"], "ok");
}

#[tokio::test]
async fn status_handler_returns_not_found_for_unknown_id() {
    let harness = build_service(healthy_transport());

    let response = status_handler::<MemoryRepository>(
        State(Arc::new(harness.service)),
        Path("APP-20250101-999999".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn score_handler_maps_timeout_to_gateway_timeout() {
    let transport = healthy_transport().with(
        AgentKind::Scoring,
        ScriptedReply::Stall(Duration::from_secs(5)),
    );
    let harness = build_service(transport);

    let response = score_handler::<MemoryRepository>(
        State(Arc::new(harness.service)),
        axum::Json(json!({ "applicant_id": "A-7" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let payload = read_json_body(response).await;
    assert_eq!(payload["agent"], "scoring");
    assert_eq!(payload["details"]["kind"], "timeout");
}

#[tokio::test]
async fn fraud_check_handler_maps_agent_error_to_bad_gateway() {
    let transport = healthy_transport().with(
        AgentKind::FraudDetector,
        ScriptedReply::Status(500, "model crashed".to_string()),
    );
    let harness = build_service(transport);

    let response = fraud_check_handler::<MemoryRepository>(
        State(Arc::new(harness.service)),
        axum::Json(json!({ "applicant_id": "A-7" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn orchestrate_route_rejects_unknown_agent() {
    let harness = build_service(healthy_transport());
    let router = application_router_with_service(harness.service);

    let response = router
        .oneshot(post_json(
            "/api/v1/orchestrate",
            &json!({ "agent_type": "credit_bureau", "payload": { "x": 1 } }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "unknown agent type: credit_bureau");
}

#[tokio::test]
async fn agent_health_route_reports_each_agent() {
    let transport = healthy_transport().with(AgentKind::BlockchainLogger, ScriptedReply::Refuse);
    let harness = build_service(transport);
    let router = application_router_with_service(harness.service);

    let response = router
        .oneshot(
            Request::get("/api/v1/agents/health")
                .body(Body::empty())
                .expect("valid request"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["total"], 5);
    assert_eq!(payload["healthy"], 4);
}

#[tokio::test]
async fn audit_routes_report_and_reconcile_cache() {
    let harness = build_service(healthy_transport());
    harness.ledger.set_available(false);
    let service = Arc::new(harness.service);
    service.submit(submission()).await.expect("submission succeeds");
    let router = crate::workflows::credit::applications::application_router(service);

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/v1/audit/cache?applicant_id=A-100&record_type=loan_decision")
                .body(Body::empty())
                .expect("valid request"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["cache"]["size"], 1);
    assert_eq!(payload["entries"].as_array().map(Vec::len), Some(1));

    harness.ledger.set_available(true);
    let response = router
        .oneshot(
            Request::post("/api/v1/audit/reconcile")
                .body(Body::empty())
                .expect("valid request"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["synced"], 1);
    assert_eq!(payload["remaining"], 0);
    assert_eq!(harness.ledger.len(), 1);
}
