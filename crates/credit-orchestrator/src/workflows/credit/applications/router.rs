use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::domain::{ApplicationId, ApplicationSubmission};
use super::repository::{ApplicationRepository, RepositoryError};
use super::service::{ApplicationServiceError, CreditApplicationService};
use crate::workflows::credit::audit::AuditQuery;

/// Router exposing intake, single-stage scoring, and audit maintenance endpoints.
pub fn application_router<R>(service: Arc<CreditApplicationService<R>>) -> Router
where
    R: ApplicationRepository + 'static,
{
    Router::new()
        .route("/api/v1/applications", post(submit_handler::<R>))
        .route(
            "/api/v1/applications/:application_id",
            get(status_handler::<R>),
        )
        .route("/api/v1/score", post(score_handler::<R>))
        .route("/api/v1/fraud_check", post(fraud_check_handler::<R>))
        .route("/api/v1/guidance", post(guidance_handler::<R>))
        .route("/api/v1/orchestrate", post(orchestrate_handler::<R>))
        .route("/api/v1/agents/health", get(agent_health_handler::<R>))
        .route("/api/v1/audit/reconcile", post(reconcile_handler::<R>))
        .route("/api/v1/audit/cache", get(audit_cache_handler::<R>))
        .with_state(service)
}

/// Body of `POST /api/v1/orchestrate`.
#[derive(Debug, Deserialize)]
pub struct OrchestrateRequest {
    pub agent_type: String,
    #[serde(default)]
    pub payload: Value,
}

pub(crate) async fn submit_handler<R>(
    State(service): State<Arc<CreditApplicationService<R>>>,
    axum::Json(submission): axum::Json<ApplicationSubmission>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    match service.submit(submission).await {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn status_handler<R>(
    State(service): State<Arc<CreditApplicationService<R>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    let id = ApplicationId(application_id);
    match service.get(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(ApplicationServiceError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({
                "error": "application not found",
                "application_id": id.0,
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => error_response(other),
    }
}

pub(crate) async fn score_handler<R>(
    State(service): State<Arc<CreditApplicationService<R>>>,
    axum::Json(payload): axum::Json<Value>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    match service.score(payload).await {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn fraud_check_handler<R>(
    State(service): State<Arc<CreditApplicationService<R>>>,
    axum::Json(payload): axum::Json<Value>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    match service.fraud_check(payload).await {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn guidance_handler<R>(
    State(service): State<Arc<CreditApplicationService<R>>>,
    axum::Json(payload): axum::Json<Value>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    match service.guidance(payload).await {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn orchestrate_handler<R>(
    State(service): State<Arc<CreditApplicationService<R>>>,
    axum::Json(request): axum::Json<OrchestrateRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    match service
        .orchestrate(&request.agent_type, request.payload)
        .await
    {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn agent_health_handler<R>(
    State(service): State<Arc<CreditApplicationService<R>>>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    let agents = service.agent_health().await;
    let healthy = agents.iter().filter(|entry| entry.reachable).count();
    let payload = json!({
        "healthy": healthy,
        "total": agents.len(),
        "agents": agents,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn reconcile_handler<R>(
    State(service): State<Arc<CreditApplicationService<R>>>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    let report = service.reconcile_audit().await;
    (StatusCode::OK, axum::Json(report)).into_response()
}

pub(crate) async fn audit_cache_handler<R>(
    State(service): State<Arc<CreditApplicationService<R>>>,
    Query(filter): Query<AuditQuery>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    let payload = json!({
        "cache": service.audit_status(),
        "entries": service.audit_entries(&filter),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

fn error_response(err: ApplicationServiceError) -> Response {
    let status = match &err {
        ApplicationServiceError::Validation(_) | ApplicationServiceError::UnknownAgent(_) => {
            StatusCode::BAD_REQUEST
        }
        ApplicationServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ApplicationServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ApplicationServiceError::Agent { failure, .. } if failure.is_timeout() => {
            StatusCode::GATEWAY_TIMEOUT
        }
        ApplicationServiceError::Agent { .. } => StatusCode::BAD_GATEWAY,
    };

    let payload = match &err {
        ApplicationServiceError::Agent { agent, failure } => json!({
            "error": err.to_string(),
            "agent": agent,
            "details": failure,
        }),
        _ => json!({
            "error": err.to_string(),
        }),
    };
    (status, axum::Json(payload)).into_response()
}
