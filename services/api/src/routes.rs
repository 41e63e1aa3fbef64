use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::Utc;
use credit_orchestrator::workflows::credit::applications::{
    application_router, ApplicationRepository, CreditApplicationService,
};
use credit_orchestrator::workflows::translation::{translation_router, TranslationService};
use serde_json::json;
use std::sync::Arc;

const ENDPOINTS: [(&str, &str); 14] = [
    ("submit_application", "POST /api/v1/applications"),
    ("application_status", "GET /api/v1/applications/:application_id"),
    ("score", "POST /api/v1/score"),
    ("fraud_check", "POST /api/v1/fraud_check"),
    ("guidance", "POST /api/v1/guidance"),
    ("orchestrate", "POST /api/v1/orchestrate"),
    ("translate", "POST /api/v1/translate"),
    ("translate_languages", "GET /api/v1/translate/languages"),
    ("agents_health", "GET /api/v1/agents/health"),
    ("audit_reconcile", "POST /api/v1/audit/reconcile"),
    ("audit_cache", "GET /api/v1/audit/cache"),
    ("health", "GET /health"),
    ("ready", "GET /ready"),
    ("metrics", "GET /metrics"),
];

pub(crate) fn with_service_routes<R>(
    service: Arc<CreditApplicationService<R>>,
    translation: Arc<TranslationService>,
) -> axum::Router
where
    R: ApplicationRepository + 'static,
{
    application_router(service)
        .merge(translation_router(translation))
        .route("/", axum::routing::get(index))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn index() -> Json<serde_json::Value> {
    let endpoints: serde_json::Map<String, serde_json::Value> = ENDPOINTS
        .iter()
        .map(|(name, route)| (name.to_string(), json!(route)))
        .collect();
    Json(json!({
        "service": "credit-orchestrator",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": endpoints,
    }))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "credit-orchestrator",
        "timestamp": Utc::now(),
    }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
