use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryApplicationRepository};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use credit_orchestrator::config::AppConfig;
use credit_orchestrator::error::AppError;
use credit_orchestrator::telemetry;
use credit_orchestrator::workflows::credit::agents::AgentClient;
use credit_orchestrator::workflows::credit::applications::CreditApplicationService;
use credit_orchestrator::workflows::credit::audit::{AuditSinkAdapter, LedgerAgentSink};
use credit_orchestrator::workflows::translation::TranslationService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let agents = Arc::new(AgentClient::from_config(&config.agents)?);
    let ledger = Arc::new(LedgerAgentSink::new(agents.clone()));
    let audit = Arc::new(AuditSinkAdapter::new(ledger, config.audit.cache_capacity));
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let application_service = Arc::new(CreditApplicationService::new(repository, agents, audit));
    let translation = TranslationService::from_config(&config.translation)?;
    info!(
        external_provider = translation.has_provider(),
        "translation service configured"
    );

    let app = with_service_routes(application_service, Arc::new(translation))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        agent_timeout_secs = config.agents.timeout.as_secs(),
        audit_cache_capacity = config.audit.cache_capacity,
        "credit orchestrator ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
