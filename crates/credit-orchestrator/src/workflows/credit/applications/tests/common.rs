use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use serde_json::{json, Value};

use crate::workflows::credit::agents::{AgentClient, AgentKind, ScriptedReply, ScriptedTransport};
use crate::workflows::credit::applications::domain::{ApplicationId, ApplicationSubmission};
use crate::workflows::credit::applications::pipeline::PipelineExecutor;
use crate::workflows::credit::applications::repository::{
    ApplicationRecord, ApplicationRepository, RepositoryError,
};
use crate::workflows::credit::applications::{application_router, CreditApplicationService};
use crate::workflows::credit::audit::{AuditSinkAdapter, InMemoryLedger};

pub(super) const CALL_TIMEOUT: Duration = Duration::from_millis(50);

pub(super) fn submission() -> ApplicationSubmission {
    serde_json::from_value(json!({
        "applicant_id": "A-100",
        "personal_info": { "age": 34, "email": "asha@example.com" },
        "financial_info": { "monthly_income": 120000 },
        "loan_amount": 500000.0
    }))
    .expect("valid submission")
}

pub(super) fn submission_json() -> Value {
    serde_json::to_value(submission()).expect("serializable submission")
}

pub(super) fn features_result() -> Value {
    json!({
        "features": {
            "demographic": { "age": 34 },
            "financial": { "monthly_income": 120000 },
            "quality": { "completeness_score": 85.0 }
        },
        "feature_count": 2
    })
}

pub(super) fn fraud_result(is_fraud: bool, probability: f64) -> Value {
    json!({
        "is_fraud": is_fraud,
        "fraud_probability": probability,
        "risk_level": if is_fraud { "high" } else { "low" }
    })
}

pub(super) fn score_result(score: i32) -> Value {
    json!({
        "credit_score": score,
        "credit_rating": "excellent",
        "risk_assessment": { "risk_level": "low" }
    })
}

/// Every agent answers; the applicant scores 780 and is not fraudulent.
pub(super) fn healthy_transport() -> ScriptedTransport {
    ScriptedTransport::new()
        .with(
            AgentKind::FeatureExtractor,
            ScriptedReply::Result(features_result()),
        )
        .with(
            AgentKind::FraudDetector,
            ScriptedReply::Result(fraud_result(false, 0.05)),
        )
        .with(AgentKind::Scoring, ScriptedReply::Result(score_result(780)))
        .with(
            AgentKind::RagCoach,
            ScriptedReply::Result(json!({ "answer": "Pay bills on time." })),
        )
}

pub(super) type Harness = HarnessWith<MemoryRepository>;

pub(super) fn agent_client(transport: Arc<ScriptedTransport>) -> Arc<AgentClient> {
    Arc::new(AgentClient::new(transport, CALL_TIMEOUT))
}

pub(super) fn build_service(transport: ScriptedTransport) -> Harness {
    build_service_with(transport, Arc::new(MemoryRepository::default()))
}

pub(super) fn build_service_with<R: ApplicationRepository + 'static>(
    transport: ScriptedTransport,
    repository: Arc<R>,
) -> HarnessWith<R> {
    let transport = Arc::new(transport);
    let ledger = Arc::new(InMemoryLedger::new());
    let audit = Arc::new(AuditSinkAdapter::new(ledger.clone(), 10));
    let service = CreditApplicationService::new(
        repository.clone(),
        agent_client(transport.clone()),
        audit,
    );
    HarnessWith {
        service,
        transport,
        ledger,
        repository,
    }
}

pub(super) struct HarnessWith<R> {
    pub(super) service: CreditApplicationService<R>,
    pub(super) transport: Arc<ScriptedTransport>,
    pub(super) ledger: Arc<InMemoryLedger>,
    pub(super) repository: Arc<R>,
}

pub(super) fn executor(
    transport: ScriptedTransport,
    ledger: Arc<InMemoryLedger>,
) -> (PipelineExecutor, Arc<ScriptedTransport>, Arc<AuditSinkAdapter>) {
    let transport = Arc::new(transport);
    let audit = Arc::new(AuditSinkAdapter::new(ledger, 10));
    let executor = PipelineExecutor::new(agent_client(transport.clone()), audit.clone());
    (executor, transport, audit)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<ApplicationId, ApplicationRecord>>>,
}

impl ApplicationRepository for MemoryRepository {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.application_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.application_id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: ApplicationRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(record.application_id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: ApplicationRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn application_router_with_service(
    service: CreditApplicationService<MemoryRepository>,
) -> axum::Router {
    application_router(Arc::new(service))
}
