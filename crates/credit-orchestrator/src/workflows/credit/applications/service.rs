use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::context::{PipelineContext, PipelineStage};
use super::domain::{ApplicationId, ApplicationRequest, ApplicationSubmission, ValidationError};
use super::pipeline::{audit_report, PipelineExecutor, PipelineOutcome};
use super::repository::{ApplicationRecord, ApplicationRepository, RepositoryError};
use crate::workflows::credit::agents::{
    AgentClient, AgentHealth, AgentKind, FeatureSet, FraudVerdict, Guidance, ScoreResult,
    StageFailure, StageResult, StageStatus, UnknownAgent,
};
use crate::workflows::credit::audit::{
    AuditQuery, AuditRecord, AuditSinkAdapter, AuditWriteOutcome, CacheStatus,
    CachedAuditRecord, ReconcileReport,
};

const ANONYMOUS_APPLICANT: &str = "anonymous";

/// Service composing the agent client, pipeline, audit adapter and repository.
pub struct CreditApplicationService<R> {
    repository: Arc<R>,
    agents: Arc<AgentClient>,
    audit: Arc<AuditSinkAdapter>,
    pipeline: PipelineExecutor,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id(submitted_at: DateTime<Utc>) -> ApplicationId {
    let sequence = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId::for_sequence(submitted_at, sequence)
}

/// Response for a processed application.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationReceipt {
    pub application_id: ApplicationId,
    pub applicant_id: String,
    pub status: &'static str,
    pub submitted_at: DateTime<Utc>,
    pub result: PipelineOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    pub credit_score: ScoreResult,
    pub stages: PipelineContext,
    pub audit: AuditWriteOutcome,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FraudCheckReport {
    pub fraud_check: FraudVerdict,
    pub stages: PipelineContext,
    pub audit: AuditWriteOutcome,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuidanceReport {
    pub guidance: Guidance,
    pub status: StageStatus,
    pub timestamp: DateTime<Utc>,
}

/// Raw result of a direct agent call.
#[derive(Debug, Clone, Serialize)]
pub struct AgentCallReport {
    pub agent: AgentKind,
    pub status: StageStatus,
    pub result: Value,
}

impl<R> CreditApplicationService<R>
where
    R: ApplicationRepository + 'static,
{
    pub fn new(repository: Arc<R>, agents: Arc<AgentClient>, audit: Arc<AuditSinkAdapter>) -> Self {
        let pipeline = PipelineExecutor::new(Arc::clone(&agents), Arc::clone(&audit));
        Self {
            repository,
            agents,
            audit,
            pipeline,
        }
    }

    /// Validates a submission, runs the full pipeline, and stores the outcome.
    ///
    /// Repository failures are logged and never change the response.
    pub async fn submit(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<ApplicationReceipt, ApplicationServiceError> {
        let request = ApplicationRequest::from_submission(submission)?;
        let submitted_at = Utc::now();
        let application_id = next_application_id(submitted_at);
        info!(
            application_id = %application_id,
            applicant_id = request.applicant_id(),
            "application accepted"
        );

        let mut record = ApplicationRecord::processing(application_id.clone(), &request, submitted_at);
        if let Err(err) = self.repository.insert(record.clone()) {
            warn!(application_id = %application_id, error = %err, "failed to store application");
        }

        let outcome = self.pipeline.run(&request).await;

        record.complete(&outcome);
        if let Err(err) = self.repository.update(record.clone()) {
            warn!(application_id = %application_id, error = %err, "failed to update application");
        }

        Ok(ApplicationReceipt {
            application_id,
            applicant_id: record.applicant_id,
            status: record.status.label(),
            submitted_at,
            result: outcome,
        })
    }

    /// Fetch a stored application for status responses.
    pub fn get(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ApplicationRecord, ApplicationServiceError> {
        let record = self
            .repository
            .fetch(application_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Feature extraction then scoring, audited as a credit assessment.
    pub async fn score(&self, payload: Value) -> Result<ScoreReport, ApplicationServiceError> {
        ensure_payload(&payload)?;
        let mut stages = PipelineContext::new();

        let features = self
            .agents
            .call_typed::<FeatureSet>(AgentKind::FeatureExtractor, &payload)
            .await;
        stages.record(PipelineStage::FeatureExtraction, &features);
        let features = require(AgentKind::FeatureExtractor, features)?;

        let scoring_payload = serde_json::to_value(&features.features).unwrap_or_default();
        let score = self
            .agents
            .call_typed::<ScoreResult>(AgentKind::Scoring, &scoring_payload)
            .await;
        stages.record(PipelineStage::CreditScoring, &score);
        let score = require(AgentKind::Scoring, score)?;

        let audit = self
            .audit
            .record(AuditRecord::for_score(applicant_of(&payload), &score))
            .await;
        stages.insert(PipelineStage::AuditLogging, audit_report(audit));

        Ok(ScoreReport {
            credit_score: score,
            stages,
            audit,
            timestamp: Utc::now(),
        })
    }

    /// Fraud detection alone, audited as a fraud check.
    pub async fn fraud_check(
        &self,
        payload: Value,
    ) -> Result<FraudCheckReport, ApplicationServiceError> {
        ensure_payload(&payload)?;
        let mut stages = PipelineContext::new();

        let verdict = self
            .agents
            .call_typed::<FraudVerdict>(AgentKind::FraudDetector, &payload)
            .await;
        stages.record(PipelineStage::FraudDetection, &verdict);
        let verdict = require(AgentKind::FraudDetector, verdict)?;

        let audit = self
            .audit
            .record(AuditRecord::for_fraud_check(applicant_of(&payload), &verdict))
            .await;
        stages.insert(PipelineStage::AuditLogging, audit_report(audit));

        Ok(FraudCheckReport {
            fraud_check: verdict,
            stages,
            audit,
            timestamp: Utc::now(),
        })
    }

    /// Coaching agent passthrough.
    pub async fn guidance(&self, payload: Value) -> Result<GuidanceReport, ApplicationServiceError> {
        ensure_payload(&payload)?;
        let guidance = self
            .agents
            .call_typed::<Guidance>(AgentKind::RagCoach, &payload)
            .await;
        let status = guidance.status();
        Ok(GuidanceReport {
            guidance: require(AgentKind::RagCoach, guidance)?,
            status,
            timestamp: Utc::now(),
        })
    }

    /// Calls any registered agent by name.
    pub async fn orchestrate(
        &self,
        agent_type: &str,
        payload: Value,
    ) -> Result<AgentCallReport, ApplicationServiceError> {
        let agent: AgentKind = agent_type.parse()?;
        let result = self.agents.call_agent(agent, &payload).await;
        let status = result.status();
        Ok(AgentCallReport {
            agent,
            status,
            result: require(agent, result)?,
        })
    }

    pub async fn agent_health(&self) -> Vec<AgentHealth> {
        self.agents.health_all().await
    }

    pub async fn reconcile_audit(&self) -> ReconcileReport {
        self.audit.reconcile().await
    }

    pub fn audit_status(&self) -> CacheStatus {
        self.audit.cache_status()
    }

    pub fn audit_entries(&self, filter: &AuditQuery) -> Vec<CachedAuditRecord> {
        self.audit.query(filter)
    }
}

fn ensure_payload(payload: &Value) -> Result<(), ValidationError> {
    match payload {
        Value::Object(map) if !map.is_empty() => Ok(()),
        _ => Err(ValidationError::EmptyPayload),
    }
}

fn applicant_of(payload: &Value) -> &str {
    payload
        .get("applicant_id")
        .and_then(Value::as_str)
        .unwrap_or(ANONYMOUS_APPLICANT)
}

fn require<T>(agent: AgentKind, result: StageResult<T>) -> Result<T, ApplicationServiceError> {
    match result {
        StageResult::Ok(value) | StageResult::Unavailable(value) => Ok(value),
        StageResult::Failed(failure) => Err(ApplicationServiceError::Agent { agent, failure }),
    }
}

/// Error raised by the application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    UnknownAgent(#[from] UnknownAgent),
    #[error("{agent} failed: {failure}")]
    Agent {
        agent: AgentKind,
        failure: StageFailure,
    },
}
