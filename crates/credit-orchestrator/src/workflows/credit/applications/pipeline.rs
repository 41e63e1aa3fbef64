use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use super::context::{PipelineContext, PipelineStage, StageReport};
use super::domain::ApplicationRequest;
use crate::workflows::credit::agents::fallback::{fallback_features, fallback_score};
use crate::workflows::credit::agents::{
    AgentClient, AgentKind, FeatureSet, FraudVerdict, ScoreResult, StageResult, StageStatus,
};
use crate::workflows::credit::audit::{AuditRecord, AuditSinkAdapter, AuditWriteOutcome};
use crate::workflows::credit::decision::{self, LoanDecision};

/// Aggregated result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutcome {
    pub decision: LoanDecision,
    pub stages: PipelineContext,
    /// A stage failed and the decision rests on fallback data.
    pub partial: bool,
    /// An agent was unreachable and its static fallback was used.
    pub degraded: bool,
    pub audit: AuditWriteOutcome,
}

/// Runs features, fraud, scoring, decision and audit for one application.
pub struct PipelineExecutor {
    agents: Arc<AgentClient>,
    audit: Arc<AuditSinkAdapter>,
}

impl PipelineExecutor {
    pub fn new(agents: Arc<AgentClient>, audit: Arc<AuditSinkAdapter>) -> Self {
        Self { agents, audit }
    }

    pub async fn run(&self, request: &ApplicationRequest) -> PipelineOutcome {
        let applicant_id = request.applicant_id();
        let payload = request.to_payload();
        let mut stages = PipelineContext::new();

        info!(applicant_id, "starting feature extraction");
        let features = self
            .agents
            .call_typed::<FeatureSet>(AgentKind::FeatureExtractor, &payload)
            .await;
        stages.record(PipelineStage::FeatureExtraction, &features);
        let features = features.into_value().unwrap_or_else(|| {
            warn!(applicant_id, "feature extraction failed, scoring minimal features");
            fallback_features(&payload)
        });

        info!(applicant_id, "starting fraud detection");
        let fraud = self
            .agents
            .call_typed::<FraudVerdict>(AgentKind::FraudDetector, &payload)
            .await;
        stages.record(PipelineStage::FraudDetection, &fraud);

        let decision = match fraud.value().filter(|verdict| verdict.is_fraud) {
            Some(verdict) => {
                info!(
                    applicant_id,
                    fraud_probability = verdict.fraud_probability,
                    "fraud detected, skipping credit scoring"
                );
                stages.skip(PipelineStage::CreditScoring);
                decision::reject_for_fraud(verdict.fraud_probability, request.loan_amount())
            }
            None => {
                if fraud.status() == StageStatus::Failed {
                    warn!(applicant_id, "fraud verdict missing, continuing without it");
                }
                let score = self.score(applicant_id, &features, &mut stages).await;
                decision::decide(score.credit_score, request.loan_amount())
                    .with_risk_level(score.risk_assessment.risk_level)
            }
        };
        stages.complete(PipelineStage::FinalDecision, &decision);
        info!(
            applicant_id,
            decision = decision.decision.label(),
            approved_amount = decision.approved_amount,
            "loan decision reached"
        );

        let audit = self
            .audit
            .record(AuditRecord::for_decision(applicant_id, &decision))
            .await;
        stages.insert(PipelineStage::AuditLogging, audit_report(audit));

        PipelineOutcome {
            partial: stages.is_partial(),
            degraded: stages.is_degraded(),
            decision,
            stages,
            audit,
        }
    }

    async fn score(
        &self,
        applicant_id: &str,
        features: &FeatureSet,
        stages: &mut PipelineContext,
    ) -> ScoreResult {
        info!(applicant_id, "starting credit scoring");
        let payload = serde_json::to_value(&features.features).unwrap_or_else(|_| json!({}));
        let score = self
            .agents
            .call_typed::<ScoreResult>(AgentKind::Scoring, &payload)
            .await;
        stages.record(PipelineStage::CreditScoring, &score);

        match score {
            StageResult::Ok(score) | StageResult::Unavailable(score) => score,
            StageResult::Failed(failure) => {
                warn!(applicant_id, %failure, "credit scoring failed, using fallback score");
                fallback_score()
            }
        }
    }
}

pub(crate) fn audit_report(outcome: AuditWriteOutcome) -> StageReport {
    let status = match outcome {
        AuditWriteOutcome::Written => StageStatus::Ok,
        AuditWriteOutcome::Cached => StageStatus::Unavailable,
    };
    StageReport {
        status,
        result: Some(json!({ "outcome": outcome })),
        error: None,
    }
}
