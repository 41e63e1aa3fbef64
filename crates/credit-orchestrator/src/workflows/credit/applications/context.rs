use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::workflows::credit::agents::{StageFailure, StageResult, StageStatus};

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    FeatureExtraction,
    FraudDetection,
    CreditScoring,
    FinalDecision,
    AuditLogging,
}

impl PipelineStage {
    pub fn label(&self) -> &'static str {
        match self {
            PipelineStage::FeatureExtraction => "feature_extraction",
            PipelineStage::FraudDetection => "fraud_detection",
            PipelineStage::CreditScoring => "credit_scoring",
            PipelineStage::FinalDecision => "final_decision",
            PipelineStage::AuditLogging => "audit_logging",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What one stage produced, as echoed to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StageFailure>,
}

impl StageReport {
    pub fn ok(result: Value) -> Self {
        Self {
            status: StageStatus::Ok,
            result: Some(result),
            error: None,
        }
    }

    pub fn skipped() -> Self {
        Self {
            status: StageStatus::Skipped,
            result: None,
            error: None,
        }
    }

    pub fn from_result<T: Serialize>(result: &StageResult<T>) -> Self {
        match result {
            StageResult::Ok(value) => Self::ok(to_json(value)),
            StageResult::Unavailable(value) => Self {
                status: StageStatus::Unavailable,
                result: Some(to_json(value)),
                error: None,
            },
            StageResult::Failed(failure) => Self {
                status: StageStatus::Failed,
                result: None,
                error: Some(failure.clone()),
            },
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Per-request record of stage outcomes, owned by the executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PipelineContext {
    stages: BTreeMap<PipelineStage, StageReport>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record<T: Serialize>(&mut self, stage: PipelineStage, result: &StageResult<T>) {
        self.insert(stage, StageReport::from_result(result));
    }

    pub fn complete<T: Serialize>(&mut self, stage: PipelineStage, value: &T) {
        self.insert(stage, StageReport::ok(to_json(value)));
    }

    pub fn skip(&mut self, stage: PipelineStage) {
        self.insert(stage, StageReport::skipped());
    }

    pub fn insert(&mut self, stage: PipelineStage, report: StageReport) {
        self.stages.insert(stage, report);
    }

    pub fn get(&self, stage: PipelineStage) -> Option<&StageReport> {
        self.stages.get(&stage)
    }

    pub fn status(&self, stage: PipelineStage) -> Option<StageStatus> {
        self.get(stage).map(|report| report.status)
    }

    pub fn statuses(&self) -> BTreeMap<PipelineStage, StageStatus> {
        self.stages
            .iter()
            .map(|(stage, report)| (*stage, report.status))
            .collect()
    }

    /// True when any stage failed and the outcome rests on fallbacks.
    pub fn is_partial(&self) -> bool {
        self.has_status(StageStatus::Failed)
    }

    /// True when any agent was unreachable.
    pub fn is_degraded(&self) -> bool {
        self.has_status(StageStatus::Unavailable)
    }

    fn has_status(&self, status: StageStatus) -> bool {
        self.stages.values().any(|report| report.status == status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_stages_in_execution_order() {
        let mut context = PipelineContext::new();
        context.skip(PipelineStage::CreditScoring);
        context.complete(PipelineStage::FeatureExtraction, &json!({ "features": {} }));

        let text = serde_json::to_string(&context).expect("serializes");
        let features_at = text.find("feature_extraction").expect("feature stage");
        let scoring_at = text.find("credit_scoring").expect("scoring stage");
        assert!(features_at < scoring_at);

        let rendered: Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(rendered["credit_scoring"]["status"], "skipped");
    }

    #[test]
    fn partial_and_degraded_flags_follow_statuses() {
        let mut context = PipelineContext::new();
        context.record(
            PipelineStage::FraudDetection,
            &StageResult::<Value>::Unavailable(json!({ "is_fraud": false })),
        );
        assert!(context.is_degraded());
        assert!(!context.is_partial());

        context.record(
            PipelineStage::CreditScoring,
            &StageResult::<Value>::Failed(StageFailure::Timeout { millis: 30_000 }),
        );
        assert!(context.is_partial());
        assert_eq!(
            context.get(PipelineStage::CreditScoring).and_then(|r| r.error.clone()),
            Some(StageFailure::Timeout { millis: 30_000 })
        );
    }
}
