//! Typed results for each agent, validated where they cross into the pipeline.
//!
//! Agents answer with loosely shaped JSON. Optional keys carry documented
//! defaults here instead of silently reading as zero.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Agent result that can be parsed from the `result` member of an envelope.
pub trait AgentPayload: DeserializeOwned + Serialize + Send + 'static {
    /// Range checks applied after parsing.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    fn from_result(value: Value) -> Result<Self, String> {
        let parsed: Self = serde_json::from_value(value).map_err(|err| err.to_string())?;
        parsed.validate()?;
        Ok(parsed)
    }
}

/// Output of the feature extraction agent. Consumed by the scoring agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub features: FeatureGroups,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub processing_notes: Vec<String>,
}

/// Feature categories; absent categories are empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureGroups {
    #[serde(default)]
    pub demographic: Map<String, Value>,
    #[serde(default)]
    pub financial: Map<String, Value>,
    #[serde(default)]
    pub employment: Map<String, Value>,
    #[serde(default)]
    pub behavioral: Map<String, Value>,
    #[serde(default)]
    pub digital: Map<String, Value>,
    #[serde(default)]
    pub social: Map<String, Value>,
    #[serde(default)]
    pub derived: Map<String, Value>,
    #[serde(default)]
    pub quality: FeatureQuality,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureQuality {
    /// Percentage of expected features present, 0 when the agent omits it.
    #[serde(default)]
    pub completeness_score: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_critical_features: Vec<String>,
}

impl AgentPayload for FeatureSet {
    fn validate(&self) -> Result<(), String> {
        let score = self.features.quality.completeness_score;
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return Err(format!("completeness_score {score} outside 0..=100"));
        }
        Ok(())
    }
}

/// Output of the fraud detection agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudVerdict {
    pub is_fraud: bool,
    pub fraud_probability: f64,
    #[serde(default = "unknown_level")]
    pub risk_level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl AgentPayload for FraudVerdict {
    fn validate(&self) -> Result<(), String> {
        if !self.fraud_probability.is_finite() || !(0.0..=1.0).contains(&self.fraud_probability) {
            return Err(format!(
                "fraud_probability {} outside 0..=1",
                self.fraud_probability
            ));
        }
        Ok(())
    }
}

pub const MIN_CREDIT_SCORE: i32 = 300;
pub const MAX_CREDIT_SCORE: i32 = 900;

/// Output of the scoring agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub credit_score: i32,
    #[serde(default = "unknown_level")]
    pub credit_rating: String,
    #[serde(default)]
    pub risk_assessment: RiskAssessment,
    #[serde(default)]
    pub fallback: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
    /// Factor name to its effect, e.g. `"income": "positive"`.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub score_factors: Map<String, Value>,
}

impl AgentPayload for ScoreResult {
    fn validate(&self) -> Result<(), String> {
        if !(MIN_CREDIT_SCORE..=MAX_CREDIT_SCORE).contains(&self.credit_score) {
            return Err(format!(
                "credit_score {} outside {MIN_CREDIT_SCORE}..={MAX_CREDIT_SCORE}",
                self.credit_score
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    #[serde(default = "medium_level")]
    pub risk_level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_interest_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_loan_amount: Option<f64>,
}

impl Default for RiskAssessment {
    fn default() -> Self {
        Self {
            risk_level: medium_level(),
            default_probability: None,
            recommended_interest_rate: None,
            maximum_loan_amount: None,
        }
    }
}

/// Coaching output, forwarded to callers unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guidance(pub Value);

impl AgentPayload for Guidance {
    fn validate(&self) -> Result<(), String> {
        if self.0.is_object() {
            Ok(())
        } else {
            Err("guidance result must be an object".to_string())
        }
    }
}

/// Storage names under which the ledger agent has made a record durable.
pub const DURABLE_LEDGER_STORAGE: [&str; 2] = ["blockchain", "ledger"];

/// Acknowledgement from the audit ledger agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    #[serde(default = "unknown_level")]
    pub storage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Set when the agent only parked the record in its own cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_id: Option<String>,
    /// The agent already held this `record_id`.
    #[serde(default)]
    pub duplicate: bool,
}

impl LedgerReceipt {
    pub fn is_durable(&self) -> bool {
        DURABLE_LEDGER_STORAGE.contains(&self.storage.as_str())
    }
}

impl AgentPayload for LedgerReceipt {}

impl AgentPayload for Value {}

fn unknown_level() -> String {
    "unknown".to_string()
}

fn medium_level() -> String {
    "medium".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn score_result_defaults_missing_risk_assessment() {
        let parsed = ScoreResult::from_result(json!({ "credit_score": 712 })).expect("parses");
        assert_eq!(parsed.credit_rating, "unknown");
        assert_eq!(parsed.risk_assessment.risk_level, "medium");
        assert!(!parsed.fallback);
    }

    #[test]
    fn score_result_rejects_out_of_range_scores() {
        let err = ScoreResult::from_result(json!({ "credit_score": 0 })).unwrap_err();
        assert!(err.contains("outside"), "unexpected error: {err}");
    }

    #[test]
    fn fraud_verdict_requires_probability() {
        assert!(FraudVerdict::from_result(json!({ "is_fraud": false })).is_err());
        assert!(
            FraudVerdict::from_result(json!({ "is_fraud": true, "fraud_probability": 1.4 }))
                .is_err()
        );
    }

    #[test]
    fn feature_set_tolerates_missing_categories() {
        let parsed = FeatureSet::from_result(json!({
            "features": {
                "financial": { "monthly_income": 120000 },
                "quality": { "completeness_score": 82.5 }
            },
            "feature_count": 14
        }))
        .expect("parses");

        assert!(parsed.features.demographic.is_empty());
        assert_eq!(parsed.features.quality.completeness_score, 82.5);
        assert_eq!(parsed.feature_count, Some(14));
    }

    #[test]
    fn guidance_must_be_an_object() {
        assert!(Guidance::from_result(json!("just text")).is_err());
        assert!(Guidance::from_result(json!({ "guidance": "save more" })).is_ok());
    }
}
