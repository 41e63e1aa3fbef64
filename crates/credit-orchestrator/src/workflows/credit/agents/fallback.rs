//! Static substitutes used when an agent cannot be reached.
//!
//! Values are fixed per agent so the pipeline always reaches a decision, even
//! under a full outage. Only the feature fallback echoes request fields.

use serde_json::{json, Map, Value};

use super::payloads::{
    FeatureGroups, FeatureQuality, FeatureSet, FraudVerdict, RiskAssessment, ScoreResult,
};
use super::registry::AgentKind;

pub const FALLBACK_AGE: u64 = 30;
pub const FALLBACK_MONTHLY_INCOME: u64 = 50_000;
pub const FALLBACK_COMPLETENESS: f64 = 60.0;
pub const FALLBACK_CREDIT_SCORE: i32 = 600;
pub const FALLBACK_LEDGER_STORAGE: &str = "fallback_cache";

/// JSON fallback for `agent`, shaped like that agent's `result` member.
pub fn fallback_payload(agent: AgentKind, request: &Value) -> Value {
    let typed = match agent {
        AgentKind::FeatureExtractor => serde_json::to_value(fallback_features(request)),
        AgentKind::FraudDetector => serde_json::to_value(fallback_verdict()),
        AgentKind::Scoring => serde_json::to_value(fallback_score()),
        AgentKind::RagCoach => Ok(json!({
            "fallback": true,
            "message": "Service unavailable",
        })),
        AgentKind::BlockchainLogger => Ok(json!({
            "success": true,
            "storage": FALLBACK_LEDGER_STORAGE,
            "note": "Stored locally, will sync when the ledger is available",
        })),
    };
    typed.unwrap_or_default()
}

/// Minimal feature set with a low completeness score.
pub fn fallback_features(request: &Value) -> FeatureSet {
    let mut demographic = Map::new();
    demographic.insert(
        "age".to_string(),
        numeric_field(request, "age").unwrap_or_else(|| json!(FALLBACK_AGE)),
    );

    let mut financial = Map::new();
    financial.insert(
        "monthly_income".to_string(),
        numeric_field(request, "monthly_income").unwrap_or_else(|| json!(FALLBACK_MONTHLY_INCOME)),
    );

    FeatureSet {
        features: FeatureGroups {
            demographic,
            financial,
            quality: FeatureQuality {
                completeness_score: FALLBACK_COMPLETENESS,
                missing_critical_features: Vec::new(),
            },
            ..FeatureGroups::default()
        },
        feature_count: None,
        processing_notes: vec!["fallback feature set".to_string()],
    }
}

pub fn fallback_verdict() -> FraudVerdict {
    FraudVerdict {
        is_fraud: false,
        fraud_probability: 0.1,
        risk_level: "low".to_string(),
        confidence: None,
        explanation: Some("Fallback: basic fraud check passed".to_string()),
    }
}

pub fn fallback_score() -> ScoreResult {
    ScoreResult {
        credit_score: FALLBACK_CREDIT_SCORE,
        credit_rating: "fair".to_string(),
        risk_assessment: RiskAssessment::default(),
        fallback: true,
        recommendations: Vec::new(),
        score_factors: Map::new(),
    }
}

/// Looks for a numeric `key` at the top level, then inside the
/// `personal_info` and `financial_info` sections.
fn numeric_field(request: &Value, key: &str) -> Option<Value> {
    let candidates = [
        request.get(key),
        request.get("personal_info").and_then(|info| info.get(key)),
        request.get("financial_info").and_then(|info| info.get(key)),
    ];

    candidates
        .into_iter()
        .flatten()
        .find(|value| value.is_number())
        .cloned()
}
