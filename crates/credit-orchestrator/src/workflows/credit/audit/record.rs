use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::workflows::credit::agents::{FraudVerdict, ScoreResult};
use crate::workflows::credit::decision::LoanDecision;

/// Fields that must never contribute to an integrity hash.
pub const SENSITIVE_FIELDS: [&str; 7] = [
    "personal_details",
    "phone_number",
    "email",
    "address",
    "bank_account",
    "pan_number",
    "aadhar_number",
];

const RECORD_ID_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditRecordType {
    CreditAssessment,
    FraudDetection,
    LoanDecision,
}

impl AuditRecordType {
    pub fn label(&self) -> &'static str {
        match self {
            AuditRecordType::CreditAssessment => "credit_assessment",
            AuditRecordType::FraudDetection => "fraud_detection",
            AuditRecordType::LoanDecision => "loan_decision",
        }
    }
}

/// Type-specific summary kept on the record. Raw payloads are never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditDetails {
    CreditAssessment {
        credit_score: Option<i64>,
        credit_rating: Option<String>,
        risk_level: Option<String>,
        factors_considered: usize,
    },
    FraudDetection {
        is_fraud: Option<bool>,
        fraud_probability: Option<f64>,
        risk_level: Option<String>,
    },
    LoanDecision {
        decision: Option<String>,
        approved_amount: Option<f64>,
        interest_rate: Option<f64>,
        conditions: Vec<String>,
    },
}

impl AuditDetails {
    fn from_payload(record_type: AuditRecordType, payload: &Value) -> Self {
        let text = |key: &str| payload.get(key).and_then(Value::as_str).map(str::to_string);
        let number = |key: &str| payload.get(key).and_then(Value::as_f64);

        match record_type {
            AuditRecordType::CreditAssessment => AuditDetails::CreditAssessment {
                credit_score: payload.get("credit_score").and_then(Value::as_i64),
                credit_rating: text("credit_rating"),
                risk_level: text("risk_level").or_else(|| {
                    payload
                        .pointer("/risk_assessment/risk_level")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                }),
                factors_considered: payload
                    .get("score_factors")
                    .or_else(|| payload.get("factors"))
                    .map(|factors| match factors {
                        Value::Object(map) => map.len(),
                        Value::Array(items) => items.len(),
                        _ => 0,
                    })
                    .unwrap_or(0),
            },
            AuditRecordType::FraudDetection => AuditDetails::FraudDetection {
                is_fraud: payload.get("is_fraud").and_then(Value::as_bool),
                fraud_probability: number("fraud_probability"),
                risk_level: text("risk_level"),
            },
            AuditRecordType::LoanDecision => AuditDetails::LoanDecision {
                decision: text("decision"),
                approved_amount: number("approved_amount"),
                interest_rate: number("interest_rate"),
                conditions: payload
                    .get("conditions")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
        }
    }
}

/// Append-only audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub record_id: String,
    pub record_type: AuditRecordType,
    pub timestamp: DateTime<Utc>,
    pub applicant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// SHA-256 over the canonical payload with sensitive fields removed.
    pub data_hash: String,
    pub details: AuditDetails,
}

impl AuditRecord {
    pub fn new(record_type: AuditRecordType, applicant_id: &str, payload: &Value) -> Self {
        Self::at(record_type, applicant_id, payload, Utc::now())
    }

    pub fn at(
        record_type: AuditRecordType,
        applicant_id: &str,
        payload: &Value,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            record_id: record_id(applicant_id, timestamp, payload),
            record_type,
            timestamp,
            applicant_id: applicant_id.to_string(),
            session_id: payload
                .get("session_id")
                .and_then(Value::as_str)
                .map(str::to_string),
            data_hash: integrity_hash(payload),
            details: AuditDetails::from_payload(record_type, payload),
        }
    }

    pub fn for_decision(applicant_id: &str, decision: &LoanDecision) -> Self {
        Self::typed(AuditRecordType::LoanDecision, applicant_id, decision)
    }

    pub fn for_score(applicant_id: &str, score: &ScoreResult) -> Self {
        Self::typed(AuditRecordType::CreditAssessment, applicant_id, score)
    }

    pub fn for_fraud_check(applicant_id: &str, verdict: &FraudVerdict) -> Self {
        Self::typed(AuditRecordType::FraudDetection, applicant_id, verdict)
    }

    fn typed<T: Serialize>(record_type: AuditRecordType, applicant_id: &str, value: &T) -> Self {
        let payload = serde_json::to_value(value).unwrap_or_default();
        Self::new(record_type, applicant_id, &payload)
    }
}

/// Recursively drops every key in [`SENSITIVE_FIELDS`], case-insensitively.
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .iter()
                .filter(|(key, _)| !is_sensitive_field(key))
                .map(|(key, nested)| (key.clone(), sanitize(nested)))
                .collect();
            Value::Object(cleaned)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        other => other.clone(),
    }
}

pub fn is_sensitive_field(name: &str) -> bool {
    SENSITIVE_FIELDS
        .iter()
        .any(|field| field.eq_ignore_ascii_case(name))
}

pub fn integrity_hash(payload: &Value) -> String {
    let content = canonical_json(&sanitize(payload));
    hex::encode(Sha256::digest(content.as_bytes()))
}

pub fn record_id(applicant_id: &str, timestamp: DateTime<Utc>, payload: &Value) -> String {
    let content = format!(
        "{}_{}_{}",
        applicant_id,
        timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
        canonical_json(&sanitize(payload))
    );
    let mut digest = hex::encode(Sha256::digest(content.as_bytes()));
    digest.truncate(RECORD_ID_LEN);
    digest
}

/// Compact JSON with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
    sort_keys(value).to_string()
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(key, nested)| (key, sort_keys(nested))).collect();
            Value::Object(
                sorted
                    .into_iter()
                    .map(|(key, nested)| (key.clone(), nested))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}
