use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier wrapper for accepted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn for_sequence(submitted_at: DateTime<Utc>, sequence: u64) -> Self {
        ApplicationId(format!(
            "APP-{}-{sequence:06}",
            submitted_at.format("%Y%m%d")
        ))
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw intake payload. Every field is optional until validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financial_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_amount: Option<f64>,
    /// Additional applicant data forwarded to the agents untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Validated application. Immutable once accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationRequest {
    applicant_id: String,
    personal_info: Map<String, Value>,
    financial_info: Map<String, Value>,
    loan_amount: f64,
    extra: Map<String, Value>,
}

impl ApplicationRequest {
    pub fn from_submission(submission: ApplicationSubmission) -> Result<Self, ValidationError> {
        let applicant_id = submission
            .applicant_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(ValidationError::MissingField("applicant_id"))?;
        let personal_info = required_object("personal_info", submission.personal_info)?;
        let financial_info = required_object("financial_info", submission.financial_info)?;

        let loan_amount = submission
            .loan_amount
            .or(submission.requested_amount)
            .unwrap_or(0.0);
        if !loan_amount.is_finite() || loan_amount < 0.0 {
            return Err(ValidationError::InvalidAmount(loan_amount));
        }

        Ok(Self {
            applicant_id,
            personal_info,
            financial_info,
            loan_amount,
            extra: submission.extra,
        })
    }

    pub fn applicant_id(&self) -> &str {
        &self.applicant_id
    }

    pub fn personal_info(&self) -> &Map<String, Value> {
        &self.personal_info
    }

    pub fn financial_info(&self) -> &Map<String, Value> {
        &self.financial_info
    }

    pub fn loan_amount(&self) -> f64 {
        self.loan_amount
    }

    /// JSON body sent to the feature and fraud agents.
    pub fn to_payload(&self) -> Value {
        let mut payload = self.extra.clone();
        payload.insert(
            "applicant_id".to_string(),
            Value::String(self.applicant_id.clone()),
        );
        payload.insert(
            "personal_info".to_string(),
            Value::Object(self.personal_info.clone()),
        );
        payload.insert(
            "financial_info".to_string(),
            Value::Object(self.financial_info.clone()),
        );
        payload.insert("loan_amount".to_string(), Value::from(self.loan_amount));
        Value::Object(payload)
    }
}

fn required_object(
    field: &'static str,
    value: Option<Value>,
) -> Result<Map<String, Value>, ValidationError> {
    match value {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(ValidationError::NotAnObject(field)),
    }
}

/// Submission rejected before any agent is called.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("field `{0}` must be a JSON object")]
    NotAnObject(&'static str),
    #[error("loan amount must be a non-negative number, got {0}")]
    InvalidAmount(f64),
    #[error("No data provided")]
    EmptyPayload,
}
