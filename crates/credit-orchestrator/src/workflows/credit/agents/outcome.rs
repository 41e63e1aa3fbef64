use serde::{Deserialize, Serialize};

/// Outcome of one agent-backed stage.
///
/// `Unavailable` carries the static fallback used in place of the agent's
/// answer; `Failed` carries no payload at all.
#[derive(Debug, Clone, PartialEq)]
pub enum StageResult<T> {
    Ok(T),
    Unavailable(T),
    Failed(StageFailure),
}

impl<T> StageResult<T> {
    pub fn status(&self) -> StageStatus {
        match self {
            StageResult::Ok(_) => StageStatus::Ok,
            StageResult::Unavailable(_) => StageStatus::Unavailable,
            StageResult::Failed(_) => StageStatus::Failed,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            StageResult::Ok(value) | StageResult::Unavailable(value) => Some(value),
            StageResult::Failed(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            StageResult::Ok(value) | StageResult::Unavailable(value) => Some(value),
            StageResult::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        match self {
            StageResult::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn map<U, F>(self, f: F) -> StageResult<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            StageResult::Ok(value) => StageResult::Ok(f(value)),
            StageResult::Unavailable(value) => StageResult::Unavailable(f(value)),
            StageResult::Failed(failure) => StageResult::Failed(failure),
        }
    }
}

/// Caller-visible status of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Ok,
    Unavailable,
    Failed,
    Skipped,
}

impl StageStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StageStatus::Ok => "ok",
            StageStatus::Unavailable => "unavailable",
            StageStatus::Failed => "failed",
            StageStatus::Skipped => "skipped",
        }
    }
}

/// Why an agent call produced no usable payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageFailure {
    #[error("agent request timed out after {millis}ms")]
    Timeout { millis: u64 },
    #[error("agent reported an error: {message}")]
    AgentError { status: Option<u16>, message: String },
    #[error("agent response was malformed: {message}")]
    MalformedResponse { message: String },
}

impl StageFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self, StageFailure::Timeout { .. })
    }
}
