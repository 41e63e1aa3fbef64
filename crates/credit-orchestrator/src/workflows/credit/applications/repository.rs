use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::context::PipelineStage;
use super::domain::{ApplicationId, ApplicationRequest};
use super::pipeline::PipelineOutcome;
use crate::workflows::credit::agents::StageStatus;
use crate::workflows::credit::decision::LoanDecision;

/// Lifecycle of a stored application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Processing,
    Completed,
    Rejected,
}

impl ApplicationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::Processing => "processing",
            ApplicationStatus::Completed => "completed",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

/// Repository record holding the stage map and decision of one application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationRecord {
    pub application_id: ApplicationId,
    pub applicant_id: String,
    pub requested_amount: f64,
    pub status: ApplicationStatus,
    pub stages: BTreeMap<PipelineStage, StageStatus>,
    pub decision: Option<LoanDecision>,
    pub partial: bool,
    pub degraded: bool,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationRecord {
    pub fn processing(
        application_id: ApplicationId,
        request: &ApplicationRequest,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            application_id,
            applicant_id: request.applicant_id().to_string(),
            requested_amount: request.loan_amount(),
            status: ApplicationStatus::Processing,
            stages: BTreeMap::new(),
            decision: None,
            partial: false,
            degraded: false,
            submitted_at,
            updated_at: submitted_at,
        }
    }

    pub fn complete(&mut self, outcome: &PipelineOutcome) {
        self.status = if outcome.decision.is_rejected() {
            ApplicationStatus::Rejected
        } else {
            ApplicationStatus::Completed
        };
        self.stages = outcome.stages.statuses();
        self.decision = Some(outcome.decision.clone());
        self.partial = outcome.partial;
        self.degraded = outcome.degraded;
        self.updated_at = Utc::now();
    }

    pub fn decision_summary(&self) -> String {
        match &self.decision {
            Some(decision) => decision.summary(),
            None => "pending decision".to_string(),
        }
    }

    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.application_id.clone(),
            applicant_id: self.applicant_id.clone(),
            status: self.status.label(),
            processing_stages: self.stages.clone(),
            decision_summary: self.decision_summary(),
            partial: self.partial,
            degraded: self.degraded,
            last_updated: self.updated_at,
        }
    }
}

/// Storage abstraction so the service can be exercised in isolation.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError>;
    fn update(&self, record: ApplicationRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Stage-by-stage status exposed by the lookup route.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub applicant_id: String,
    pub status: &'static str,
    pub processing_stages: BTreeMap<PipelineStage, StageStatus>,
    pub decision_summary: String,
    pub partial: bool,
    pub degraded: bool,
    pub last_updated: DateTime<Utc>,
}
