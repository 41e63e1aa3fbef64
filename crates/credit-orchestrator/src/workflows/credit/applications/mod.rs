//! Credit application intake, pipeline execution, and status lookup.

pub mod context;
pub mod domain;
pub mod pipeline;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use context::{PipelineContext, PipelineStage, StageReport};
pub use domain::{ApplicationId, ApplicationRequest, ApplicationSubmission, ValidationError};
pub use pipeline::{PipelineExecutor, PipelineOutcome};
pub use repository::{
    ApplicationRecord, ApplicationRepository, ApplicationStatus, ApplicationStatusView,
    RepositoryError,
};
pub use router::application_router;
pub use service::{
    AgentCallReport, ApplicationReceipt, ApplicationServiceError, CreditApplicationService,
    FraudCheckReport, GuidanceReport, ScoreReport,
};
