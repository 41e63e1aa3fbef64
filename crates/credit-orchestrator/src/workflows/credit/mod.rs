//! Credit application pipeline: agent calls, loan decisions, and the audit trail.

pub mod agents;
pub mod applications;
pub mod audit;
pub mod decision;

pub use decision::{LoanDecision, LoanDecisionKind, ScoreBand};
