//! Loan decision tiers.
//!
//! Pure functions over (score, requested amount); the only input from the
//! clock is the decision timestamp that anchors the validity window.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DECISION_VALIDITY_DAYS: i64 = 30;
pub const FRAUD_REJECTION_REASON: &str = "High fraud risk detected";

/// Final outcome of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanDecisionKind {
    Approved,
    ConditionalApproval,
    Rejected,
}

impl LoanDecisionKind {
    pub fn label(&self) -> &'static str {
        match self {
            LoanDecisionKind::Approved => "approved",
            LoanDecisionKind::ConditionalApproval => "conditional_approval",
            LoanDecisionKind::Rejected => "rejected",
        }
    }
}

/// Score tiers. Lower bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Poor,
    Fair,
    Good,
    Prime,
}

impl ScoreBand {
    pub fn for_score(score: i32) -> Self {
        match score {
            s if s >= 750 => ScoreBand::Prime,
            s if s >= 650 => ScoreBand::Good,
            s if s >= 550 => ScoreBand::Fair,
            _ => ScoreBand::Poor,
        }
    }

    pub fn decision(&self) -> LoanDecisionKind {
        match self {
            ScoreBand::Prime | ScoreBand::Good => LoanDecisionKind::Approved,
            ScoreBand::Fair => LoanDecisionKind::ConditionalApproval,
            ScoreBand::Poor => LoanDecisionKind::Rejected,
        }
    }

    /// Share of the requested amount that may be approved.
    pub fn amount_factor(&self) -> f64 {
        match self {
            ScoreBand::Prime => 1.0,
            ScoreBand::Good => 0.8,
            ScoreBand::Fair => 0.6,
            ScoreBand::Poor => 0.0,
        }
    }

    /// Annual interest rate in percent.
    pub fn interest_rate(&self) -> f64 {
        match self {
            ScoreBand::Prime => 8.5,
            ScoreBand::Good => 12.0,
            ScoreBand::Fair => 16.0,
            ScoreBand::Poor => 0.0,
        }
    }

    pub fn conditions(&self) -> Vec<String> {
        let conditions: &[&str] = match self {
            ScoreBand::Prime => &[],
            ScoreBand::Good => &["Salary certificate required", "Co-signer recommended"],
            ScoreBand::Fair => &[
                "Higher down payment required",
                "Co-signer mandatory",
                "Additional documentation needed",
            ],
            ScoreBand::Poor => &[
                "Credit score too low",
                "Consider credit improvement measures",
            ],
        };
        conditions.iter().map(|item| item.to_string()).collect()
    }
}

/// Loan decision returned to callers and written to the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanDecision {
    pub decision: LoanDecisionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_score: Option<i32>,
    pub risk_level: String,
    pub requested_amount: f64,
    pub approved_amount: f64,
    pub interest_rate: f64,
    pub conditions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fraud_probability: Option<f64>,
    pub decided_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl LoanDecision {
    pub fn with_risk_level(mut self, risk_level: impl Into<String>) -> Self {
        self.risk_level = risk_level.into();
        self
    }

    pub fn is_rejected(&self) -> bool {
        self.decision == LoanDecisionKind::Rejected
    }

    pub fn summary(&self) -> String {
        match self.decision {
            LoanDecisionKind::Rejected => match &self.reason {
                Some(reason) => format!("rejected: {reason}"),
                None => "rejected".to_string(),
            },
            kind => format!(
                "{} for {:.2} at {:.1}%",
                kind.label(),
                self.approved_amount,
                self.interest_rate
            ),
        }
    }
}

pub fn decide(score: i32, requested_amount: f64) -> LoanDecision {
    decide_at(score, requested_amount, Utc::now())
}

pub fn decide_at(score: i32, requested_amount: f64, decided_at: DateTime<Utc>) -> LoanDecision {
    let band = ScoreBand::for_score(score);
    let requested = sanitize_amount(requested_amount);
    let approved_amount = requested.min(requested * band.amount_factor());

    LoanDecision {
        decision: band.decision(),
        credit_score: Some(score),
        risk_level: "unknown".to_string(),
        requested_amount: requested,
        approved_amount,
        interest_rate: band.interest_rate(),
        conditions: band.conditions(),
        reason: match band {
            ScoreBand::Poor => Some("Credit score too low".to_string()),
            _ => None,
        },
        fraud_probability: None,
        decided_at,
        valid_until: decided_at + Duration::days(DECISION_VALIDITY_DAYS),
    }
}

/// Synthetic rejection used when the fraud check short-circuits the pipeline.
pub fn reject_for_fraud(fraud_probability: f64, requested_amount: f64) -> LoanDecision {
    reject_for_fraud_at(fraud_probability, requested_amount, Utc::now())
}

pub fn reject_for_fraud_at(
    fraud_probability: f64,
    requested_amount: f64,
    decided_at: DateTime<Utc>,
) -> LoanDecision {
    LoanDecision {
        decision: LoanDecisionKind::Rejected,
        credit_score: None,
        risk_level: "high".to_string(),
        requested_amount: sanitize_amount(requested_amount),
        approved_amount: 0.0,
        interest_rate: 0.0,
        conditions: vec![FRAUD_REJECTION_REASON.to_string()],
        reason: Some(FRAUD_REJECTION_REASON.to_string()),
        fraud_probability: Some(fraud_probability),
        decided_at,
        valid_until: decided_at + Duration::days(DECISION_VALIDITY_DAYS),
    }
}

fn sanitize_amount(amount: f64) -> f64 {
    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn prime_scores_receive_full_amount() {
        let decision = decide_at(780, 500_000.0, fixed_now());
        assert_eq!(decision.decision, LoanDecisionKind::Approved);
        assert_eq!(decision.approved_amount, 500_000.0);
        assert_eq!(decision.interest_rate, 8.5);
        assert!(decision.conditions.is_empty());
    }

    #[test]
    fn band_boundaries_are_inclusive_on_lower_bound() {
        let cases = [
            (900, LoanDecisionKind::Approved, 8.5),
            (750, LoanDecisionKind::Approved, 8.5),
            (749, LoanDecisionKind::Approved, 12.0),
            (650, LoanDecisionKind::Approved, 12.0),
            (649, LoanDecisionKind::ConditionalApproval, 16.0),
            (550, LoanDecisionKind::ConditionalApproval, 16.0),
            (549, LoanDecisionKind::Rejected, 0.0),
            (300, LoanDecisionKind::Rejected, 0.0),
        ];

        for (score, expected, rate) in cases {
            let decision = decide_at(score, 100_000.0, fixed_now());
            assert_eq!(decision.decision, expected, "score {score}");
            assert_eq!(decision.interest_rate, rate, "score {score}");
        }
    }

    #[test]
    fn approved_amount_never_increases_with_risk() {
        let requested = 250_000.0;
        let mut previous = f64::INFINITY;
        for score in (300..=900).rev() {
            let decision = decide_at(score, requested, fixed_now());
            assert!(decision.approved_amount <= requested);
            assert!(decision.approved_amount <= previous, "score {score}");
            previous = decision.approved_amount;
        }
    }

    #[test]
    fn tiered_amounts_and_conditions() {
        let good = decide_at(700, 100_000.0, fixed_now());
        assert_eq!(good.approved_amount, 80_000.0);
        assert_eq!(
            good.conditions,
            vec!["Salary certificate required", "Co-signer recommended"]
        );

        let fair = decide_at(600, 100_000.0, fixed_now());
        assert_eq!(fair.approved_amount, 60_000.0);
        assert_eq!(fair.conditions.len(), 3);

        let poor = decide_at(500, 100_000.0, fixed_now());
        assert_eq!(poor.approved_amount, 0.0);
        assert!(poor.conditions.contains(&"Credit score too low".to_string()));
    }

    #[test]
    fn validity_window_is_thirty_days() {
        let decision = decide_at(700, 10_000.0, fixed_now());
        assert_eq!(decision.valid_until - decision.decided_at, Duration::days(30));
    }

    #[test]
    fn fraud_rejection_carries_probability() {
        let decision = reject_for_fraud_at(0.92, 500_000.0, fixed_now());
        assert!(decision.is_rejected());
        assert_eq!(decision.approved_amount, 0.0);
        assert_eq!(decision.fraud_probability, Some(0.92));
        assert_eq!(decision.reason.as_deref(), Some(FRAUD_REJECTION_REASON));
        assert_eq!(decision.credit_score, None);
    }
}
