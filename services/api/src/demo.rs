use crate::infra::InMemoryApplicationRepository;
use clap::Args;
use credit_orchestrator::error::AppError;
use credit_orchestrator::workflows::credit::agents::{
    AgentClient, AgentKind, ScriptedReply, ScriptedTransport,
};
use credit_orchestrator::workflows::credit::applications::{
    ApplicationReceipt, ApplicationSubmission, CreditApplicationService,
};
use credit_orchestrator::workflows::credit::audit::{AuditSinkAdapter, InMemoryLedger};
use credit_orchestrator::workflows::translation::TranslationService;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const DEMO_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Applicant identifier used for every scenario
    #[arg(long, default_value = "DEMO-001")]
    pub(crate) applicant_id: String,
    /// Requested loan amount
    #[arg(long, default_value_t = 500_000.0)]
    pub(crate) amount: f64,
    /// Credit score returned by the scripted scoring agent (300-900)
    #[arg(long, default_value_t = 780)]
    pub(crate) score: i32,
    /// Language for the translated decision summary
    #[arg(long, default_value = "hi")]
    pub(crate) language: String,
}

struct DemoHarness {
    service: CreditApplicationService<InMemoryApplicationRepository>,
    audit: Arc<AuditSinkAdapter>,
    ledger: Arc<InMemoryLedger>,
}

fn harness(transport: ScriptedTransport, ledger: InMemoryLedger) -> DemoHarness {
    let agents = Arc::new(AgentClient::new(Arc::new(transport), DEMO_TIMEOUT));
    let ledger = Arc::new(ledger);
    let audit = Arc::new(AuditSinkAdapter::new(ledger.clone(), 100));
    let service = CreditApplicationService::new(
        Arc::new(InMemoryApplicationRepository::default()),
        agents,
        audit.clone(),
    );
    DemoHarness {
        service,
        audit,
        ledger,
    }
}

fn healthy_agents(score: i32, is_fraud: bool) -> ScriptedTransport {
    ScriptedTransport::new()
        .with(
            AgentKind::FeatureExtractor,
            ScriptedReply::Result(json!({
                "features": {
                    "demographic": { "age": 34 },
                    "financial": { "monthly_income": 120000 },
                    "quality": { "completeness_score": 85.0 }
                }
            })),
        )
        .with(
            AgentKind::FraudDetector,
            ScriptedReply::Result(json!({
                "is_fraud": is_fraud,
                "fraud_probability": if is_fraud { 0.92 } else { 0.05 },
                "risk_level": if is_fraud { "high" } else { "low" }
            })),
        )
        .with(
            AgentKind::Scoring,
            ScriptedReply::Result(json!({
                "credit_score": score,
                "credit_rating": "scripted",
                "risk_assessment": { "risk_level": "low" }
            })),
        )
}

fn submission(args: &DemoArgs) -> ApplicationSubmission {
    ApplicationSubmission {
        applicant_id: Some(args.applicant_id.clone()),
        personal_info: Some(json!({ "age": 34, "name": "Demo Applicant" })),
        financial_info: Some(json!({ "monthly_income": 120000 })),
        loan_amount: Some(args.amount),
        ..ApplicationSubmission::default()
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Credit orchestrator demo");
    println!(
        "Applicant {} requesting {:.2} (scripted score {})",
        args.applicant_id, args.amount, args.score
    );

    println!("\n1. All agents healthy");
    let healthy = harness(healthy_agents(args.score, false), InMemoryLedger::new());
    let summary = submit_and_render(&healthy, &args).await;

    println!("\n2. Fraud detector flags the applicant");
    let flagged = harness(healthy_agents(args.score, true), InMemoryLedger::new());
    submit_and_render(&flagged, &args).await;

    println!("\n3. Every agent and the ledger offline");
    let outage = harness(ScriptedTransport::new(), InMemoryLedger::unavailable());
    submit_and_render(&outage, &args).await;
    let status = outage.audit.cache_status();
    println!(
        "   Audit cache holds {} of {} records",
        status.size, status.capacity
    );
    outage.ledger.set_available(true);
    let report = outage.audit.reconcile().await;
    println!(
        "   Ledger restored: synced {}, remaining {}, ledger now holds {}",
        report.synced,
        report.remaining,
        outage.ledger.len()
    );

    if let Some(summary) = summary {
        let translation = TranslationService::offline();
        let outcome = translation.translate(&summary, "en", &args.language).await;
        println!(
            "\nDecision summary [{}, confidence {:.1}]: {}",
            outcome.target_language, outcome.confidence, outcome.translated_text
        );
    }

    Ok(())
}

async fn submit_and_render(harness: &DemoHarness, args: &DemoArgs) -> Option<String> {
    match harness.service.submit(submission(args)).await {
        Ok(receipt) => {
            render_receipt(&receipt);
            Some(receipt.result.decision.summary())
        }
        Err(err) => {
            println!("   Submission rejected: {err}");
            None
        }
    }
}

fn render_receipt(receipt: &ApplicationReceipt) {
    println!(
        "   Application {} -> {}",
        receipt.application_id, receipt.status
    );
    for (stage, status) in receipt.result.stages.statuses() {
        println!("   - {:<20} {}", stage.label(), status.label());
    }
    println!("   Decision: {}", receipt.result.decision.summary());
    let flags: Vec<&str> = [
        (receipt.result.partial, "partial"),
        (receipt.result.degraded, "degraded"),
    ]
    .into_iter()
    .filter_map(|(set, label)| set.then_some(label))
    .collect();
    if !flags.is_empty() {
        println!("   Flags: {}", flags.join(", "));
    }
    println!("   Audit: {}", receipt.result.audit.label());
}
