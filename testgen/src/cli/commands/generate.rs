use anyhow::{Context, Result};
use testgen_core::{GenerationReport, TestgenConfig, TicketKey};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::app::GenerateArgs;

/// Handle `generate` and `regenerate`
pub async fn execute(config: &TestgenConfig, args: GenerateArgs, regenerate: bool) -> Result<()> {
    let orchestrator = super::build_orchestrator(config)?;
    let key = TicketKey::new(&args.key);
    let options = args.scenarios.options(args.force || regenerate);
    info!("Generating test cases for {} with {:?}", key, options);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling generation");
            on_interrupt.cancel();
        }
    });

    let report = orchestrator
        .generate_tests_cancellable(&key, options, &cancel)
        .await
        .with_context(|| format!("Failed to generate test cases for {}", key))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &GenerationReport) {
    let source = if report.cache_hit { "stored" } else { "generated" };
    println!("✅ {} {} test cases for {}", report.count, source, report.ticket_key);
    if report.discarded > 0 {
        println!("   {} drafts discarded", report.discarded);
    }
    if let Some(warning) = &report.low_yield {
        println!("⚠️  Only {} test cases, expected at least {}", warning.produced, warning.minimum);
    }
    println!();

    for (i, case) in report.test_cases.iter().enumerate() {
        println!("{}. {}  [{} | {}]", i + 1, case.title, case.priority, case.category);
        if !case.preconditions.is_empty() {
            println!("   Preconditions: {}", case.preconditions.join("; "));
        }
        for (n, step) in case.steps.iter().enumerate() {
            let flagged = case.step_warnings.iter().any(|flag| flag.index == n);
            println!("   {}{}. {}", if flagged { "!" } else { " " }, n + 1, step);
        }
        println!("   Expected: {}", case.expected_result);
        if !case.tags.is_empty() {
            println!("   Tags: {}", case.tags.iter().cloned().collect::<Vec<_>>().join(", "));
        }
        println!();
    }

    if report.flagged_steps > 0 {
        println!("{} steps marked with ! may not be directly executable", report.flagged_steps);
    }
}
