//! Scheduled job: generate today's market summary and email it to every subscriber.

use std::process::ExitCode;

use chrono::Local;
use market_intel::bootstrap::Runtime;
use market_intel::telemetry;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let runtime = match Runtime::from_env() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let Some(distributor) = runtime.distributor() else {
        eprintln!("configuration error: SMTP_HOST is not set");
        return ExitCode::FAILURE;
    };

    let summary = runtime.insights.daily_summary(Local::now().date_naive()).await;
    if !summary.is_success() {
        tracing::error!(message = ?summary.message, "failed to generate daily summary");
        return ExitCode::FAILURE;
    }

    match distributor.distribute(&summary).await {
        Ok(report) => {
            for o in &report.outcomes {
                match &o.error {
                    None => println!("sent to {}", o.recipient),
                    Some(e) => println!("failed to send to {}: {e}", o.recipient),
                }
            }
            println!(
                "{} of {} digests delivered",
                report.delivered(),
                report.attempts()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "distribution aborted");
            ExitCode::FAILURE
        }
    }
}
