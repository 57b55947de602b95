mod args;
mod config;
mod logging;
mod output;

use std::process::ExitCode;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use import_client::{ImportJob, ImportJobResult, ImportOrchestrator};
use import_logging::{import_info, import_warn, level_for_verbosity};

use crate::args::Cli;
use crate::logging::LogDestination;

const EXIT_DOMAIN_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    logging::initialize(
        LogDestination::from_log_file(cli.log_file.clone()),
        level_for_verbosity(cli.verbose),
    );

    let settings = config::resolve_settings(&cli, |name| std::env::var(name).ok())?;
    let orchestrator =
        ImportOrchestrator::new(settings).context("failed to build the import client")?;

    let import = orchestrator.import_property(&cli.url, &cli.user, print_tick);
    tokio::pin!(import);

    let outcome = tokio::select! {
        outcome = &mut import => outcome,
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => {
                    import_warn!("Interrupted, cancelling import of {}", cli.url);
                    orchestrator.cancel(&cli.url, &cli.user);
                }
                Err(err) => import_warn!("Ctrl-C handler unavailable: {}", err),
            }
            import.await
        }
    };

    match outcome.context("import did not complete")? {
        ImportJobResult::Success { result } => {
            let rendered = serde_json::to_string_pretty(&result)?;
            match &cli.output {
                Some(path) => {
                    let written = output::write_atomically(path, &rendered)
                        .with_context(|| format!("failed to write result to {path:?}"))?;
                    import_info!("Wrote import result to {:?}", written);
                }
                None => println!("{rendered}"),
            }
            Ok(ExitCode::SUCCESS)
        }
        ImportJobResult::Error {
            error,
            retry_after_seconds,
        } => {
            eprintln!("import failed: {}", failure_reason(&error));
            if let Some(seconds) = retry_after_seconds {
                eprintln!("retry after {seconds}s");
            }
            Ok(ExitCode::from(EXIT_DOMAIN_ERROR))
        }
    }
}

/// The queue may report a failure without saying why.
fn failure_reason(error: &str) -> &str {
    match error.trim() {
        "" => "no reason given",
        reason => reason,
    }
}

fn print_tick(job: &ImportJob) {
    eprintln!(
        "{} job {} {}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        job.job_id,
        job.status
    );
}
