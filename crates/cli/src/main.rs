//! Relay CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration** — command-line flags plus an optional TOML file,
//!    validated before anything starts.
//! 2. **Wire observability** — `tracing-subscriber` to stderr (text or JSON)
//!    and, when requested, an OpenTelemetry OTLP span exporter.
//! 3. **Construct infrastructure** — the [`fetcher::HttpFetcher`] behind the
//!    [`pipeline::Fetch`] port, and the report writer on stdout.
//! 4. **Run** — spawn the stage workers, hand stdin to the [`nodes::Driver`],
//!    and exit only after every worker has drained.
//!
//! Exit status is non-zero when the pipeline could not be built, a worker
//! failed, or stdin could not be read.

mod observability;
mod settings;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fetcher::HttpFetcher;
use nodes::{Driver, DriverReport, ShutdownReason};
use pipeline::{PipelineConfig, PipelineError, PipelineRunId};
use tokio::io::BufReader;
use tracing::Instrument;

use crate::settings::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let telemetry = observability::init(
        &cli.log_level,
        cli.log_format,
        cli.otlp_endpoint.as_deref(),
    )?;

    let run_id = PipelineRunId::new_random();
    let result = match cli.pipeline_config() {
        Ok(config) => {
            run(config)
                .instrument(tracing::info_span!("relay", run_id = %run_id))
                .await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "relay stopped with an error");
    }
    telemetry.shutdown();
    result
}

async fn run(config: PipelineConfig) -> Result<()> {
    let fetcher = HttpFetcher::new(&config.user_agent).context("failed to set up fetcher")?;

    let pipeline = nodes::spawn_default(
        Arc::new(fetcher),
        tokio::io::stdout(),
        config.report_format,
    )
    .context("failed to build pipeline")?;

    tracing::info!(
        stages = ?pipeline.stage_names().map(|n| n.as_str()).collect::<Vec<_>>(),
        bootstrap = config.bootstrap.len(),
        sentinel = %config.sentinel,
        "pipeline started"
    );

    let driver = Driver::new(
        config,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    );
    let report = driver.run(pipeline).await?;

    log_summary(&report);

    match report.reason {
        ShutdownReason::InputError { message } => {
            Err(PipelineError::InputUnavailable { message }.into())
        }
        ShutdownReason::Sentinel | ShutdownReason::EndOfInput => Ok(()),
    }
}

fn log_summary(report: &DriverReport) {
    for stage in &report.stages {
        tracing::info!(
            stage = %stage.stage,
            received = stage.received,
            forwarded = stage.forwarded,
            dropped = stage.dropped,
            "stage summary"
        );
    }

    let failed = report
        .stage(nodes::ClassifyStage::NAME)
        .map_or(0, |s| s.dropped);
    tracing::info!(
        reason = ?report.reason,
        sent = report.sent,
        failed,
        "pipeline stopped"
    );
}
