pub mod analyzer;
pub mod scheduler;
pub mod sink;
pub mod thresholds;
pub mod vu;

use analyzer::Analysis;
use loadcheck_client::{Probe, ProbeConfig};
use loadcheck_common::{Result, RunConfig};
use serde::Serialize;
use sink::{MetricSink, TerminalSnapshot};
use std::sync::Arc;
use thresholds::ThresholdOutcome;

/// Outcome of one complete run: the terminal metric snapshot, every
/// threshold's verdict, and the derived analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub elapsed_secs: f64,
    pub snapshot: TerminalSnapshot,
    pub thresholds: Vec<ThresholdOutcome>,
    pub passed: bool,
    pub analysis: Analysis,
}

/// Run the full engine: compile the config, drive the ramp, drain, then
/// evaluate thresholds and build the summary. Configuration errors are
/// fatal here, before any load is generated.
pub async fn run(config: &RunConfig) -> Result<RunReport> {
    let compiled = config.compile()?;
    let probe = Arc::new(Probe::new(ProbeConfig {
        target_url: config.target_url.clone(),
        timeout: config.timeout(),
    })?);
    let sink = Arc::new(MetricSink::new());

    tracing::info!(
        target_url = %config.target_url,
        stages = config.stages.len(),
        total_secs = config.total_duration().as_secs_f64(),
        "starting load run"
    );

    let elapsed = scheduler::run_profile(config, probe, sink.clone()).await;

    let snapshot = sink.terminal_snapshot();
    let outcomes = thresholds::evaluate(&compiled, &snapshot);
    let passed = thresholds::all_passed(&outcomes);
    let analysis = analyzer::analyze(&snapshot, elapsed.as_secs_f64());

    tracing::info!(
        requests = analysis.total_requests,
        p95_ms = analysis.gap.actual_ms,
        passed,
        "load run complete"
    );

    Ok(RunReport {
        elapsed_secs: elapsed.as_secs_f64(),
        snapshot,
        thresholds: outcomes,
        passed,
        analysis,
    })
}
