use crate::sink::TerminalSnapshot;
use loadcheck_common::{metric_kind, CompiledThreshold, MetricKind, Selector};
use serde::Serialize;

/// One threshold's verdict against the terminal snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdOutcome {
    pub metric: String,
    pub predicate: String,
    pub observed: f64,
    pub passed: bool,
}

/// Evaluate every compiled threshold against the terminal snapshot.
///
/// Call only after all virtual users have drained; the verdicts use the
/// full accumulated sample. Every individual outcome is reported so
/// operators can see which SLA tier broke, not just the aggregate.
pub fn evaluate(thresholds: &[CompiledThreshold], snapshot: &TerminalSnapshot) -> Vec<ThresholdOutcome> {
    thresholds
        .iter()
        .map(|t| {
            let observed = observed_value(t, snapshot);
            ThresholdOutcome {
                metric: t.metric.clone(),
                predicate: t.spec.clone(),
                observed,
                passed: t.predicate.holds(observed),
            }
        })
        .collect()
}

/// Overall run verdict: FAIL if any threshold failed.
pub fn all_passed(outcomes: &[ThresholdOutcome]) -> bool {
    outcomes.iter().all(|o| o.passed)
}

fn observed_value(threshold: &CompiledThreshold, snapshot: &TerminalSnapshot) -> f64 {
    // Compilation guarantees the selector matches the metric's kind.
    match threshold.predicate.selector {
        Selector::Rate => snapshot.rate(&threshold.metric).rate,
        Selector::Percentile(q) => snapshot.trend(&threshold.metric).percentile(q),
        Selector::Mean => snapshot.trend(&threshold.metric).mean,
        Selector::Max => snapshot.trend(&threshold.metric).max,
        Selector::Count => match metric_kind(&threshold.metric) {
            Some(MetricKind::Rate) => snapshot.rate(&threshold.metric).count as f64,
            _ => snapshot.trend(&threshold.metric).count as f64,
        },
    }
}
