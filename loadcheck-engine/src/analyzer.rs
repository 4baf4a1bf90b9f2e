use crate::sink::TerminalSnapshot;
use crate::thresholds::ThresholdOutcome;
use crate::RunReport;
use loadcheck_common::{self as common, LoadCheckError, Result};
use serde::Serialize;
use std::path::Path;

/// Grade buckets evaluated in increasing order of p95; first match wins,
/// upper bounds are strict.
const GRADES: [(f64, &str, &str); 5] = [
    (100.0, "A+", "Excellent performance!"),
    (150.0, "A", "Very good performance"),
    (200.0, "B+", "Good performance, close to target"),
    (250.0, "B", "Acceptable, needs minor optimization"),
    (300.0, "C", "Needs improvement"),
];
const GRADE_FLOOR: (&str, &str) = ("D", "Poor performance, needs major optimization");

/// Deterministic, total letter grade for a p95 latency, with its
/// assessment line.
pub fn letter_grade(p95_ms: f64) -> (&'static str, &'static str) {
    for (bound, grade, assessment) in GRADES {
        if p95_ms < bound {
            return (grade, assessment);
        }
    }
    GRADE_FLOOR
}

/// Remediation effort bucket, selected by how far p95 overshot the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tier {
    QuickWins,
    MediumEffort,
    MajorOptimization,
}

impl Tier {
    /// Tier for a failed SLA, or `None` when the gap is non-positive
    /// (recommendations are only emitted for failed runs).
    pub fn for_gap(gap_ms: f64) -> Option<Tier> {
        if gap_ms <= 0.0 {
            None
        } else if gap_ms <= 50.0 {
            Some(Tier::QuickWins)
        } else if gap_ms <= 100.0 {
            Some(Tier::MediumEffort)
        } else {
            Some(Tier::MajorOptimization)
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            Tier::QuickWins => "Quick wins (gap < 50ms)",
            Tier::MediumEffort => "Medium effort (gap 50-100ms)",
            Tier::MajorOptimization => "Major optimization needed (gap > 100ms)",
        }
    }

    /// The tier's fixed, ordered remediation list. Static advisory
    /// content, reproduced verbatim for report compatibility.
    pub fn entries(self) -> &'static [&'static str] {
        match self {
            Tier::QuickWins => &[
                "Enable response caching (Redis/Memcached)",
                "Add database indexes on frequently queried columns",
                "Enable HTTP compression (Gzip)",
                "Optimize database connection pool settings",
            ],
            Tier::MediumEffort => &[
                "Implement all quick wins above",
                "Review and optimize database queries",
                "Consider connection pooling optimization",
                "Add application-level caching",
                "Review server resource allocation",
            ],
            Tier::MajorOptimization => &[
                "Complete database performance audit",
                "Implement comprehensive caching strategy",
                "Consider database sharding/replication",
                "Review application architecture",
                "Scale server resources (CPU/Memory)",
            ],
        }
    }
}

/// Printed beneath the tier recommendations whenever the SLA failed.
const IMMEDIATE_ACTION_ITEMS: [&str; 4] = [
    "Check server resources during peak load",
    "Profile database query performance",
    "Monitor garbage collection (if applicable)",
    "Review application logs for bottlenecks",
];

const NEXT_STEPS: [&str; 4] = [
    "Implement recommended optimizations",
    "Re-run this test to measure improvement",
    "Set up continuous performance monitoring",
    "Document performance baseline",
];

/// Distance between measured p95 and the SLA target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GapAnalysis {
    pub target_ms: f64,
    pub actual_ms: f64,
    /// Positive when over target.
    pub gap_ms: f64,
    pub gap_percent: f64,
    pub passed: bool,
}

pub fn gap_analysis(p95_ms: f64) -> GapAnalysis {
    let gap_ms = p95_ms - common::P95_TARGET_MS;
    GapAnalysis {
        target_ms: common::P95_TARGET_MS,
        actual_ms: p95_ms,
        gap_ms,
        gap_percent: gap_ms / common::P95_TARGET_MS * 100.0,
        passed: gap_ms <= 0.0,
    }
}

/// Derived view of a finished run. Pure function of the terminal snapshot:
/// analyzing the same snapshot twice yields identical fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub gap: GapAnalysis,
    pub grade: &'static str,
    pub assessment: &'static str,
    pub tier: Option<Tier>,
    pub total_requests: u64,
    pub requests_per_sec: f64,
    /// Percentage in 0..=100.
    pub success_rate: f64,
    pub mean_ms: f64,
}

pub fn analyze(snapshot: &TerminalSnapshot, elapsed_secs: f64) -> Analysis {
    let duration = snapshot.trend(common::REQUEST_DURATION);
    let failed = snapshot.rate(common::REQUEST_FAILED);

    let gap = gap_analysis(duration.p95);
    let (grade, assessment) = letter_grade(duration.p95);

    Analysis {
        gap,
        grade,
        assessment,
        tier: Tier::for_gap(gap.gap_ms),
        total_requests: duration.count,
        requests_per_sec: if elapsed_secs > 0.0 {
            duration.count as f64 / elapsed_secs
        } else {
            0.0
        },
        success_rate: (1.0 - failed.rate) * 100.0,
        mean_ms: duration.mean,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactSummary {
    pub p95_target: f64,
    pub p95_actual: f64,
    pub gap_ms: f64,
    pub gap_percent: f64,
    pub status: &'static str,
    pub grade: &'static str,
    pub total_requests: u64,
    pub success_rate: f64,
}

/// The machine-readable report persisted at run completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifact {
    pub summary: ArtifactSummary,
    pub detailed_metrics: TerminalSnapshot,
}

pub fn build_artifact(report: &RunReport) -> Artifact {
    let analysis = &report.analysis;
    Artifact {
        summary: ArtifactSummary {
            p95_target: analysis.gap.target_ms,
            p95_actual: analysis.gap.actual_ms,
            gap_ms: analysis.gap.gap_ms,
            gap_percent: analysis.gap.gap_percent,
            status: if analysis.gap.passed { "PASSED" } else { "FAILED" },
            grade: analysis.grade,
            total_requests: analysis.total_requests,
            success_rate: analysis.success_rate,
        },
        detailed_metrics: report.snapshot.clone(),
    }
}

/// Write the artifact as pretty-printed JSON, exactly once. Failure here
/// never erases the in-memory summary; the caller reports it after the
/// console output.
pub fn write_artifact(path: &Path, artifact: &Artifact) -> Result<()> {
    let write_err = |reason: String| LoadCheckError::ArtifactWrite {
        path: path.display().to_string(),
        reason,
    };
    let json = serde_json::to_string_pretty(artifact).map_err(|e| write_err(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| write_err(e.to_string()))?;
    Ok(())
}

/// Structured end-of-run console report.
pub fn print_report(report: &RunReport) {
    let analysis = &report.analysis;
    let duration = report.snapshot.trend(common::REQUEST_DURATION);

    println!();
    println!("Comprehensive Performance Analysis");
    println!("==================================");
    println!();
    println!("Current performance:");
    println!("  Total requests:    {}", analysis.total_requests);
    println!("  Requests/sec:      {:.1}", analysis.requests_per_sec);
    println!("  Success rate:      {:.2}%", analysis.success_rate);
    println!("  Average response:  {:.2} ms", analysis.mean_ms);
    println!();
    println!("Response time distribution:");
    println!("  P50 (median):      {:.2} ms", duration.p50);
    println!("  P75:               {:.2} ms", duration.p75);
    println!("  P90:               {:.2} ms", duration.p90);
    println!(
        "  P95:               {:.2} ms    [target: <{:.0} ms]",
        duration.p95,
        analysis.gap.target_ms
    );
    println!("  P99:               {:.2} ms", duration.p99);
    println!("  Max:               {:.2} ms", duration.max);
    println!();

    print_thresholds(&report.thresholds);
    print_gap(&analysis.gap);

    println!("Performance grade:");
    println!("  Grade:      {}", analysis.grade);
    println!("  Assessment: {}", analysis.assessment);
    println!();

    if let Some(tier) = analysis.tier {
        println!("Optimization recommendations:");
        println!("  {}:", tier.heading());
        for (i, entry) in tier.entries().iter().enumerate() {
            println!("    {}. {}", i + 1, entry);
        }
        println!();
        println!("  Immediate action items:");
        for (i, item) in IMMEDIATE_ACTION_ITEMS.iter().enumerate() {
            println!("    {}. {}", i + 1, item);
        }
        println!();
    } else {
        println!("The target meets the p95 < {:.0} ms requirement.", analysis.gap.target_ms);
        println!("Consider this performance as your baseline.");
        println!();
    }

    println!("Next steps:");
    for (i, step) in NEXT_STEPS.iter().enumerate() {
        println!("  {}. {}", i + 1, step);
    }
    println!();
}

fn print_thresholds(outcomes: &[ThresholdOutcome]) {
    let pass_fail = |passed: bool| if passed { "✓" } else { "✗" };

    println!("Thresholds:");
    for outcome in outcomes {
        println!(
            "  {:<20} {:<12} observed {:<10.3} {}",
            outcome.metric,
            outcome.predicate,
            outcome.observed,
            pass_fail(outcome.passed),
        );
    }
    let overall = outcomes.iter().all(|o| o.passed);
    println!("  Result: {}", if overall { "PASS" } else { "FAIL" });
    println!();
}

fn print_gap(gap: &GapAnalysis) {
    println!("Gap analysis:");
    if gap.passed {
        println!("  Status: PASSED");
        println!("  Margin: {:.2} ms under target", -gap.gap_ms);
    } else {
        println!("  Current p95: {:.2} ms", gap.actual_ms);
        println!("  Target p95:  {:.2} ms", gap.target_ms);
        println!("  Gap: +{:.2} ms ({:.1}% over target)", gap.gap_ms, gap.gap_percent);
        println!("  Status: FAILED");
    }
    println!();
}
