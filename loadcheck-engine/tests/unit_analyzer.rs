use loadcheck_common::{RunConfig, REQUEST_DURATION};
use loadcheck_engine::analyzer::{
    analyze, build_artifact, gap_analysis, letter_grade, write_artifact, Tier,
};
use loadcheck_engine::sink::MetricSink;
use loadcheck_engine::thresholds::evaluate;
use loadcheck_engine::RunReport;

#[test]
fn test_letter_grade_breakpoints() {
    // Strict upper bounds; first matching bucket wins.
    assert_eq!(letter_grade(0.0).0, "A+");
    assert_eq!(letter_grade(99.9).0, "A+");
    assert_eq!(letter_grade(100.0).0, "A");
    assert_eq!(letter_grade(149.9).0, "A");
    assert_eq!(letter_grade(150.0).0, "B+");
    assert_eq!(letter_grade(199.9).0, "B+");
    assert_eq!(letter_grade(200.0).0, "B");
    assert_eq!(letter_grade(249.9).0, "B");
    assert_eq!(letter_grade(250.0).0, "C");
    assert_eq!(letter_grade(299.9).0, "C");
    assert_eq!(letter_grade(300.0).0, "D");
    assert_eq!(letter_grade(10_000.0).0, "D");
}

#[test]
fn test_letter_grade_assessments() {
    assert_eq!(letter_grade(50.0), ("A+", "Excellent performance!"));
    assert_eq!(letter_grade(225.0), ("B", "Acceptable, needs minor optimization"));
    assert_eq!(letter_grade(350.0), ("D", "Poor performance, needs major optimization"));
}

#[test]
fn test_gap_analysis_failed_run() {
    // p95=250 vs target 200: 50ms over, 25% over, quick-wins tier.
    let gap = gap_analysis(250.0);
    assert_eq!(gap.gap_ms, 50.0);
    assert_eq!(gap.gap_percent, 25.0);
    assert!(!gap.passed);
    assert_eq!(Tier::for_gap(gap.gap_ms), Some(Tier::QuickWins));
}

#[test]
fn test_gap_analysis_passed_run() {
    // p95=180 vs target 200: 20ms of margin, no recommendations.
    let gap = gap_analysis(180.0);
    assert_eq!(gap.gap_ms, -20.0);
    assert!(gap.passed);
    assert_eq!(Tier::for_gap(gap.gap_ms), None);
}

#[test]
fn test_tier_boundaries() {
    assert_eq!(Tier::for_gap(0.0), None);
    assert_eq!(Tier::for_gap(0.1), Some(Tier::QuickWins));
    assert_eq!(Tier::for_gap(50.0), Some(Tier::QuickWins));
    assert_eq!(Tier::for_gap(50.1), Some(Tier::MediumEffort));
    assert_eq!(Tier::for_gap(100.0), Some(Tier::MediumEffort));
    assert_eq!(Tier::for_gap(100.1), Some(Tier::MajorOptimization));
}

#[test]
fn test_tier_entries_are_fixed_and_ordered() {
    assert_eq!(
        Tier::QuickWins.entries(),
        [
            "Enable response caching (Redis/Memcached)",
            "Add database indexes on frequently queried columns",
            "Enable HTTP compression (Gzip)",
            "Optimize database connection pool settings",
        ]
    );
    assert_eq!(Tier::MediumEffort.entries().len(), 5);
    assert_eq!(Tier::MediumEffort.entries()[0], "Implement all quick wins above");
    assert_eq!(Tier::MajorOptimization.entries().len(), 5);
    assert_eq!(
        Tier::MajorOptimization.entries()[4],
        "Scale server resources (CPU/Memory)"
    );
}

/// 100 samples at fixed latencies; p95 lands on `p95_ms`.
fn snapshot_with_p95(p95_ms: f64) -> loadcheck_engine::sink::TerminalSnapshot {
    let sink = MetricSink::new();
    for _ in 0..95 {
        sink.add_trend(REQUEST_DURATION, p95_ms / 2.0);
    }
    for _ in 0..5 {
        sink.add_trend(REQUEST_DURATION, p95_ms);
    }
    for i in 0..100u64 {
        sink.add_rate("request_failed", i == 0); // 1% failed
        sink.add_rate("slow_requests", false);
        sink.add_rate("very_slow_requests", false);
    }
    sink.terminal_snapshot()
}

#[test]
fn test_analyze_derives_summary_fields() {
    let snapshot = snapshot_with_p95(250.0);
    let analysis = analyze(&snapshot, 10.0);

    assert_eq!(analysis.gap.actual_ms, 250.0);
    assert_eq!(analysis.grade, "B");
    assert_eq!(analysis.tier, Some(Tier::QuickWins));
    assert_eq!(analysis.total_requests, 100);
    assert_eq!(analysis.requests_per_sec, 10.0);
    assert_eq!(analysis.success_rate, 99.0);
}

#[test]
fn test_analyze_is_idempotent() {
    // Pure function of the snapshot: same input, byte-identical output.
    let snapshot = snapshot_with_p95(250.0);
    let first = analyze(&snapshot, 10.0);
    let second = analyze(&snapshot, 10.0);
    assert_eq!(first, second);

    let json_first = serde_json::to_string(&first).unwrap();
    let json_second = serde_json::to_string(&second).unwrap();
    assert_eq!(json_first, json_second);
}

fn report_for(snapshot: loadcheck_engine::sink::TerminalSnapshot) -> RunReport {
    let config = RunConfig::default();
    let outcomes = evaluate(&config.compile().unwrap(), &snapshot);
    let passed = outcomes.iter().all(|o| o.passed);
    let analysis = analyze(&snapshot, 10.0);
    RunReport {
        elapsed_secs: 10.0,
        snapshot,
        thresholds: outcomes,
        passed,
        analysis,
    }
}

#[test]
fn test_artifact_shape() {
    let artifact = build_artifact(&report_for(snapshot_with_p95(250.0)));

    assert_eq!(artifact.summary.p95_target, 200.0);
    assert_eq!(artifact.summary.p95_actual, 250.0);
    assert_eq!(artifact.summary.gap_ms, 50.0);
    assert_eq!(artifact.summary.gap_percent, 25.0);
    assert_eq!(artifact.summary.status, "FAILED");
    assert_eq!(artifact.summary.grade, "B");
    assert_eq!(artifact.summary.total_requests, 100);
    assert_eq!(artifact.summary.success_rate, 99.0);

    // Raw snapshots ride along for detailed analysis.
    assert_eq!(artifact.detailed_metrics.trend(REQUEST_DURATION).count, 100);

    let json: serde_json::Value =
        serde_json::from_str(&serde_json::to_string_pretty(&artifact).unwrap()).unwrap();
    assert!(json["summary"]["p95_actual"].is_number());
    assert!(json["detailed_metrics"]["trends"]["request_duration"]["p95"].is_number());
    assert!(json["detailed_metrics"]["rates"]["request_failed"]["rate"].is_number());
}

#[test]
fn test_write_artifact_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("performance-analysis.json");

    let artifact = build_artifact(&report_for(snapshot_with_p95(180.0)));
    write_artifact(&path, &artifact).expect("write failed");

    let raw = std::fs::read_to_string(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["summary"]["status"], "PASSED");
    assert_eq!(json["summary"]["grade"], "B+");
}

#[test]
fn test_write_artifact_failure_keeps_summary() {
    let artifact = build_artifact(&report_for(snapshot_with_p95(180.0)));
    let err = write_artifact(
        std::path::Path::new("/nonexistent-dir/performance-analysis.json"),
        &artifact,
    )
    .expect_err("write into a missing directory must fail");

    assert!(matches!(err, loadcheck_common::LoadCheckError::ArtifactWrite { .. }));
    // The in-memory artifact is untouched and still serializable.
    assert_eq!(artifact.summary.status, "PASSED");
}
