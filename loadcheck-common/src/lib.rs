use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Requests slower than this (ms) count toward `slow_requests`.
pub const SLOW_MS: f64 = 200.0;
/// Requests slower than this (ms) count toward `very_slow_requests` and fail the success check.
pub const VERY_SLOW_MS: f64 = 500.0;
/// Requests slower than this (ms) get a diagnostic log line during the run.
pub const SLOW_LOG_MS: f64 = 300.0;
/// The p95 SLA target (ms) the gap analysis measures against.
pub const P95_TARGET_MS: f64 = 200.0;

/// Trend metric holding every request's wall-clock duration in milliseconds.
pub const REQUEST_DURATION: &str = "request_duration";
/// Rate metric: fraction of requests that failed the composite success check.
pub const REQUEST_FAILED: &str = "request_failed";
/// Rate metric: fraction of requests slower than [`SLOW_MS`].
pub const SLOW_REQUESTS: &str = "slow_requests";
/// Rate metric: fraction of requests slower than [`VERY_SLOW_MS`].
pub const VERY_SLOW_REQUESTS: &str = "very_slow_requests";

/// Percentiles tracked by trend snapshots. Threshold predicates may only
/// reference these; anything else is rejected at configuration time.
pub const TRACKED_PERCENTILES: [u32; 5] = [50, 75, 90, 95, 99];

/// Error types for loadcheck operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LoadCheckError {
    #[error("Load profile has no stages")]
    EmptyProfile,

    #[error("Invalid target URL: {0}")]
    InvalidTargetUrl(String),

    #[error("Invalid threshold {predicate:?} for metric {metric:?}: {reason}")]
    InvalidThreshold {
        metric: String,
        predicate: String,
        reason: String,
    },

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Failed to read config file: {0}")]
    ConfigRead(String),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("Failed to write report artifact to {path}: {reason}")]
    ArtifactWrite { path: String, reason: String },
}

/// Result type for loadcheck operations
pub type Result<T> = std::result::Result<T, LoadCheckError>;

/// One window of the concurrency ramp: active virtual users interpolate
/// linearly from the previous stage's target (0 before the first stage)
/// to `target` over `duration_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub duration_ms: u64,
    pub target: u32,
}

/// A pass/fail criterion over one metric's terminal value, e.g.
/// `{metric: "request_duration", predicate: "p(95)<200"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threshold {
    pub metric: String,
    pub predicate: String,
}

/// The two metric shapes the sink aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Numeric distribution supporting percentile/mean/max queries.
    Trend,
    /// Boolean-fraction aggregate.
    Rate,
}

/// Kind of a built-in metric name, or `None` for names the engine never records.
pub fn metric_kind(name: &str) -> Option<MetricKind> {
    match name {
        REQUEST_DURATION => Some(MetricKind::Trend),
        REQUEST_FAILED | SLOW_REQUESTS | VERY_SLOW_REQUESTS => Some(MetricKind::Rate),
        _ => None,
    }
}

/// Scalar a predicate reads from a metric snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selector {
    /// One of [`TRACKED_PERCENTILES`], trend metrics only.
    Percentile(u32),
    /// Boolean-true fraction, rate metrics only.
    Rate,
    /// Arithmetic mean, trend metrics only.
    Mean,
    /// Largest sample, trend metrics only.
    Max,
    /// Number of recorded observations, any metric.
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Lt,
    Le,
    Gt,
    Ge,
}

/// Parsed form of a predicate string like `p(95)<200` or `rate<0.01`.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub selector: Selector,
    pub cmp: Cmp,
    pub limit: f64,
}

impl Predicate {
    /// Parse `<selector><op><literal>`, ignoring whitespace. Selectors:
    /// `p(N)`, `rate`, `mean`, `max`, `count`. Operators: `<`, `<=`, `>`, `>=`.
    /// Returns a human-readable reason on failure; callers wrap it into
    /// [`LoadCheckError::InvalidThreshold`].
    pub fn parse(input: &str) -> std::result::Result<Self, String> {
        let s: String = input.chars().filter(|c| !c.is_whitespace()).collect();

        let (cmp, pos, op_len) = if let Some(p) = s.find("<=") {
            (Cmp::Le, p, 2)
        } else if let Some(p) = s.find(">=") {
            (Cmp::Ge, p, 2)
        } else if let Some(p) = s.find('<') {
            (Cmp::Lt, p, 1)
        } else if let Some(p) = s.find('>') {
            (Cmp::Gt, p, 1)
        } else {
            return Err("no comparison operator".to_string());
        };

        let selector = parse_selector(&s[..pos])?;
        let literal = &s[pos + op_len..];
        let limit: f64 = literal
            .parse()
            .map_err(|_| format!("bad comparison literal {literal:?}"))?;

        Ok(Predicate { selector, cmp, limit })
    }

    /// Whether `observed` satisfies the predicate.
    pub fn holds(&self, observed: f64) -> bool {
        match self.cmp {
            Cmp::Lt => observed < self.limit,
            Cmp::Le => observed <= self.limit,
            Cmp::Gt => observed > self.limit,
            Cmp::Ge => observed >= self.limit,
        }
    }
}

fn parse_selector(s: &str) -> std::result::Result<Selector, String> {
    match s {
        "" => Err("missing selector".to_string()),
        "rate" => Ok(Selector::Rate),
        "mean" => Ok(Selector::Mean),
        "max" => Ok(Selector::Max),
        "count" => Ok(Selector::Count),
        _ => {
            let inner = s
                .strip_prefix("p(")
                .and_then(|rest| rest.strip_suffix(')'))
                .ok_or_else(|| format!("unknown selector {s:?}"))?;
            let q: u32 = inner
                .parse()
                .map_err(|_| format!("bad percentile {inner:?}"))?;
            if !TRACKED_PERCENTILES.contains(&q) {
                return Err(format!(
                    "percentile p({q}) is not tracked; use one of {TRACKED_PERCENTILES:?}"
                ));
            }
            Ok(Selector::Percentile(q))
        }
    }
}

/// A threshold whose predicate parsed and matched its metric's kind.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledThreshold {
    pub metric: String,
    /// Original predicate text, kept for reporting.
    pub spec: String,
    pub predicate: Predicate,
}

/// Full run configuration. Immutable once the run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub target_url: String,
    pub stages: Vec<Stage>,
    pub thresholds: Vec<Threshold>,
    /// Quiescent interval between a virtual user's iterations.
    pub pause_ms: u64,
    /// Per-request I/O timeout; no network call may block past this.
    pub timeout_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            target_url: "http://localhost:3000/api/categories".to_string(),
            stages: vec![
                Stage { duration_ms: 10_000, target: 50 },
                Stage { duration_ms: 50_000, target: 100 },
                Stage { duration_ms: 10_000, target: 0 },
            ],
            thresholds: default_thresholds(),
            pause_ms: 100,
            timeout_ms: 10_000,
        }
    }
}

/// The harness's standard SLA tiers: a five-point latency ladder plus
/// failure and slow-request rate caps.
pub fn default_thresholds() -> Vec<Threshold> {
    let t = |metric: &str, predicate: &str| Threshold {
        metric: metric.to_string(),
        predicate: predicate.to_string(),
    };
    vec![
        t(REQUEST_DURATION, "p(50)<50"),
        t(REQUEST_DURATION, "p(75)<100"),
        t(REQUEST_DURATION, "p(90)<150"),
        t(REQUEST_DURATION, "p(95)<200"),
        t(REQUEST_DURATION, "p(99)<400"),
        t(REQUEST_FAILED, "rate<0.01"),
        t(SLOW_REQUESTS, "rate<0.05"),
        t(VERY_SLOW_REQUESTS, "rate<0.01"),
    ]
}

impl RunConfig {
    /// Validate the configuration and parse every threshold predicate.
    /// Any error here is fatal before load generation starts.
    pub fn compile(&self) -> Result<Vec<CompiledThreshold>> {
        if self.stages.is_empty() {
            return Err(LoadCheckError::EmptyProfile);
        }
        if !self.target_url.starts_with("http://") && !self.target_url.starts_with("https://") {
            return Err(LoadCheckError::InvalidTargetUrl(self.target_url.clone()));
        }

        let mut compiled = Vec::with_capacity(self.thresholds.len());
        for threshold in &self.thresholds {
            let kind = metric_kind(&threshold.metric)
                .ok_or_else(|| LoadCheckError::UnknownMetric(threshold.metric.clone()))?;

            let invalid = |reason: String| LoadCheckError::InvalidThreshold {
                metric: threshold.metric.clone(),
                predicate: threshold.predicate.clone(),
                reason,
            };

            let predicate = Predicate::parse(&threshold.predicate).map_err(invalid)?;
            check_selector_kind(predicate.selector, kind).map_err(invalid)?;

            compiled.push(CompiledThreshold {
                metric: threshold.metric.clone(),
                spec: threshold.predicate.clone(),
                predicate,
            });
        }
        Ok(compiled)
    }

    /// Total length of the load profile.
    pub fn total_duration(&self) -> Duration {
        Duration::from_millis(self.stages.iter().map(|s| s.duration_ms).sum())
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn check_selector_kind(selector: Selector, kind: MetricKind) -> std::result::Result<(), String> {
    match (selector, kind) {
        (Selector::Rate, MetricKind::Rate) => Ok(()),
        (Selector::Rate, MetricKind::Trend) => {
            Err("selector `rate` only applies to rate metrics".to_string())
        }
        (Selector::Percentile(_) | Selector::Mean | Selector::Max, MetricKind::Trend) => Ok(()),
        (Selector::Percentile(_) | Selector::Mean | Selector::Max, MetricKind::Rate) => {
            Err("distribution selectors only apply to trend metrics".to_string())
        }
        (Selector::Count, _) => Ok(()),
    }
}
