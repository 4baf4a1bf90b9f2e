use loadcheck_common as common;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// One record per completed request attempt. Immutable once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Milliseconds since run start when the attempt completed.
    pub offset_ms: f64,
    /// HTTP status, or 0 for a transport failure.
    pub status_code: u16,
    pub duration_ms: f64,
    pub body_size: usize,
    pub success: bool,
}

#[derive(Debug, Default, Clone, Copy)]
struct RateCounter {
    count: u64,
    hits: u64,
}

#[derive(Debug, Default)]
struct SinkState {
    trends: HashMap<String, Vec<f64>>,
    rates: HashMap<String, RateCounter>,
}

/// Concurrency-safe accumulator of raw observations, keyed by metric name.
///
/// The sink is the run's only shared mutable state. It is explicitly owned
/// by the engine and handed to every virtual user behind an `Arc`, never
/// held as a module-level singleton. All mutation is append/increment-only;
/// snapshots are exact once every recording task has drained.
#[derive(Debug, Default)]
pub struct MetricSink {
    state: Mutex<SinkState>,
}

impl MetricSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one numeric sample to the named trend metric.
    pub fn add_trend(&self, name: &str, value: f64) {
        let mut state = self.lock();
        state.trends.entry(name.to_string()).or_default().push(value);
    }

    /// Record one boolean into the named rate metric.
    pub fn add_rate(&self, name: &str, hit: bool) {
        let mut state = self.lock();
        let counter = state.rates.entry(name.to_string()).or_default();
        counter.count += 1;
        if hit {
            counter.hits += 1;
        }
    }

    /// Record one observation into all four standard metrics.
    pub fn observe(&self, obs: &Observation) {
        self.add_trend(common::REQUEST_DURATION, obs.duration_ms);
        self.add_rate(common::REQUEST_FAILED, !obs.success);
        self.add_rate(common::SLOW_REQUESTS, obs.duration_ms > common::SLOW_MS);
        self.add_rate(common::VERY_SLOW_REQUESTS, obs.duration_ms > common::VERY_SLOW_MS);
    }

    /// Point-in-time aggregate of one trend metric; all zeros if nothing
    /// was recorded under `name`.
    pub fn trend_snapshot(&self, name: &str) -> TrendSnapshot {
        let state = self.lock();
        match state.trends.get(name) {
            Some(samples) => TrendSnapshot::from_samples(samples),
            None => TrendSnapshot::default(),
        }
    }

    /// Point-in-time aggregate of one rate metric; all zeros if nothing
    /// was recorded under `name`.
    pub fn rate_snapshot(&self, name: &str) -> RateSnapshot {
        let state = self.lock();
        match state.rates.get(name) {
            Some(counter) => RateSnapshot::from_counter(counter.count, counter.hits),
            None => RateSnapshot::default(),
        }
    }

    /// Aggregate every recorded metric. Call after all virtual users have
    /// joined to get the run's terminal snapshot.
    pub fn terminal_snapshot(&self) -> TerminalSnapshot {
        let state = self.lock();
        TerminalSnapshot {
            trends: state
                .trends
                .iter()
                .map(|(name, samples)| (name.clone(), TrendSnapshot::from_samples(samples)))
                .collect(),
            rates: state
                .rates
                .iter()
                .map(|(name, c)| (name.clone(), RateSnapshot::from_counter(c.count, c.hits)))
                .collect(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SinkState> {
        // Append-only counters stay valid even if a recording task panicked
        // mid-call, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Distribution aggregate of one trend metric.
///
/// Percentiles use the nearest-rank variant `sorted[floor(q/100 * n)]`
/// clamped to the last element; an empty sample yields 0 everywhere.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSnapshot {
    pub count: u64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl TrendSnapshot {
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let mut sorted = samples.to_vec();
        sorted.sort_unstable_by(|a, b| a.total_cmp(b));

        let count = sorted.len() as u64;
        let mean = sorted.iter().sum::<f64>() / count as f64;
        Self {
            count,
            mean,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            p50: percentile_of_sorted(&sorted, 50.0),
            p75: percentile_of_sorted(&sorted, 75.0),
            p90: percentile_of_sorted(&sorted, 90.0),
            p95: percentile_of_sorted(&sorted, 95.0),
            p99: percentile_of_sorted(&sorted, 99.0),
        }
    }

    /// Value of one of the tracked percentiles. Predicates are validated
    /// against the tracked set at configuration time; untracked values
    /// return 0.
    pub fn percentile(&self, q: u32) -> f64 {
        match q {
            50 => self.p50,
            75 => self.p75,
            90 => self.p90,
            95 => self.p95,
            99 => self.p99,
            _ => 0.0,
        }
    }
}

/// Boolean-fraction aggregate of one rate metric.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub count: u64,
    pub hits: u64,
    pub rate: f64,
}

impl RateSnapshot {
    fn from_counter(count: u64, hits: u64) -> Self {
        let rate = if count == 0 { 0.0 } else { hits as f64 / count as f64 };
        Self { count, hits, rate }
    }
}

/// All metrics' final values, materialized once after drain.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalSnapshot {
    pub trends: BTreeMap<String, TrendSnapshot>,
    pub rates: BTreeMap<String, RateSnapshot>,
}

impl TerminalSnapshot {
    /// Trend aggregate for `name`, zeros if absent.
    pub fn trend(&self, name: &str) -> TrendSnapshot {
        self.trends.get(name).cloned().unwrap_or_default()
    }

    /// Rate aggregate for `name`, zeros if absent.
    pub fn rate(&self, name: &str) -> RateSnapshot {
        self.rates.get(name).copied().unwrap_or_default()
    }
}

/// Sort `samples` ascending and return the element at index
/// `floor(q/100 * n)`, clamped to the last element. Returns 0 for an empty
/// slice. Exposed for boundary tests that pin the method.
pub fn percentile(samples: &[f64], q: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    percentile_of_sorted(&sorted, q)
}

fn percentile_of_sorted(sorted: &[f64], q: f64) -> f64 {
    let idx = (q / 100.0 * sorted.len() as f64).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
