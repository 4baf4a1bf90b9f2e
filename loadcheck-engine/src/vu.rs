use crate::sink::{MetricSink, Observation};
use loadcheck_client::{Probe, Sample};
use loadcheck_common as common;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Derive the request-level facts recorded into the sink.
///
/// A request succeeds iff it returned 200 with a non-empty body in under
/// [`common::VERY_SLOW_MS`]; everything else, including transport
/// failures, counts as failed.
pub fn classify(sample: &Sample, offset: Duration) -> Observation {
    let success = sample.status_code == 200
        && sample.body_size > 0
        && sample.duration_ms < common::VERY_SLOW_MS;
    Observation {
        offset_ms: offset.as_secs_f64() * 1000.0,
        status_code: sample.status_code,
        duration_ms: sample.duration_ms,
        body_size: sample.body_size,
        success,
    }
}

/// One virtual user: request, classify, record, pause, repeat.
///
/// The loop checks the retirement signal once per iteration boundary and
/// exits when the published concurrency target drops to `slot` or below,
/// so an in-flight request always completes and records its observation
/// before exit. Transport failures are data, not errors; the loop
/// survives until retired.
pub async fn run_virtual_user(
    slot: u32,
    probe: Arc<Probe>,
    sink: Arc<MetricSink>,
    active: watch::Receiver<u32>,
    run_start: Instant,
    pause: Duration,
) {
    loop {
        if *active.borrow() <= slot {
            break;
        }

        let sample = probe.fetch_once().await;
        let obs = classify(&sample, run_start.elapsed());

        if obs.duration_ms > common::SLOW_LOG_MS {
            // Observability only; never blocks the loop.
            tracing::warn!(
                slot,
                offset_ms = obs.offset_ms,
                duration_ms = obs.duration_ms,
                status = obs.status_code,
                "slow request"
            );
        }

        sink.observe(&obs);

        tokio::time::sleep(pause).await;
    }
}
