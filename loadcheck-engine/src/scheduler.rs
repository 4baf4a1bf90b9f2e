use crate::sink::MetricSink;
use crate::vu;
use loadcheck_client::Probe;
use loadcheck_common::{RunConfig, Stage};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Reconciliation granularity of the concurrency ramp.
const SCHEDULER_TICK: Duration = Duration::from_millis(100);

/// Interpolated concurrency target at `elapsed` into the profile.
///
/// Concurrency ramps linearly within each stage, from the previous stage's
/// target (0 before the first stage) to the stage's own target, so the
/// value never exceeds the larger of the two endpoints. A zero-duration
/// stage is an instantaneous jump. Past the end of the profile the final
/// stage's target holds.
pub fn target_at(stages: &[Stage], elapsed: Duration) -> u32 {
    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    let mut stage_start_ms = 0.0;
    let mut from = 0u32;

    for stage in stages {
        let span = stage.duration_ms as f64;
        if elapsed_ms < stage_start_ms + span {
            let frac = (elapsed_ms - stage_start_ms) / span;
            let interp = from as f64 + (stage.target as f64 - from as f64) * frac;
            return interp.round() as u32;
        }
        stage_start_ms += span;
        from = stage.target;
    }

    stages.last().map(|s| s.target).unwrap_or(0)
}

/// Drive the load profile to completion.
///
/// Every tick the scheduler publishes the interpolated target on a watch
/// channel and spawns virtual users into vacant slots below it; a user
/// whose slot index reaches the published target retires at its next
/// iteration boundary. Spawning follows the interpolation, so activation
/// smooths across each stage instead of bursting at stage entry. After the
/// final stage the scheduler publishes 0 and joins every handle (the drain
/// barrier) before returning the run's elapsed wall-clock time.
pub async fn run_profile(config: &RunConfig, probe: Arc<Probe>, sink: Arc<MetricSink>) -> Duration {
    let total = config.total_duration();
    let pause = config.pause();
    let (active_tx, active_rx) = watch::channel(0u32);
    let mut handles: HashMap<u32, JoinHandle<()>> = HashMap::new();

    let run_start = Instant::now();
    let mut tick = tokio::time::interval(SCHEDULER_TICK);

    loop {
        tick.tick().await;
        let elapsed = run_start.elapsed();
        if elapsed >= total {
            break;
        }

        let want = target_at(&config.stages, elapsed);
        tracing::trace!(want, active = handles.len(), "ramp tick");

        // Publish first so oversubscribed users retire at their next boundary.
        active_tx.send_replace(want);

        handles.retain(|_, handle| !handle.is_finished());
        for slot in 0..want {
            handles.entry(slot).or_insert_with(|| {
                tokio::spawn(vu::run_virtual_user(
                    slot,
                    probe.clone(),
                    sink.clone(),
                    active_rx.clone(),
                    run_start,
                    pause,
                ))
            });
        }
    }

    // Profile over: retire everyone and wait for in-flight work to drain.
    active_tx.send_replace(0);
    for (slot, handle) in handles.drain() {
        if handle.await.is_err() {
            // A panicked user must not take the run down with it.
            tracing::error!(slot, "virtual user task panicked");
        }
    }

    run_start.elapsed()
}
