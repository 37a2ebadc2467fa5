use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::TrafficMonitor;

/// Run sweeps and prunes on a timer, independent of request traffic.
///
/// Sleeps until the earlier of the two runs falls due, then claims the same
/// timers the request path uses, so a sweep never runs twice for one
/// interval and a due run is never skipped. Stops when `shutdown` is
/// cancelled.
pub fn spawn_maintenance(
    monitor: Arc<TrafficMonitor>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            full_sweep_interval_ms = monitor.schedule().full_sweep_interval_ms,
            prune_interval_ms = monitor.schedule().prune_interval_ms,
            "Background maintenance started"
        );

        loop {
            let wait = until_next_run(&monitor);
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(wait) => {
                    let (report, _) = monitor.maintain();
                    if let Some(report) = report.filter(|r| r.has_abuse) {
                        warn!(
                            offenders = report.offenders.len(),
                            warnings = report.warnings.len(),
                            "Background sweep flagged abuse"
                        );
                    }
                }
            }
        }

        info!("Background maintenance stopped");
    })
}

/// Time left until either timer is strictly past its interval, at least 1ms.
fn until_next_run(monitor: &TrafficMonitor) -> Duration {
    let schedule = monitor.schedule();
    let timers = monitor.timers();
    let next_sweep = timers
        .last_full_sweep()
        .saturating_add(schedule.full_sweep_interval_ms);
    let next_prune = timers.last_prune().saturating_add(schedule.prune_interval_ms);
    let due = next_sweep.min(next_prune).saturating_add(1);

    let wait_ms = due.saturating_sub(monitor.now_ms()).max(1);
    debug!(wait_ms, "Next maintenance run");
    Duration::from_millis(wait_ms)
}
