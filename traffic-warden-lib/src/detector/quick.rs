use tracing::debug;

use super::{evaluate_client, AbuseReport, AbuseThresholds};
use crate::clock::day_key;
use crate::stats::TrafficStats;

/// Check one client against the per-client thresholds in today's bucket.
///
/// Looks at a single entry of a single bucket. A client with no traffic
/// today always passes. Never creates buckets or entries.
pub fn quick_check(
    client_id: &str,
    stats: &TrafficStats,
    thresholds: &AbuseThresholds,
    now_ms: u64,
) -> Option<AbuseReport> {
    let today = day_key(now_ms);

    let report = stats
        .daily()
        .inspect(&today, |window| {
            window
                .client(client_id)
                .and_then(|entry| evaluate_client(client_id, entry, thresholds))
        })
        .flatten();

    if report.is_none() {
        debug!(client = client_id, day = %today, "quick check passed");
    }
    report
}
