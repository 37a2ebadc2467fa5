use tracing::info;

use super::{
    enforced, evaluate_client, AbuseDetectionReport, AbuseThresholds, AbuseWarning, WarningKind,
};
use crate::stats::TrafficStats;

/// Evaluate every client of the most recent day bucket, plus its totals.
///
/// The most recent bucket is the greatest day key. With no day bucket at all
/// the report is empty and `has_abuse` is false. Offenders are ordered by
/// client identifier.
pub fn full_sweep(stats: &TrafficStats, thresholds: &AbuseThresholds) -> AbuseDetectionReport {
    let Some(date) = stats.daily().latest_key() else {
        info!("full sweep skipped: no traffic recorded yet");
        return AbuseDetectionReport::empty();
    };

    let analysed = stats.daily().inspect(&date, |window| {
        let mut warnings = Vec::new();

        if let Some(max) = enforced(thresholds.max_total_ingress) {
            if window.total_ingress_bytes > max {
                warnings.push(AbuseWarning {
                    kind: WarningKind::TotalIngress,
                    value: window.total_ingress_bytes,
                    threshold: max,
                    message: format!(
                        "Total ingress exceeded threshold ({} > {})",
                        window.total_ingress_bytes, max
                    ),
                });
            }
        }

        if let Some(max) = enforced(thresholds.max_total_egress) {
            if window.total_egress_bytes > max {
                warnings.push(AbuseWarning {
                    kind: WarningKind::TotalEgress,
                    value: window.total_egress_bytes,
                    threshold: max,
                    message: format!(
                        "Total egress exceeded threshold ({} > {})",
                        window.total_egress_bytes, max
                    ),
                });
            }
        }

        let mut offenders: Vec<_> = window
            .clients
            .iter()
            .filter_map(|(client_id, entry)| evaluate_client(client_id, entry, thresholds))
            .collect();
        offenders.sort_by(|a, b| a.client_id.cmp(&b.client_id));

        (window.client_count(), offenders, warnings)
    });

    // the bucket can disappear between `latest_key` and `inspect` if a prune
    // runs concurrently
    let Some((clients, offenders, warnings)) = analysed else {
        return AbuseDetectionReport::empty();
    };

    let has_abuse = !offenders.is_empty() || !warnings.is_empty();
    info!(
        date = %date,
        clients,
        offenders = offenders.len(),
        warnings = warnings.len(),
        "full sweep completed"
    );

    AbuseDetectionReport { date, offenders, warnings, has_abuse }
}
