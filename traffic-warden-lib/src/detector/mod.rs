//! Threshold-based abuse detection.
//!
//! Two entry points share the same per-client rules:
//!
//! - [`quick_check`]: one client, today's bucket only. Constant time, run on
//!   every request.
//! - [`full_sweep`]: every client of the most recent day bucket plus the
//!   bucket-wide totals. Linear in the number of clients, run periodically.
//!
//! A finding is data, not an error: both return plain values describing what
//! was exceeded.

mod quick;
mod sweep;

pub use quick::quick_check;
pub use sweep::full_sweep;

use serde::{Deserialize, Serialize};

use crate::stats::ClientStats;

/// Configured maxima. Unset or zero means the limit is not enforced.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct AbuseThresholds {
    /// Bytes received across all clients per day
    #[serde(default)]
    pub max_total_ingress: Option<u64>,
    /// Bytes sent across all clients per day
    #[serde(default)]
    pub max_total_egress: Option<u64>,
    /// Bytes received from one client per day
    #[serde(default)]
    pub max_ingress_per_client: Option<u64>,
    /// Bytes sent to one client per day
    #[serde(default)]
    pub max_egress_per_client: Option<u64>,
    /// Metered events of one client per day
    #[serde(default)]
    pub max_requests_per_client: Option<u64>,
    /// Smoothed request rate of one client
    #[serde(default)]
    pub max_requests_per_second_per_client: Option<f64>,
}

fn enforced(limit: Option<u64>) -> Option<u64> {
    limit.filter(|l| *l > 0)
}

fn enforced_rate(limit: Option<f64>) -> Option<f64> {
    limit.filter(|l| *l > 0.0)
}

/// A client that crossed one or more per-client thresholds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbuseReport {
    pub client_id: String,
    pub reasons: Vec<String>,
    /// Counters at the time of the check
    pub stats: ClientStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    TotalIngress,
    TotalEgress,
}

/// A bucket-wide total that crossed its threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbuseWarning {
    pub kind: WarningKind,
    pub value: u64,
    pub threshold: u64,
    pub message: String,
}

/// Outcome of a full sweep over one day bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbuseDetectionReport {
    /// Day key that was examined, empty when there was none
    pub date: String,
    pub offenders: Vec<AbuseReport>,
    pub warnings: Vec<AbuseWarning>,
    pub has_abuse: bool,
}

impl AbuseDetectionReport {
    pub fn empty() -> Self {
        Self { date: String::new(), offenders: Vec::new(), warnings: Vec::new(), has_abuse: false }
    }

    pub fn is_offender(&self, client_id: &str) -> bool {
        self.offenders.iter().any(|o| o.client_id == client_id)
    }
}

/// Reasons `stats` violates the per-client thresholds, in a fixed order:
/// ingress, egress, request count, request rate.
pub fn client_violations(stats: &ClientStats, thresholds: &AbuseThresholds) -> Vec<String> {
    let mut reasons = Vec::new();

    if let Some(max) = enforced(thresholds.max_ingress_per_client) {
        if stats.ingress_bytes > max {
            reasons.push(format!("Ingress exceeded ({} > {})", stats.ingress_bytes, max));
        }
    }

    if let Some(max) = enforced(thresholds.max_egress_per_client) {
        if stats.egress_bytes > max {
            reasons.push(format!("Egress exceeded ({} > {})", stats.egress_bytes, max));
        }
    }

    if let Some(max) = enforced(thresholds.max_requests_per_client) {
        if stats.request_count > max {
            reasons.push(format!("Request count exceeded ({} > {})", stats.request_count, max));
        }
    }

    if let Some(max) = enforced_rate(thresholds.max_requests_per_second_per_client) {
        if stats.requests_per_second > max {
            reasons.push(format!(
                "Requests per second exceeded ({:.2} > {})",
                stats.requests_per_second, max
            ));
        }
    }

    reasons
}

/// Build a report for `client_id` if any per-client threshold is exceeded.
pub(crate) fn evaluate_client(
    client_id: &str,
    stats: &ClientStats,
    thresholds: &AbuseThresholds,
) -> Option<AbuseReport> {
    let reasons = client_violations(stats, thresholds);
    if reasons.is_empty() {
        return None;
    }
    Some(AbuseReport { client_id: client_id.to_string(), reasons, stats: stats.clone() })
}
