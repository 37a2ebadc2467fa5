//! Eviction of old buckets and of low-volume clients.
//!
//! Two independent passes over both the day and the month maps:
//!
//! 1. **Time-based**: a day bucket older than `days_to_keep` days (measured
//!    from its UTC midnight) is dropped with all its clients. A month bucket
//!    more than `months_to_keep` calendar months back is dropped likewise.
//! 2. **Size-based**: in every bucket that survived, if there are more than
//!    `clients_to_keep` clients, only the heaviest ones by ingress + egress
//!    are kept. Ties go to the lower client identifier.
//!
//! Bucket totals are left untouched by eviction.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clock::{months_since, parse_day_key, DAY_MS};
use crate::stats::{BucketMap, TimeWindowStats, TrafficStats};

/// Retention bounds.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PruneConfig {
    /// Day buckets older than this many days are removed
    /// Default: 7
    #[serde(default = "default_days_to_keep")]
    pub days_to_keep: u64,
    /// Month buckets more than this many calendar months back are removed
    /// Default: 3
    #[serde(default = "default_months_to_keep")]
    pub months_to_keep: u64,
    /// Per-bucket cap on client entries, heaviest kept. `None` disables
    /// size-based eviction.
    /// Default: 1000 when no retention section is given, unset when a
    /// section omits it
    #[serde(default)]
    pub clients_to_keep: Option<usize>,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            days_to_keep: default_days_to_keep(),
            months_to_keep: default_months_to_keep(),
            clients_to_keep: default_clients_to_keep(),
        }
    }
}

fn default_days_to_keep() -> u64 {
    7
}

fn default_months_to_keep() -> u64 {
    3
}

fn default_clients_to_keep() -> Option<usize> {
    Some(1000)
}

/// What a prune pass removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PruneSummary {
    pub days_removed: usize,
    pub months_removed: usize,
    pub clients_evicted: usize,
}

/// Run both passes over both granularities.
pub fn prune(stats: &TrafficStats, config: &PruneConfig, now_ms: u64) -> PruneSummary {
    let max_day_age_ms = config.days_to_keep.saturating_mul(DAY_MS);
    let mut summary = PruneSummary::default();

    let (removed, evicted) = prune_buckets(
        stats.daily(),
        |key| {
            let midnight = parse_day_key(key)?;
            Some(now_ms.saturating_sub(midnight) > max_day_age_ms)
        },
        config.clients_to_keep,
    );
    summary.days_removed = removed;
    summary.clients_evicted += evicted;

    let months_to_keep = i64::try_from(config.months_to_keep).unwrap_or(i64::MAX);
    let (removed, evicted) = prune_buckets(
        stats.monthly(),
        |key| Some(months_since(now_ms, key)? > months_to_keep),
        config.clients_to_keep,
    );
    summary.months_removed = removed;
    summary.clients_evicted += evicted;

    info!(
        days_removed = summary.days_removed,
        months_removed = summary.months_removed,
        clients_evicted = summary.clients_evicted,
        "traffic stats pruned"
    );
    summary
}

/// `expired` returns `None` for keys it cannot interpret; those buckets are
/// kept and still subject to the size cap.
fn prune_buckets(
    buckets: &BucketMap,
    expired: impl Fn(&str) -> Option<bool>,
    clients_to_keep: Option<usize>,
) -> (usize, usize) {
    let mut removed = 0;
    let mut evicted = 0;

    for key in buckets.keys() {
        let is_expired = match expired(&key) {
            Some(is_expired) => is_expired,
            None => {
                warn!(bucket = %key, "unrecognised bucket key, keeping it");
                false
            }
        };

        if is_expired {
            if buckets.remove(&key) {
                removed += 1;
            }
        } else if let Some(keep) = clients_to_keep {
            evicted += buckets
                .modify(&key, |window| evict_excess_clients(window, keep))
                .unwrap_or(0);
        }
    }

    (removed, evicted)
}

/// Keep the `keep` clients with the most traffic; return how many were removed.
pub fn evict_excess_clients(window: &mut TimeWindowStats, keep: usize) -> usize {
    if window.clients.len() <= keep {
        return 0;
    }

    let mut ranked: Vec<(u64, String)> = window
        .clients
        .iter()
        .map(|(id, stats)| (stats.total_bytes(), id.clone()))
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    let doomed = ranked.split_off(keep);
    for (_, id) in &doomed {
        window.clients.remove(id);
    }
    doomed.len()
}
