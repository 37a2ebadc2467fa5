use serde::Deserialize;

use crate::detector::AbuseThresholds;
use crate::monitor::MonitorSchedule;
use crate::prune::PruneConfig;

/// What the proxy does with a request whose client was flagged
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AbuseAction {
    /// Answer 429 instead of forwarding
    #[default]
    Reject,
    /// Only log the finding, forward anyway
    Log,
}

/// Traffic monitoring configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MonitoringConfig {
    /// Attribute traffic to the first `X-Forwarded-For` entry when present
    /// Disable when clients can reach the proxy directly
    /// Default: true
    #[serde(default = "default_true")]
    pub trust_forwarded_for: bool,
    /// Action taken on abusive clients
    /// Default: "reject"
    #[serde(default)]
    pub action: AbuseAction,
    /// Minimum time between two full sweeps, in milliseconds
    /// Default: 60000 (1 minute)
    #[serde(default = "default_full_sweep_interval_ms")]
    pub full_sweep_interval_ms: u64,
    /// Minimum time between two prune passes, in milliseconds
    /// Default: 3600000 (1 hour)
    #[serde(default = "default_prune_interval_ms")]
    pub prune_interval_ms: u64,
    /// Also run sweeps and prunes from a background task, so they happen
    /// even when no requests arrive
    /// Default: false
    #[serde(default)]
    pub background_maintenance: bool,
    /// Abuse thresholds (all optional)
    #[serde(default)]
    pub thresholds: AbuseThresholds,
    /// Retention bounds
    #[serde(default)]
    pub retention: PruneConfig,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            trust_forwarded_for: default_true(),
            action: AbuseAction::default(),
            full_sweep_interval_ms: default_full_sweep_interval_ms(),
            prune_interval_ms: default_prune_interval_ms(),
            background_maintenance: false,
            thresholds: AbuseThresholds::default(),
            retention: PruneConfig::default(),
        }
    }
}

impl MonitoringConfig {
    pub fn schedule(&self) -> MonitorSchedule {
        MonitorSchedule {
            full_sweep_interval_ms: self.full_sweep_interval_ms,
            prune_interval_ms: self.prune_interval_ms,
            prune: self.retention.clone(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_full_sweep_interval_ms() -> u64 {
    60_000
}

fn default_prune_interval_ms() -> u64 {
    3_600_000
}
