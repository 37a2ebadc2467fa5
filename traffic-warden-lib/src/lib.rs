#![forbid(unsafe_code)]

pub mod clock;
pub mod config;
pub mod detector;
pub mod error;
pub mod meter;
pub mod monitor;
pub mod proxy;
pub mod prune;
pub mod stats;
pub mod telemetry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_from_path, AbuseAction, Config, MonitoringConfig};
pub use detector::{
    full_sweep, quick_check, AbuseDetectionReport, AbuseReport, AbuseThresholds, AbuseWarning,
};
pub use error::{Result, WardenError};
pub use meter::{EgressMeter, IngressMeter, MeterContext, MeteredBody};
pub use monitor::{MonitorSchedule, MonitoredRequest, TrafficMonitor, Verdict};
pub use proxy::run;
pub use prune::{prune, PruneConfig, PruneSummary};
pub use stats::{ClientStats, TimeWindowStats, TrafficStats};
