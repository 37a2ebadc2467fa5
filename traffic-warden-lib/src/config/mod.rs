mod loader;
mod monitoring;
mod root;
mod telemetry;
mod timeout;

pub use loader::{load_from_path, validate_config};
pub use monitoring::{AbuseAction, MonitoringConfig};
pub use root::Config;
pub use telemetry::{LoggingConfig, TelemetryConfig};
pub use timeout::TimeoutConfig;
