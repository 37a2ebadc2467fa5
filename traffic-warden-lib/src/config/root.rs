use serde::Deserialize;
use std::net::SocketAddr;

use super::monitoring::MonitoringConfig;
use super::telemetry::{LoggingConfig, TelemetryConfig};
use super::timeout::TimeoutConfig;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address and port to listen on
    /// Example: "0.0.0.0:8080" or "127.0.0.1:8080"
    pub listen: SocketAddr,
    /// Upstream server every admitted request is forwarded to (host:port)
    /// Example: "127.0.0.1:9000" or "app:3000"
    pub upstream: String,
    /// Connect, pool and shutdown timeouts
    #[serde(default)]
    pub timeout: TimeoutConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Telemetry configuration
    /// Controls the metrics / health / stats server
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Traffic monitoring and abuse detection
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}
