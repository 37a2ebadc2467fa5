use serde::Deserialize;

/// Timeouts of the proxy host
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Upstream connect timeout in milliseconds
    /// Default: 5000 (5 seconds)
    #[serde(default = "default_connect_timeout")]
    pub connect_ms: u64,
    /// How long idle pooled upstream connections are kept, in seconds
    /// Default: 90
    #[serde(default = "default_pool_idle_timeout")]
    pub pool_idle_secs: u64,
    /// Graceful shutdown timeout in seconds
    /// In-flight connections get this long to finish after a signal
    /// Default: 30
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_timeout(),
            pool_idle_secs: default_pool_idle_timeout(),
            shutdown_secs: default_shutdown_timeout(),
        }
    }
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_pool_idle_timeout() -> u64 {
    90
}

fn default_shutdown_timeout() -> u64 {
    30
}
