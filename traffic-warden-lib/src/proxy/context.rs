use std::sync::Arc;
use std::time::Duration;

use crate::config::{AbuseAction, Config};
use crate::monitor::TrafficMonitor;
use crate::proxy::ClientPool;
use crate::telemetry::Metrics;

/// Everything a connection task needs to handle requests
pub struct ProxyContext {
    pub monitor: Arc<TrafficMonitor>,
    pub pool: ClientPool,
    /// Upstream authority (host:port)
    pub upstream: String,
    pub action: AbuseAction,
    pub metrics: Option<Arc<Metrics>>,
    pub shutdown_timeout: Duration,
}

impl ProxyContext {
    pub fn new(config: &Config, monitor: Arc<TrafficMonitor>, metrics: Option<Arc<Metrics>>) -> Self {
        Self {
            monitor,
            pool: ClientPool::new(&config.timeout),
            upstream: config.upstream.clone(),
            action: config.monitoring.action,
            metrics,
            shutdown_timeout: Duration::from_secs(config.timeout.shutdown_secs),
        }
    }
}
