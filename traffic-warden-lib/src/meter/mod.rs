//! Byte metering for request and response bodies.
//!
//! Both meters are [`MeteredBody`] decorators around an `http_body::Body`:
//! they forward every frame untouched, tally the length of data frames and
//! commit the total into [`TrafficStats`] exactly once, when the stream ends,
//! fails, or is dropped before finishing.
//!
//! - [`IngressMeter`] wraps the request body. Its commit also drives the rate
//!   estimator.
//! - [`EgressMeter`] is handed out at attach time and wraps the response body
//!   once the response exists. Bucket keys are computed at commit time, so a
//!   long response that crosses midnight lands in the new day.

mod body;
mod egress;
mod ingress;

pub use body::{Direction, MeteredBody};
pub use egress::{record_egress, EgressMeter};
pub use ingress::{record_ingress, IngressMeter};

use http::HeaderMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::clock::Clock;
use crate::stats::TrafficStats;
use crate::telemetry::Metrics;

/// Client identifier used when neither a forwarded-for header nor a peer
/// address is available.
pub const UNKNOWN_CLIENT: &str = "unknown";

pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Everything a meter needs to commit: the shared stats, a clock and an
/// optional metrics sink.
#[derive(Clone)]
pub struct MeterContext {
    pub stats: Arc<TrafficStats>,
    pub clock: Arc<dyn Clock>,
    pub metrics: Option<Arc<Metrics>>,
}

impl MeterContext {
    pub fn new(stats: Arc<TrafficStats>, clock: Arc<dyn Clock>) -> Self {
        Self { stats, clock, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: Option<Arc<Metrics>>) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Resolve the identifier traffic is attributed to.
///
/// Prefers the first entry of `X-Forwarded-For` (when trusted), then the
/// transport peer IP, then [`UNKNOWN_CLIENT`].
pub fn resolve_client_id(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get(FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(first_ip) = forwarded {
            return first_ip.to_string();
        }
    }

    match peer {
        Some(addr) => addr.ip().to_string(),
        None => UNKNOWN_CLIENT.to_string(),
    }
}
