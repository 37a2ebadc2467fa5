use http::Request;
use tracing::debug;

use super::{Direction, MeterContext, MeteredBody};
use crate::clock::{day_key, month_key};
use crate::stats::TrafficStats;

/// Attaches ingress metering to request bodies.
///
/// Must wrap the body before anything else reads it, otherwise the count
/// misses whatever was consumed first.
#[derive(Clone)]
pub struct IngressMeter {
    ctx: MeterContext,
}

impl IngressMeter {
    pub fn new(ctx: MeterContext) -> Self {
        Self { ctx }
    }

    /// Wrap a bare body.
    pub fn wrap<B>(&self, body: B, client_id: impl Into<String>) -> MeteredBody<B> {
        MeteredBody::new(body, Direction::Ingress, client_id.into(), self.ctx.clone())
    }

    /// Wrap the body of a request, keeping method, URI and headers intact.
    pub fn attach<B>(
        &self,
        request: Request<B>,
        client_id: impl Into<String>,
    ) -> Request<MeteredBody<B>> {
        let client_id = client_id.into();
        request.map(|body| self.wrap(body, client_id))
    }
}

/// Commit `bytes` received from `client_id` at `now_ms`.
///
/// Updates the day bucket (totals, client counters, rate estimator) under
/// its lock, then carries the bytes and the day's rate into the month bucket,
/// where only the monthly peak rate is kept.
pub fn record_ingress(stats: &TrafficStats, client_id: &str, bytes: u64, now_ms: u64) {
    let day = day_key(now_ms);
    let month = month_key(&day);

    let (rate, samples) = stats.daily().update(&day, |window| {
        window.total_ingress_bytes = window.total_ingress_bytes.saturating_add(bytes);

        let client = window.client_mut(client_id, now_ms);
        client.record_rate_sample(now_ms);
        client.ingress_bytes = client.ingress_bytes.saturating_add(bytes);
        client.request_count = client.request_count.saturating_add(1);
        client.last_seen = now_ms;
        (client.requests_per_second, client.rps_sample_count)
    });

    stats.monthly().update(&month, |window| {
        window.total_ingress_bytes = window.total_ingress_bytes.saturating_add(bytes);

        let client = window.client_mut(client_id, now_ms);
        client.ingress_bytes = client.ingress_bytes.saturating_add(bytes);
        client.request_count = client.request_count.saturating_add(1);
        client.last_seen = now_ms;
        client.absorb_peak_rate(rate, samples);
    });

    debug!(client = client_id, bytes, day = %day, rps = rate, "ingress committed");
}
