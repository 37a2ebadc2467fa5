use http::Response;
use tracing::debug;

use super::{Direction, MeterContext, MeteredBody};
use crate::clock::{day_key, month_key};
use crate::stats::TrafficStats;

/// Egress metering for one request, bound to its client.
///
/// Created when the request is admitted; the response does not exist yet, so
/// the handle is kept until the response is ready and then wraps its body.
#[derive(Clone)]
pub struct EgressMeter {
    client_id: String,
    ctx: MeterContext,
}

impl EgressMeter {
    pub fn new(client_id: impl Into<String>, ctx: MeterContext) -> Self {
        Self { client_id: client_id.into(), ctx }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn wrap<B>(self, body: B) -> MeteredBody<B> {
        MeteredBody::new(body, Direction::Egress, self.client_id, self.ctx)
    }

    /// Wrap the body of a response, keeping status and headers intact.
    pub fn wrap_response<B>(self, response: Response<B>) -> Response<MeteredBody<B>> {
        response.map(|body| self.wrap(body))
    }
}

/// Commit `bytes` sent to `client_id` at `now_ms`.
///
/// Egress never feeds the rate estimator; request rate is driven by ingress.
pub fn record_egress(stats: &TrafficStats, client_id: &str, bytes: u64, now_ms: u64) {
    let day = day_key(now_ms);
    let month = month_key(&day);

    for (buckets, key) in [(stats.daily(), &day), (stats.monthly(), &month)] {
        buckets.update(key, |window| {
            window.total_egress_bytes = window.total_egress_bytes.saturating_add(bytes);

            let client = window.client_mut(client_id, now_ms);
            client.egress_bytes = client.egress_bytes.saturating_add(bytes);
            client.request_count = client.request_count.saturating_add(1);
            client.last_seen = now_ms;
        });
    }

    debug!(client = client_id, bytes, day = %day, "egress committed");
}
