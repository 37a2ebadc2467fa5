//! Shared test helpers
#![allow(dead_code)]

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::{Body, Frame, SizeHint};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use traffic_warden_lib::clock::{Clock, ManualClock};
use traffic_warden_lib::meter::MeterContext;
use traffic_warden_lib::stats::{ClientStats, TrafficStats};

pub type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// 2025-09-04T12:00:00Z
pub const SEP_4_NOON: u64 = 1_756_987_200_000;
pub const SEP_4: &str = "2025-09-04";
pub const SEP: &str = "2025-09";

pub fn manual_context(start_ms: u64) -> (Arc<TrafficStats>, Arc<ManualClock>, MeterContext) {
    let stats = TrafficStats::shared();
    let clock = Arc::new(ManualClock::new(start_ms));
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    let ctx = MeterContext::new(Arc::clone(&stats), dyn_clock);
    (stats, clock, ctx)
}

pub fn daily_client(stats: &TrafficStats, day: &str, client_id: &str) -> Option<ClientStats> {
    stats
        .daily()
        .inspect(day, |w| w.client(client_id).cloned())
        .flatten()
}

pub fn monthly_client(stats: &TrafficStats, month: &str, client_id: &str) -> Option<ClientStats> {
    stats
        .monthly()
        .inspect(month, |w| w.client(client_id).cloned())
        .flatten()
}

/// Body yielding one data frame per chunk
pub struct Chunks {
    chunks: VecDeque<Bytes>,
}

impl Chunks {
    pub fn new(chunks: &[&'static [u8]]) -> Self {
        Self { chunks: chunks.iter().map(|c| Bytes::from_static(c)).collect() }
    }

    pub fn sized(count: usize, size: usize) -> Self {
        Self { chunks: (0..count).map(|_| Bytes::from(vec![b'x'; size])).collect() }
    }
}

impl Body for Chunks {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(self.chunks.pop_front().map(|c| Ok(Frame::data(c))))
    }

    fn is_end_stream(&self) -> bool {
        self.chunks.is_empty()
    }

    fn size_hint(&self) -> SizeHint {
        let total: usize = self.chunks.iter().map(Bytes::len).sum();
        SizeHint::with_exact(total as u64)
    }
}

/// Read a body to the end and return its bytes
pub async fn drain<B>(body: B) -> Result<Bytes, B::Error>
where
    B: Body,
{
    Ok(body.collect().await?.to_bytes())
}

/// Poll `check` until it holds, for up to one second
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
