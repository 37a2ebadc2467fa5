use bytes::Buf;
use hyper::body::{Body, Frame, SizeHint};
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::debug;

use super::{record_egress, record_ingress, MeterContext};

/// Which way the metered bytes travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Received from the client
    Ingress,
    /// Sent to the client
    Egress,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ingress => "ingress",
            Direction::Egress => "egress",
        }
    }
}

/// Body decorator that counts data bytes and commits them once.
pub struct MeteredBody<B> {
    inner: B,
    direction: Direction,
    client_id: String,
    ctx: MeterContext,
    bytes: u64,
    committed: bool,
}

impl<B> MeteredBody<B> {
    pub(crate) fn new(
        inner: B,
        direction: Direction,
        client_id: String,
        ctx: MeterContext,
    ) -> Self {
        Self { inner, direction, client_id, ctx, bytes: 0, committed: false }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Bytes tallied so far.
    pub fn bytes_seen(&self) -> u64 {
        self.bytes
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    fn commit(&mut self) {
        if self.committed {
            return;
        }
        self.committed = true;

        let now_ms = self.ctx.clock.now_ms();
        match self.direction {
            Direction::Ingress => {
                record_ingress(&self.ctx.stats, &self.client_id, self.bytes, now_ms);
                if let Some(m) = &self.ctx.metrics {
                    m.record_ingress(self.bytes);
                }
            }
            Direction::Egress => {
                record_egress(&self.ctx.stats, &self.client_id, self.bytes, now_ms);
                if let Some(m) = &self.ctx.metrics {
                    m.record_egress(self.bytes);
                }
            }
        }
    }
}

impl<B> Body for MeteredBody<B>
where
    B: Body + Unpin,
{
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    let len = u64::try_from(data.remaining()).unwrap_or(u64::MAX);
                    this.bytes = this.bytes.saturating_add(len);
                }
                if this.inner.is_end_stream() {
                    this.commit();
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(err))) => {
                this.commit();
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.commit();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl<B> Drop for MeteredBody<B> {
    fn drop(&mut self) {
        if !self.committed {
            debug!(
                direction = self.direction.as_str(),
                client = %self.client_id,
                bytes = self.bytes,
                "body dropped before end of stream"
            );
        }
        self.commit();
    }
}
