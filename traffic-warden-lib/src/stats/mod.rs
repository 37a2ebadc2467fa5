//! In-memory, time-bucketed traffic statistics.
//!
//! [`TrafficStats`] holds two [`BucketMap`]s: one keyed by UTC day
//! (`2025-09-04`) and one keyed by UTC month (`2025-09`). Each bucket is a
//! [`TimeWindowStats`] with running totals and one [`ClientStats`] per client.
//!
//! Buckets and client entries are created lazily on first traffic and are
//! only ever removed by the pruner. Counters are updated in place, so the
//! rate-estimation window of a client survives across commits.

mod client;
mod store;

pub use client::{ClientStats, RATE_MIN_SAMPLES, RATE_WINDOW_MS};
pub use store::{
    BucketMap, SharedWindow, TimeWindowStats, TrafficSnapshot, TrafficStats, WindowSnapshot,
};
