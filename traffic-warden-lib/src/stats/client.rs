//! Per-client counters and the smoothed request-rate estimator.

use serde::Serialize;

/// Length of the rate-estimation window. A gap this long between two
/// samples starts a new window.
pub const RATE_WINDOW_MS: u64 = 60_000;

/// Samples a window must exceed before a rate is reported.
pub const RATE_MIN_SAMPLES: u64 = 5;

/// Traffic attributed to one client within one time bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientStats {
    /// Bytes received from this client
    pub ingress_bytes: u64,
    /// Bytes sent to this client
    pub egress_bytes: u64,
    /// Metered events (ingress and egress commits both count)
    pub request_count: u64,
    /// Timestamp (epoch ms) of the most recent metered event
    pub last_seen: u64,
    /// Last computed requests-per-second estimate
    pub requests_per_second: f64,
    /// Samples accumulated in the current rate window
    pub rps_sample_count: u64,
    /// Timestamp (epoch ms) at which the current rate window started
    pub rps_window_start: u64,
}

impl ClientStats {
    pub fn new(now_ms: u64) -> Self {
        Self {
            ingress_bytes: 0,
            egress_bytes: 0,
            request_count: 0,
            last_seen: now_ms,
            requests_per_second: 0.0,
            rps_sample_count: 0,
            rps_window_start: now_ms,
        }
    }

    /// Ingress plus egress, the volume used to rank clients for eviction.
    pub fn total_bytes(&self) -> u64 {
        self.ingress_bytes.saturating_add(self.egress_bytes)
    }

    /// Feed one event into the rate estimator.
    ///
    /// Within a window younger than [`RATE_WINDOW_MS`] the sample count grows
    /// and, once it passes [`RATE_MIN_SAMPLES`], the rate becomes
    /// `samples * 1000 / elapsed_ms`. An expired window (or the very first
    /// sample) restarts counting from this event with a rate of zero.
    pub fn record_rate_sample(&mut self, now_ms: u64) {
        let elapsed = now_ms.saturating_sub(self.rps_window_start).max(1);

        if elapsed < RATE_WINDOW_MS && self.rps_sample_count > 0 {
            self.rps_sample_count = self.rps_sample_count.saturating_add(1);
            if self.rps_sample_count > RATE_MIN_SAMPLES {
                self.requests_per_second =
                    self.rps_sample_count as f64 * 1000.0 / elapsed as f64;
            }
        } else {
            self.requests_per_second = 0.0;
            self.rps_sample_count = 1;
            self.rps_window_start = now_ms;
        }
    }

    /// Keep the highest rate observed in a longer bucket (the month) from a
    /// shorter one (the day). Estimates built on too few samples are ignored.
    pub fn absorb_peak_rate(&mut self, requests_per_second: f64, sample_count: u64) {
        if sample_count > RATE_MIN_SAMPLES && requests_per_second > self.requests_per_second {
            self.requests_per_second = requests_per_second;
            self.rps_sample_count = sample_count;
        }
    }
}
