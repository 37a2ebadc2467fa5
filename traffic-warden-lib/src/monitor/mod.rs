//! Per-request orchestration of metering, detection and retention.
//!
//! [`TrafficMonitor::use_monitoring`] is the single call a host makes per
//! request. It attaches the meters, runs the constant-time check for the
//! requesting client, and piggy-backs the periodic full sweep and prune on
//! the request when their intervals have elapsed.

mod maintenance;
mod timers;

pub use maintenance::spawn_maintenance;
pub use timers::SweepTimers;

use std::net::SocketAddr;
use std::sync::Arc;

use http::Request;
use serde::Serialize;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::detector::{full_sweep, quick_check, AbuseDetectionReport, AbuseReport, AbuseThresholds};
use crate::meter::{resolve_client_id, EgressMeter, IngressMeter, MeterContext, MeteredBody};
use crate::prune::{prune, PruneConfig, PruneSummary};
use crate::stats::TrafficStats;
use crate::telemetry::metrics::values;
use crate::telemetry::Metrics;

/// How often the piggy-backed maintenance runs.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSchedule {
    pub full_sweep_interval_ms: u64,
    pub prune_interval_ms: u64,
    pub prune: PruneConfig,
}

impl Default for MonitorSchedule {
    fn default() -> Self {
        Self {
            full_sweep_interval_ms: 60_000,
            prune_interval_ms: 3_600_000,
            prune: PruneConfig::default(),
        }
    }
}

/// Outcome of monitoring one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", content = "report", rename_all = "snake_case")]
pub enum Verdict {
    NoAbuse,
    /// The requesting client is over a per-client threshold today.
    ImmediateAbuse(AbuseReport),
    /// A full sweep ran on this request and flagged something. The offenders
    /// need not include the requesting client.
    PeriodicAbuse(AbuseDetectionReport),
}

impl Verdict {
    pub fn is_abuse(&self) -> bool {
        !matches!(self, Verdict::NoAbuse)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::NoAbuse => values::VERDICT_NO_ABUSE,
            Verdict::ImmediateAbuse(_) => values::VERDICT_IMMEDIATE,
            Verdict::PeriodicAbuse(_) => values::VERDICT_PERIODIC,
        }
    }

    /// Whether this verdict singles out `client_id`.
    pub fn blames(&self, client_id: &str) -> bool {
        match self {
            Verdict::NoAbuse => false,
            Verdict::ImmediateAbuse(report) => report.client_id == client_id,
            Verdict::PeriodicAbuse(report) => report.is_offender(client_id),
        }
    }

    /// Human-readable diagnostics: the reasons of an immediate finding, or
    /// every warning and offender reason of a periodic one.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Verdict::NoAbuse => Vec::new(),
            Verdict::ImmediateAbuse(report) => report.reasons.clone(),
            Verdict::PeriodicAbuse(report) => report
                .warnings
                .iter()
                .map(|w| w.message.clone())
                .chain(report.offenders.iter().flat_map(|o| {
                    o.reasons.iter().map(move |r| format!("{}: {r}", o.client_id))
                }))
                .collect(),
        }
    }
}

/// A request with metering attached, plus what the monitor concluded.
pub struct MonitoredRequest<B> {
    /// The incoming request, body wrapped by the ingress meter
    pub request: Request<MeteredBody<B>>,
    pub client_id: String,
    /// Wrap the response body with this before sending it
    pub egress: EgressMeter,
    pub verdict: Verdict,
}

pub struct TrafficMonitor {
    stats: Arc<TrafficStats>,
    thresholds: AbuseThresholds,
    schedule: MonitorSchedule,
    timers: SweepTimers,
    clock: Arc<dyn Clock>,
    metrics: Option<Arc<Metrics>>,
    trust_forwarded_for: bool,
}

impl TrafficMonitor {
    /// Both maintenance timers start at the clock's current time, so the
    /// first sweep happens one full interval after construction.
    pub fn new(
        stats: Arc<TrafficStats>,
        thresholds: AbuseThresholds,
        schedule: MonitorSchedule,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let timers = SweepTimers::new(clock.now_ms());
        Self {
            stats,
            thresholds,
            schedule,
            timers,
            clock,
            metrics: None,
            trust_forwarded_for: true,
        }
    }

    pub fn with_metrics(mut self, metrics: Option<Arc<Metrics>>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    pub fn stats(&self) -> &Arc<TrafficStats> {
        &self.stats
    }

    pub fn thresholds(&self) -> &AbuseThresholds {
        &self.thresholds
    }

    pub fn schedule(&self) -> &MonitorSchedule {
        &self.schedule
    }

    pub fn timers(&self) -> &SweepTimers {
        &self.timers
    }

    /// Current time on the monitor's clock.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn meter_context(&self) -> MeterContext {
        MeterContext::new(Arc::clone(&self.stats), Arc::clone(&self.clock))
            .with_metrics(self.metrics.clone())
    }

    /// Attach meters to `request` and decide whether its client is abusive.
    ///
    /// The quick check sees counters as they were before this request's own
    /// body is read: its ingress is committed only when the body completes.
    pub fn use_monitoring<B>(
        &self,
        request: Request<B>,
        peer: Option<SocketAddr>,
    ) -> MonitoredRequest<B> {
        let client_id = resolve_client_id(request.headers(), peer, self.trust_forwarded_for);
        let ctx = self.meter_context();
        let request = IngressMeter::new(ctx.clone()).attach(request, client_id.clone());
        let egress = EgressMeter::new(client_id.clone(), ctx);

        let verdict = self.evaluate(&client_id);
        if let Some(metrics) = &self.metrics {
            metrics.record_verdict(verdict.as_str());
        }

        MonitoredRequest { request, client_id, egress, verdict }
    }

    /// Detection and piggy-backed maintenance for one request of `client_id`.
    pub fn evaluate(&self, client_id: &str) -> Verdict {
        let now = self.now_ms();

        if let Some(report) = quick_check(client_id, &self.stats, &self.thresholds, now) {
            warn!(
                client = %report.client_id,
                reasons = ?report.reasons,
                "Immediate abuse detected"
            );
            return Verdict::ImmediateAbuse(report);
        }

        let mut verdict = Verdict::NoAbuse;
        if let Some(report) = self.full_sweep_if_due(now) {
            if report.has_abuse {
                verdict = Verdict::PeriodicAbuse(report);
            }
        }
        self.prune_if_due(now);

        verdict
    }

    /// Run a full sweep if its interval elapsed and no one else claimed it.
    pub fn full_sweep_if_due(&self, now_ms: u64) -> Option<AbuseDetectionReport> {
        if !self
            .timers
            .try_claim_full_sweep(now_ms, self.schedule.full_sweep_interval_ms)
        {
            return None;
        }
        Some(self.run_full_sweep())
    }

    /// Run a prune if its interval elapsed and no one else claimed it.
    pub fn prune_if_due(&self, now_ms: u64) -> Option<PruneSummary> {
        if !self
            .timers
            .try_claim_prune(now_ms, self.schedule.prune_interval_ms)
        {
            return None;
        }
        Some(self.run_prune(now_ms))
    }

    /// Full sweep now, regardless of the timer.
    pub fn run_full_sweep(&self) -> AbuseDetectionReport {
        let report = full_sweep(&self.stats, &self.thresholds);
        if let Some(metrics) = &self.metrics {
            metrics.record_full_sweep();
        }
        for warning in &report.warnings {
            warn!(date = %report.date, kind = ?warning.kind, "{}", warning.message);
        }
        for offender in &report.offenders {
            warn!(
                date = %report.date,
                client = %offender.client_id,
                reasons = ?offender.reasons,
                "Periodic abuse detected"
            );
        }
        report
    }

    /// Prune now, regardless of the timer.
    pub fn run_prune(&self, now_ms: u64) -> PruneSummary {
        let summary = prune(&self.stats, &self.schedule.prune, now_ms);
        if let Some(metrics) = &self.metrics {
            metrics.record_prune(&summary);
        }
        summary
    }

    /// One maintenance tick without a request: whichever of sweep and prune
    /// is due runs, sharing timers with the request path.
    pub fn maintain(&self) -> (Option<AbuseDetectionReport>, Option<PruneSummary>) {
        let now = self.now_ms();
        let report = self.full_sweep_if_due(now);
        let summary = self.prune_if_due(now);
        debug!(swept = report.is_some(), pruned = summary.is_some(), "Maintenance tick");
        (report, summary)
    }
}
