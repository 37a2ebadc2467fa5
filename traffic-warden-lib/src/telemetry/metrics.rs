use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Meter};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use std::sync::Arc;

use crate::prune::PruneSummary;

pub mod labels {
    pub const VERDICT: &str = "verdict";
    pub const WINDOW: &str = "window";
    pub const REASON: &str = "reason";
    pub const VERSION: &str = "version";
}

pub mod values {
    pub const VERDICT_NO_ABUSE: &str = "no_abuse";
    pub const VERDICT_IMMEDIATE: &str = "immediate_abuse";
    pub const VERDICT_PERIODIC: &str = "periodic_abuse";
    pub const WINDOW_DAY: &str = "day";
    pub const WINDOW_MONTH: &str = "month";
}

#[derive(Clone)]
pub struct Metrics {
    // Throughput metrics
    pub ingress_bytes_total: Counter<u64>,
    pub egress_bytes_total: Counter<u64>,

    pub requests_total: Counter<u64>,
    pub verdicts_total: Counter<u64>,
    pub requests_rejected_total: Counter<u64>,

    // Maintenance
    pub full_sweeps_total: Counter<u64>,
    pub prunes_total: Counter<u64>,
    pub pruned_buckets_total: Counter<u64>,
    pub evicted_clients_total: Counter<u64>,

    // Build info
    pub build_info: Gauge<u64>,
}

impl Metrics {
    pub fn new(meter: Meter) -> Self {
        Self {
            ingress_bytes_total: meter
                .u64_counter("warden_ingress_bytes_total")
                .with_description("Total bytes received from clients")
                .build(),
            egress_bytes_total: meter
                .u64_counter("warden_egress_bytes_total")
                .with_description("Total bytes sent to clients")
                .build(),

            requests_total: meter
                .u64_counter("warden_requests_total")
                .with_description("Total number of requests evaluated by the monitor")
                .build(),
            verdicts_total: meter
                .u64_counter("warden_verdicts_total")
                .with_description("Monitoring verdicts by kind (no_abuse, immediate_abuse, periodic_abuse)")
                .build(),
            requests_rejected_total: meter
                .u64_counter("warden_requests_rejected_total")
                .with_description("Total number of requests rejected because of abuse (429)")
                .build(),

            full_sweeps_total: meter
                .u64_counter("warden_full_sweeps_total")
                .with_description("Total number of full abuse sweeps executed")
                .build(),
            prunes_total: meter
                .u64_counter("warden_prunes_total")
                .with_description("Total number of prune passes executed")
                .build(),
            pruned_buckets_total: meter
                .u64_counter("warden_pruned_buckets_total")
                .with_description("Total number of expired buckets removed, by window (day, month)")
                .build(),
            evicted_clients_total: meter
                .u64_counter("warden_evicted_clients_total")
                .with_description("Total number of client entries evicted by the size cap")
                .build(),

            build_info: meter
                .u64_gauge("warden_build_info")
                .with_description("Build information (version)")
                .build(),
        }
    }

    /// Set build info metric with version labels
    pub fn set_build_info(&self) {
        let version = env!("CARGO_PKG_VERSION");
        self.build_info
            .record(1, &[KeyValue::new(labels::VERSION, version)]);
    }

    pub fn record_ingress(&self, bytes: u64) {
        if bytes > 0 {
            self.ingress_bytes_total.add(bytes, &[]);
        }
    }

    pub fn record_egress(&self, bytes: u64) {
        if bytes > 0 {
            self.egress_bytes_total.add(bytes, &[]);
        }
    }

    pub fn record_verdict(&self, verdict: &str) {
        self.requests_total.add(1, &[]);
        self.verdicts_total
            .add(1, &[KeyValue::new(labels::VERDICT, verdict.to_string())]);
    }

    pub fn record_rejection(&self, reason: &str) {
        self.requests_rejected_total
            .add(1, &[KeyValue::new(labels::REASON, reason.to_string())]);
    }

    pub fn record_full_sweep(&self) {
        self.full_sweeps_total.add(1, &[]);
    }

    pub fn record_prune(&self, summary: &PruneSummary) {
        self.prunes_total.add(1, &[]);
        if summary.days_removed > 0 {
            self.pruned_buckets_total.add(
                summary.days_removed as u64,
                &[KeyValue::new(labels::WINDOW, values::WINDOW_DAY)],
            );
        }
        if summary.months_removed > 0 {
            self.pruned_buckets_total.add(
                summary.months_removed as u64,
                &[KeyValue::new(labels::WINDOW, values::WINDOW_MONTH)],
            );
        }
        if summary.clients_evicted > 0 {
            self.evicted_clients_total
                .add(summary.clients_evicted as u64, &[]);
        }
    }
}

pub fn init_metrics() -> Result<(Arc<Metrics>, Registry), Box<dyn std::error::Error + Send + Sync>>
{
    let registry = Registry::default();

    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()?;

    let meter_provider = SdkMeterProvider::builder().with_reader(exporter).build();

    global::set_meter_provider(meter_provider);

    let meter = global::meter("traffic-warden");
    let metrics = Arc::new(Metrics::new(meter));

    metrics.set_build_info();

    Ok((metrics, registry))
}
