mod helpers;

use http_body_util::BodyExt;

use helpers::{TestResult, SEP_4, SEP_4_NOON};
use traffic_warden_lib::meter::record_ingress;
use traffic_warden_lib::prune::PruneSummary;
use traffic_warden_lib::stats::TrafficStats;
use traffic_warden_lib::telemetry::{
    handle_metrics, health_check_response, init_metrics, stats_response,
};

#[tokio::test]
async fn health_reports_healthy() -> TestResult {
    let resp = health_check_response()?;
    assert_eq!(resp.status(), 200);
    let body = resp.into_body().collect().await?.to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(json["status"], "healthy");
    Ok(())
}

#[tokio::test]
async fn stats_endpoint_serializes_snapshot() -> TestResult {
    let stats = TrafficStats::new();
    record_ingress(&stats, "1.2.3.4", 42, SEP_4_NOON);

    let resp = stats_response(&stats)?;
    assert_eq!(
        resp.headers().get("content-type").ok_or("missing content type")?,
        "application/json"
    );
    let body = resp.into_body().collect().await?.to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(json["daily"][SEP_4]["total_ingress_bytes"], 42);
    assert_eq!(json["daily"][SEP_4]["clients"]["1.2.3.4"]["request_count"], 1);
    assert_eq!(json["monthly"]["2025-09"]["total_ingress_bytes"], 42);
    Ok(())
}

#[tokio::test]
async fn metrics_endpoint_exposes_counters() -> TestResult {
    let (metrics, registry) = init_metrics()?;
    metrics.record_ingress(128);
    metrics.record_egress(256);
    metrics.record_verdict("no_abuse");
    metrics.record_full_sweep();
    metrics.record_prune(&PruneSummary { days_removed: 2, months_removed: 0, clients_evicted: 5 });

    let resp = handle_metrics(&registry)?;
    assert_eq!(resp.status(), 200);
    let content_type = resp
        .headers()
        .get(http::header::CONTENT_TYPE)
        .ok_or("missing content type")?
        .to_str()?;
    assert!(content_type.starts_with("text/plain"));
    let body = resp.into_body().collect().await?.to_bytes();
    let text = String::from_utf8(body.to_vec())?;

    assert!(text.contains("warden_ingress_bytes"));
    assert!(text.contains("warden_verdicts"));
    assert!(text.contains("warden_pruned_buckets"));
    assert!(text.contains("warden_build_info"));
    Ok(())
}
