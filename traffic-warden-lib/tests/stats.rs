mod helpers;

use std::sync::Arc;
use std::thread;

use helpers::{daily_client, monthly_client, TestResult, SEP, SEP_4, SEP_4_NOON};
use traffic_warden_lib::clock::DAY_MS;
use traffic_warden_lib::meter::{record_egress, record_ingress};
use traffic_warden_lib::stats::TrafficStats;

#[test]
fn ingress_sums_are_exact_per_client_and_bucket() -> TestResult {
    let stats = TrafficStats::new();
    let events: [(&str, u64); 6] =
        [("a", 100), ("b", 7), ("a", 250), ("c", 0), ("b", 13), ("a", 1)];

    for (i, (client, bytes)) in events.iter().enumerate() {
        record_ingress(&stats, client, *bytes, SEP_4_NOON + i as u64);
    }

    let a = daily_client(&stats, SEP_4, "a").ok_or("a missing")?;
    let b = daily_client(&stats, SEP_4, "b").ok_or("b missing")?;
    let c = daily_client(&stats, SEP_4, "c").ok_or("c missing")?;
    assert_eq!(a.ingress_bytes, 351);
    assert_eq!(b.ingress_bytes, 20);
    assert_eq!(c.ingress_bytes, 0);

    let total = stats
        .daily()
        .inspect(SEP_4, |w| w.total_ingress_bytes)
        .ok_or("day bucket missing")?;
    assert_eq!(total, 371);

    let month_total = stats
        .monthly()
        .inspect(SEP, |w| w.total_ingress_bytes)
        .ok_or("month bucket missing")?;
    assert_eq!(month_total, 371);
    Ok(())
}

#[test]
fn concurrent_commits_lose_nothing() -> TestResult {
    let stats = Arc::new(TrafficStats::new());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let stats = Arc::clone(&stats);
            thread::spawn(move || {
                let client = format!("10.0.0.{}", t % 2);
                for i in 0..500 {
                    record_ingress(&stats, &client, 3, SEP_4_NOON + i);
                    record_egress(&stats, &client, 5, SEP_4_NOON + i);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().map_err(|_| "worker panicked")?;
    }

    let (ingress, egress, per_client) = stats
        .daily()
        .inspect(SEP_4, |w| {
            let sum: u64 = w.clients.values().map(|c| c.ingress_bytes).sum();
            (w.total_ingress_bytes, w.total_egress_bytes, sum)
        })
        .ok_or("day bucket missing")?;
    assert_eq!(ingress, 8 * 500 * 3);
    assert_eq!(egress, 8 * 500 * 5);
    assert_eq!(per_client, ingress);

    let client = daily_client(&stats, SEP_4, "10.0.0.0").ok_or("client missing")?;
    assert_eq!(client.request_count, 4 * 500 * 2);
    Ok(())
}

#[test]
fn request_count_counts_both_commits() -> TestResult {
    let stats = TrafficStats::new();
    record_ingress(&stats, "1.2.3.4", 10, SEP_4_NOON);
    record_egress(&stats, "1.2.3.4", 20, SEP_4_NOON + 5);

    let day = daily_client(&stats, SEP_4, "1.2.3.4").ok_or("client missing")?;
    assert_eq!(day.request_count, 2);
    assert_eq!(day.last_seen, SEP_4_NOON + 5);

    let month = monthly_client(&stats, SEP, "1.2.3.4").ok_or("client missing")?;
    assert_eq!(month.request_count, 2);
    assert_eq!(month.egress_bytes, 20);
    assert_eq!(month.last_seen, SEP_4_NOON + 5);
    Ok(())
}

#[test]
fn snapshot_is_sorted_and_serializable() -> TestResult {
    let stats = TrafficStats::new();
    record_ingress(&stats, "b", 1, SEP_4_NOON);
    record_ingress(&stats, "a", 2, SEP_4_NOON);
    record_ingress(&stats, "a", 2, SEP_4_NOON + DAY_MS);

    let snapshot = stats.snapshot();
    let days: Vec<_> = snapshot.daily.keys().cloned().collect();
    assert_eq!(days, vec!["2025-09-04", "2025-09-05"]);
    let clients: Vec<_> = snapshot.daily[SEP_4].clients.keys().cloned().collect();
    assert_eq!(clients, vec!["a", "b"]);
    assert_eq!(snapshot.monthly[SEP].total_ingress_bytes, 5);

    let json = serde_json::to_value(&snapshot)?;
    assert_eq!(json["daily"][SEP_4]["clients"]["a"]["ingress_bytes"], 2);
    Ok(())
}
