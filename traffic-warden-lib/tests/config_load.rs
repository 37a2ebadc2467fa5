mod helpers;

use std::io::Write;
use tempfile::NamedTempFile;

use helpers::TestResult;
use traffic_warden_lib::config::{load_from_path, AbuseAction};

fn write_config(toml: &str) -> Result<NamedTempFile, std::io::Error> {
    let mut file = NamedTempFile::new()?;
    file.write_all(toml.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[test]
fn loads_minimal_config_with_defaults() -> TestResult {
    let file = write_config(
        r#"
listen = "127.0.0.1:0"
upstream = "localhost:9000"
"#,
    )?;

    let cfg = load_from_path(file.path())?;
    assert_eq!(cfg.listen.to_string(), "127.0.0.1:0");
    assert_eq!(cfg.upstream, "localhost:9000");
    assert_eq!(cfg.logging.level, "info");
    assert!(cfg.telemetry.metrics_port.is_none());
    assert_eq!(cfg.timeout.shutdown_secs, 30);

    let monitoring = &cfg.monitoring;
    assert!(monitoring.trust_forwarded_for);
    assert_eq!(monitoring.action, AbuseAction::Reject);
    assert_eq!(monitoring.full_sweep_interval_ms, 60_000);
    assert_eq!(monitoring.prune_interval_ms, 3_600_000);
    assert!(!monitoring.background_maintenance);
    assert!(monitoring.thresholds.max_ingress_per_client.is_none());
    assert_eq!(monitoring.retention.days_to_keep, 7);
    assert_eq!(monitoring.retention.clients_to_keep, Some(1000));
    Ok(())
}

#[test]
fn loads_full_monitoring_section() -> TestResult {
    let file = write_config(
        r#"
listen = "0.0.0.0:8080"
upstream = "app:3000"

[logging]
level = "debug"
show_target = true

[telemetry]
metrics_port = 9090

[timeout]
connect_ms = 1500
shutdown_secs = 5

[monitoring]
trust_forwarded_for = false
action = "log"
full_sweep_interval_ms = 10000
prune_interval_ms = 120000
background_maintenance = true

[monitoring.thresholds]
max_total_ingress = 100000000
max_ingress_per_client = 5000000
max_requests_per_second_per_client = 10.5

[monitoring.retention]
days_to_keep = 2
months_to_keep = 1
clients_to_keep = 50
"#,
    )?;

    let cfg = load_from_path(file.path())?;
    assert_eq!(cfg.logging.level, "debug");
    assert_eq!(cfg.telemetry.metrics_port, Some(9090));
    assert_eq!(cfg.timeout.connect_ms, 1500);
    assert_eq!(cfg.timeout.pool_idle_secs, 90);

    let monitoring = &cfg.monitoring;
    assert!(!monitoring.trust_forwarded_for);
    assert_eq!(monitoring.action, AbuseAction::Log);
    assert!(monitoring.background_maintenance);
    assert_eq!(monitoring.thresholds.max_total_ingress, Some(100_000_000));
    assert_eq!(monitoring.thresholds.max_ingress_per_client, Some(5_000_000));
    assert_eq!(monitoring.thresholds.max_requests_per_second_per_client, Some(10.5));
    assert!(monitoring.thresholds.max_egress_per_client.is_none());

    let schedule = monitoring.schedule();
    assert_eq!(schedule.full_sweep_interval_ms, 10_000);
    assert_eq!(schedule.prune_interval_ms, 120_000);
    assert_eq!(schedule.prune.days_to_keep, 2);
    assert_eq!(schedule.prune.months_to_keep, 1);
    assert_eq!(schedule.prune.clients_to_keep, Some(50));
    Ok(())
}

#[test]
fn rejects_invalid_upstream() -> TestResult {
    let file = write_config(
        r#"
listen = "127.0.0.1:0"
upstream = "not a host"
"#,
    )?;
    let err = load_from_path(file.path()).err().ok_or("expected an error")?;
    assert!(err.to_string().contains("Invalid upstream address"));
    Ok(())
}

#[test]
fn rejects_zero_sweep_interval() -> TestResult {
    let file = write_config(
        r#"
listen = "127.0.0.1:0"
upstream = "localhost:9000"

[monitoring]
full_sweep_interval_ms = 0
"#,
    )?;
    let err = load_from_path(file.path()).err().ok_or("expected an error")?;
    assert!(err.to_string().contains("full_sweep_interval_ms"));
    Ok(())
}

#[test]
fn rejects_negative_rate_threshold() -> TestResult {
    let file = write_config(
        r#"
listen = "127.0.0.1:0"
upstream = "localhost:9000"

[monitoring.thresholds]
max_requests_per_second_per_client = -1.0
"#,
    )?;
    assert!(load_from_path(file.path()).is_err());
    Ok(())
}

#[test]
fn rejects_unknown_action() -> TestResult {
    let file = write_config(
        r#"
listen = "127.0.0.1:0"
upstream = "localhost:9000"

[monitoring]
action = "ban"
"#,
    )?;
    let err = load_from_path(file.path()).err().ok_or("expected an error")?;
    assert!(err.to_string().contains("Failed to parse config"));
    Ok(())
}

#[test]
fn missing_file_is_a_config_error() -> TestResult {
    let err = load_from_path("/nonexistent/warden.toml")
        .err()
        .ok_or("expected an error")?;
    assert!(err.to_string().contains("Failed to read config file"));
    Ok(())
}

#[test]
fn retention_section_without_client_cap_disables_eviction() -> TestResult {
    let file = write_config(
        r#"
listen = "127.0.0.1:0"
upstream = "localhost:9000"

[monitoring.retention]
days_to_keep = 30
"#,
    )?;

    let cfg = load_from_path(file.path())?;
    let retention = &cfg.monitoring.retention;
    assert_eq!(retention.days_to_keep, 30);
    assert_eq!(retention.months_to_keep, 3);
    assert!(retention.clients_to_keep.is_none());
    Ok(())
}

#[test]
fn rejects_zero_client_cap() -> TestResult {
    let file = write_config(
        r#"
listen = "127.0.0.1:0"
upstream = "localhost:9000"

[monitoring.retention]
clients_to_keep = 0
"#,
    )?;
    let err = load_from_path(file.path()).err().ok_or("expected an error")?;
    assert!(err.to_string().contains("clients_to_keep"));
    Ok(())
}
