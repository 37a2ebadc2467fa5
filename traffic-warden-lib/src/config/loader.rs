use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{Result, WardenError};

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| WardenError::Config(format!("Failed to read config file: {e}")))?;
    let cfg: Config = toml::from_str(&txt)
        .map_err(|e| WardenError::Config(format!("Failed to parse config: {e}")))?;

    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> Result<()> {
    if cfg.upstream.trim().is_empty() {
        return Err(WardenError::Config("upstream address cannot be empty".into()));
    }
    cfg.upstream.parse::<http::uri::Authority>().map_err(|e| {
        WardenError::Config(format!("Invalid upstream address '{}': {e}", cfg.upstream))
    })?;

    if cfg.timeout.connect_ms == 0 {
        return Err(WardenError::Config("timeout.connect_ms must be > 0".into()));
    }

    let monitoring = &cfg.monitoring;
    if monitoring.full_sweep_interval_ms == 0 {
        return Err(WardenError::Config("full_sweep_interval_ms must be > 0".into()));
    }
    if monitoring.prune_interval_ms == 0 {
        return Err(WardenError::Config("prune_interval_ms must be > 0".into()));
    }
    if monitoring.retention.clients_to_keep == Some(0) {
        return Err(WardenError::Config(
            "retention.clients_to_keep must be > 0; omit it to disable eviction".into(),
        ));
    }
    if let Some(rps) = monitoring.thresholds.max_requests_per_second_per_client {
        if !rps.is_finite() || rps < 0.0 {
            return Err(WardenError::Config(format!(
                "max_requests_per_second_per_client must be a non-negative number, got {rps}"
            )));
        }
    }

    Ok(())
}
