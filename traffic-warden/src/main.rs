#![forbid(unsafe_code)]

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use traffic_warden_lib::config::load_from_path;
use traffic_warden_lib::telemetry::init_tracing;

#[derive(Parser, Debug)]
#[command(author, version, about = "Reverse proxy that meters client traffic and flags abuse")]
struct Cli {
    /// Path to configuration TOML file
    #[arg(short, long, value_name = "FILE", env = "TRAFFIC_WARDEN_CONFIG", default_value = "config/warden.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match load_from_path(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load configuration from {}: {err}", cli.config.display());
            std::process::exit(1);
        }
    };

    if let Err(err) = init_tracing(&cfg.logging.level, cfg.logging.show_target) {
        eprintln!("failed to initialize logging: {err}");
        std::process::exit(1);
    }

    info!(
        listen = %cfg.listen,
        upstream = %cfg.upstream,
        action = ?cfg.monitoring.action,
        "configuration loaded"
    );

    if let Err(err) = traffic_warden_lib::run(Arc::new(cfg)).await {
        error!(%err, "proxy exited with error");
        std::process::exit(1);
    }
}
