use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{Result, WardenError};
use crate::monitor::{spawn_maintenance, TrafficMonitor};
use crate::proxy::connection::ConnectionGuard;
use crate::proxy::handler::handle_proxy_request;
use crate::proxy::ProxyContext;
use crate::stats::TrafficStats;
use crate::telemetry::{init_metrics, start_observability_server};

/// Run the monitoring reverse proxy until SIGTERM or SIGINT.
pub async fn run(config: Arc<Config>) -> Result<()> {
    let shutdown = CancellationToken::new();
    let stats = TrafficStats::shared();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let metrics = match config.telemetry.metrics_port {
        Some(port) => {
            let (metrics, registry) = init_metrics()
                .map_err(|e| WardenError::Config(format!("Failed to initialize metrics: {e}")))?;
            let stats = Arc::clone(&stats);
            let token = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = start_observability_server(port, registry, stats, token).await {
                    warn!(error = %e, "Observability server failed");
                }
            });
            Some(metrics)
        }
        None => None,
    };

    let monitoring = &config.monitoring;
    let monitor = Arc::new(
        TrafficMonitor::new(stats, monitoring.thresholds.clone(), monitoring.schedule(), clock)
            .with_metrics(metrics.clone())
            .with_trust_forwarded_for(monitoring.trust_forwarded_for),
    );
    let maintenance = monitoring
        .background_maintenance
        .then(|| spawn_maintenance(Arc::clone(&monitor), shutdown.clone()));

    let ctx = Arc::new(ProxyContext::new(&config, monitor, metrics));
    let listener = TcpListener::bind(config.listen).await?;

    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate()).map_err(|e| {
        WardenError::Io(std::io::Error::other(format!("Failed to setup SIGTERM handler: {e}")))
    })?;
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt()).map_err(|e| {
        WardenError::Io(std::io::Error::other(format!("Failed to setup SIGINT handler: {e}")))
    })?;
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
            _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
        }
        signal_token.cancel();
    });

    serve(listener, ctx, shutdown.clone()).await;

    shutdown.cancel();
    if let Some(handle) = maintenance {
        if let Err(e) = handle.await {
            warn!(error = %e, "Background maintenance task failed");
        }
    }

    info!("Proxy server stopped");
    Ok(())
}

/// Accept connections on `listener` and proxy them until `shutdown` is
/// cancelled, then wait for in-flight connections to finish.
pub async fn serve(listener: TcpListener, ctx: Arc<ProxyContext>, shutdown: CancellationToken) {
    let builder = ConnBuilder::new(TokioExecutor::new());
    let active_connections = Arc::new(AtomicUsize::new(0));
    let (closed_tx, closed_rx) = watch::channel(());

    info!(
        addr = ?listener.local_addr().ok(),
        upstream = %ctx.upstream,
        "starting traffic-warden proxy (h1/h2)"
    );

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok((stream, peer)) => (stream, peer),
                    Err(e) => {
                        warn!(error = %e, "accept error");
                        continue;
                    }
                };

                let guard = ConnectionGuard::acquire(Arc::clone(&active_connections), closed_tx.clone());
                let builder = builder.clone();
                let ctx = Arc::clone(&ctx);

                tokio::spawn(async move {
                    let _guard = guard;
                    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                        let ctx = Arc::clone(&ctx);
                        async move {
                            Ok::<_, hyper::Error>(handle_proxy_request(req, peer, &ctx).await)
                        }
                    });

                    if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
                        warn!(?peer, error = %e, "serve_connection error");
                    }
                });
            }
        }
    }

    drain(&active_connections, closed_rx, ctx.shutdown_timeout).await;
}

async fn drain(active: &AtomicUsize, mut closed_rx: watch::Receiver<()>, timeout: Duration) {
    let remaining = active.load(Ordering::Relaxed);
    if remaining == 0 {
        return;
    }
    info!(active_connections = remaining, timeout_secs = timeout.as_secs(), "Waiting for active connections to finish");

    let drained = tokio::time::timeout(timeout, async {
        while active.load(Ordering::Relaxed) > 0 {
            if closed_rx.changed().await.is_err() {
                break;
            }
        }
    })
    .await;

    match drained {
        Ok(()) => info!("All connections closed"),
        Err(_) => warn!(
            active_connections = active.load(Ordering::Relaxed),
            "Shutdown timeout reached, connections still active"
        ),
    }
}
