use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::debug::{self, DebugState};
use super::stop::shutdown_signal;
use crate::conf::ValidatorConfig;
use crate::metrics::LineMetrics;
use crate::service::Supervisor;
use crate::tail::TracingTailLogger;

/// Service mode: monitor every configured file until a termination signal.
pub async fn serve(config: ValidatorConfig, metrics: Arc<LineMetrics>) -> Result<()> {
    let supervisor = Supervisor::start(
        &config.files,
        &config.tail.to_tail_config(),
        Arc::clone(&metrics),
        Arc::new(TracingTailLogger),
    )
    .context("Failed to start monitoring")?;

    info!("✓ Monitoring {} file(s)", supervisor.len());

    let server_shutdown = CancellationToken::new();
    let server = match config.debug_socket_addr()? {
        Some(addr) => {
            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => listener,
                Err(e) => {
                    supervisor.shutdown().await;
                    return Err(e).with_context(|| format!("Failed to bind debug listener on {}", addr));
                }
            };
            info!("Debug server listening on: http://{}", addr);
            info!("  - Metrics: http://{}/metrics", addr);
            info!("  - Health check: http://{}/health", addr);

            let app = debug::router(DebugState {
                metrics: Arc::clone(&metrics),
                status: supervisor.status(),
            });
            let token = server_shutdown.clone();
            Some(tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(token.cancelled_owned())
                    .await
            }))
        }
        None => {
            info!("debugAddr not set, debug server disabled");
            None
        }
    };

    shutdown_signal().await;

    server_shutdown.cancel();
    supervisor.shutdown().await;

    if let Some(server) = server {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Debug server error: {}", e),
            Err(e) => warn!("Debug server task failed: {}", e),
        }
    }

    metrics.print_summary();
    info!("Shut down gracefully");
    Ok(())
}
