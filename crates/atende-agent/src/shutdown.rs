// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] that the dispatcher and the follow-up loop monitor.
//! Device workers are drained before the process exits.

use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is
/// received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {
                            info!("received SIGINT (Ctrl+C), initiating shutdown");
                        }
                        _ = sigterm.recv() => {
                            info!("received SIGTERM, initiating shutdown");
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl+C only");
                    let _ = ctrl_c.await;
                    info!("received Ctrl+C, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Waits up to `timeout` for device workers to empty their queues. Workers
/// still running afterwards are aborted.
pub async fn drain_workers(mut workers: JoinSet<()>, timeout: Duration) {
    if workers.is_empty() {
        info!("no device workers to drain");
        return;
    }
    info!(count = workers.len(), "waiting for device workers to drain");

    let drained = tokio::time::timeout(timeout, async {
        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "device worker ended abnormally");
            }
        }
    })
    .await;

    match drained {
        Ok(()) => info!("all device workers drained"),
        Err(_) => {
            warn!(
                remaining = workers.len(),
                "drain timeout reached, aborting remaining workers"
            );
            workers.shutdown().await;
        }
    }
}
