//! OS signal handling.
//!
//! - SIGINT / SIGTERM → graceful shutdown
//! - SIGHUP → forced settings reload (same path as a file change, minus debouncing)

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::ReloadCoordinator;

/// Resolve when the process is asked to stop.
pub async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Ctrl+C received"),
        _ = terminate => tracing::info!("SIGTERM received"),
    }
}

/// Reload settings on every SIGHUP until shutdown.
#[cfg(unix)]
pub fn spawn_hangup_reload(
    coordinator: Arc<ReloadCoordinator>,
    mut shutdown: broadcast::Receiver<()>,
) -> Option<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(sig) => sig,
        Err(e) => {
            tracing::warn!(error = %e, "SIGHUP reload unavailable");
            return None;
        }
    };

    Some(tokio::spawn(async move {
        loop {
            tokio::select! {
                received = hangup.recv() => {
                    if received.is_none() {
                        break;
                    }
                    tracing::info!("SIGHUP received, reloading settings");
                    let coordinator = coordinator.clone();
                    let outcome =
                        tokio::task::spawn_blocking(move || coordinator.force("settings")).await;
                    tracing::debug!(?outcome, "SIGHUP reload finished");
                }
                _ = shutdown.recv() => break,
            }
        }
    }))
}

#[cfg(not(unix))]
pub fn spawn_hangup_reload(
    _coordinator: Arc<ReloadCoordinator>,
    _shutdown: broadcast::Receiver<()>,
) -> Option<JoinHandle<()>> {
    None
}
