//! OS signal handling.

use crate::lifecycle::Shutdown;

/// Translate SIGINT/SIGTERM into a shutdown trigger.
pub fn spawn_signal_listener(shutdown: Shutdown) {
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(err) => {
            tracing::error!(error = %err, "failed to install SIGTERM handler");
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to wait for SIGINT");
            }
            return;
        }
    };
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                tracing::error!(error = %err, "failed to wait for SIGINT");
            } else {
                tracing::info!("SIGINT received");
            }
        }
        _ = sigterm.recv() => {
            tracing::info!("SIGTERM received");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to wait for SIGINT");
    }
}
