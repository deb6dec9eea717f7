//! Signal handling and the background expiry sweeper.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;

use crate::store::EventStore;

/// Completes when SIGTERM or SIGINT (Ctrl+C) arrives.
pub async fn shutdown_signal() {
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
        }
    }
}

/// Spawns a task that sweeps expired draws every `every`.
///
/// Returns a Notify that stops the task.
pub fn spawn_expiry_sweeper(store: EventStore, every: Duration) -> Arc<Notify> {
    let shutdown_notify = Arc::new(Notify::new());
    let shutdown_notify_clone = shutdown_notify.clone();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // the first tick is immediate; startup already swept
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = store.sweep_expired().await;
                    tracing::debug!(removed, "periodic expiry sweep");
                }
                _ = shutdown_notify_clone.notified() => {
                    tracing::debug!("Expiry sweeper shutting down");
                    break;
                }
            }
        }
    });

    shutdown_notify
}
