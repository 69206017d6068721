use tokio::signal;

use crate::app::AppState;

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, stopping watcher...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, stopping watcher...");
        }
    }
}

/// Drop work that never started. Those files stay in the input folder and
/// are picked up by the start-up scan next time.
pub async fn graceful_shutdown(state: &AppState) {
    let mut file_queue = state.file_queue.write().await;

    if file_queue.is_empty() {
        tracing::info!("No pending files left in queue");
        return;
    }

    tracing::info!(
        count = file_queue.len(),
        "Leaving unprocessed files in the input folder"
    );
    file_queue.clear();
}
