//! Shutdown signal handling.

use tokio::signal;

/// Completes when SIGINT (Ctrl+C) or SIGTERM is received, returning the
/// name of the signal that fired.
///
/// This is the single suspension point of [`App::run`](crate::App::run): it
/// blocks until cancellation, with no polling. Cancellation is cooperative;
/// it triggers `stop`, it does not terminate in-flight hook work.
///
/// # Example
///
/// ```rust,ignore
/// let signal = armature::shutdown_signal().await;
/// tracing::info!(signal, "shutting down");
/// app.stop().await?;
/// ```
pub async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
