//! OS signal handling.

/// Block until ctrl-c. Signal handler installation failures are logged
/// and treated as an immediate shutdown request rather than a panic.
pub async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c, shutting down");
    }
    tracing::info!("shutdown signal received");
}
