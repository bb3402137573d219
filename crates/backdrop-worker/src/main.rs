mod routes;
mod setup;
mod telemetry;

use anyhow::Result;
use backdrop_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_telemetry();

    let config = Config::from_env()?;
    config.validate()?;

    let state = setup::build_state(config.clone()).await?;
    let router = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    tracing::info!(
        addr = %addr,
        environment = %config.environment,
        invocation_timeout_secs = config.invocation_timeout_secs,
        "Starting worker"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Signal handler for graceful shutdown: Ctrl+C (SIGINT) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        _ = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        _ = terminate => tracing::info!("Received terminate signal"),
    }

    tracing::info!("Shutting down gracefully...");
}
