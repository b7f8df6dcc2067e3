//! fides-server binary entry point.

use fides_server::{create_router_with_config, AppState, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,fides_server=debug,fides_core=debug")),
        )
        .init();

    let config = Config::from_env();

    let state = match AppState::from_env(&config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize application state");
            std::process::exit(1);
        }
    };

    let app = create_router_with_config(state, &config);
    let addr = config.socket_addr();

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind listener");
            std::process::exit(1);
        }
    };

    tracing::info!(%addr, docs = %format!("http://{addr}/docs"), "fides-server listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
