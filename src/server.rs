//! Listener setup shared by both binaries

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::Result;

/// Bind `server` and serve `app` until Ctrl-C or SIGTERM
pub async fn serve(app: Router, server: &ServerConfig, service: &str) -> Result<()> {
    let addr = server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;

    info!("{} listening on {}", service, listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("{} stopped", service);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
