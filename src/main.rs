//! ScrollJar - Main application entry point

use std::net::SocketAddr;
use std::time::Duration;
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;

use scrolljar::{Config, create_app, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        // Only warn if it's not a "file not found" error
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    let config = Config::load().map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration. Check DATABASE_URL and SCROLLJAR__* env vars: {}",
            e
        )
    })?;

    init_tracing(&config.logging)?;

    tracing::info!("Starting ScrollJar server...");
    tracing::info!(
        "Configuration loaded: server={}:{} env={}",
        config.server.host,
        config.server.port,
        config.server.env
    );

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let enable_docs = config.server.enable_docs;

    let app_handle = create_app(config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create application: {}", e))?;

    tracing::info!("Server listening on {}", addr);
    if enable_docs {
        tracing::info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);
    }

    let listener = TcpListener::bind(addr).await?;
    let router = app_handle.router.clone();
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(app_handle.shutdown_token.clone()))
    .await?;

    tracing::info!("HTTP server stopped; draining background tasks");
    app_handle.shutdown(grace).await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM, then cancel background tasks
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }

    shutdown_token.cancel();
}
