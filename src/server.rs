//! HTTP server: routing, CORS and graceful shutdown.

use std::net::SocketAddr;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

use crate::app::App;
use crate::routes::{health_routes, metadata_routes, MetadataState};
use crate::types::settings::ServerSettings;

/// Builds the CORS layer from the configured origins. Unparsable origins are skipped.
pub fn cors_layer(settings: &ServerSettings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid allowed origin {origin:?}: {e}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn build_router(app: &App) -> Router {
    let state = MetadataState {
        source: app.metadata.clone(),
        cache_ttl: app.metadata_ttl(),
    };

    Router::new()
        .merge(metadata_routes())
        .with_state(state)
        .merge(health_routes())
        .layer(cors_layer(&app.settings.server))
}

pub async fn start_server(app: &App) -> anyhow::Result<()> {
    let router = build_router(app);
    let server = &app.settings.server;

    let addr: SocketAddr = format!("{}:{}", server.host, server.port)
        .parse()
        .with_context(|| format!("Invalid address {}:{}", server.host, server.port))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Starting web server on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
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
}
