//! HTTP gateway for the presence protocol.
//!
//! Exposes the protocol endpoint at `POST /index.mth` (registered for every
//! method so the handler's own method check produces the logged 405), a
//! health check, and the webroot itself as static files so a client can
//! fetch any matched digest at `GET /<hex>`.

use crate::config::Config;
use crate::handler::{self, MediaRequest, Outcome};
use crate::index::SharedIndex;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub index: SharedIndex,
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let webroot = ctx.config.media.webroot.clone();

    Router::new()
        .route("/health", get(health_check))
        .route("/index.mth", any(handle_presence))
        .fallback_service(ServeDir::new(webroot))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Adapt one HTTP request to the transport-independent handler and map its
/// outcome back to a status.
async fn handle_presence(
    State(ctx): State<AppContext>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let remote_addr = addr.to_string();
    let request = MediaRequest {
        method: method.as_str(),
        remote_addr: &remote_addr,
        user_agent: header_str(&headers, header::USER_AGENT),
        referer: header_str(&headers, header::REFERER),
        body: &body,
    };

    // Each request reads its own snapshot; a concurrent rebuild swaps the
    // shared handle without affecting us.
    let snapshot = ctx.index.snapshot();

    match handler::handle(&snapshot, &request) {
        Outcome::Served { body, .. } => {
            let length = body.len();
            let mut response = (StatusCode::OK, body).into_response();
            let headers = response.headers_mut();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("octet/stream"));
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
            response
        }
        Outcome::MethodRejected => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        Outcome::OriginRejected => StatusCode::FORBIDDEN.into_response(),
        Outcome::PeerUnresolvable => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        Outcome::ProtocolRejected => StatusCode::BAD_REQUEST.into_response(),
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> &str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Start the HTTP server
pub async fn start_server(config: Config, index: SharedIndex) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let webroot = config.media.webroot.clone();
    let ctx = AppContext {
        config: Arc::new(config),
        index: index.clone(),
    };

    spawn_rebuild_task(index, webroot);

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Rebuild the index on SIGHUP. The new snapshot is built off to the side
/// and only published on success; a failed rebuild leaves the previous
/// snapshot serving.
#[cfg(unix)]
fn spawn_rebuild_task(index: SharedIndex, webroot: PathBuf) {
    tokio::spawn(async move {
        let mut hangup = match signal::unix::signal(signal::unix::SignalKind::hangup()) {
            Ok(sig) => sig,
            Err(e) => {
                tracing::error!("Failed to install SIGHUP handler: {}", e);
                return;
            }
        };

        while hangup.recv().await.is_some() {
            tracing::info!("SIGHUP received, rebuilding media index");
            let index = index.clone();
            let webroot = webroot.clone();
            let rebuilt =
                tokio::task::spawn_blocking(move || index.rebuild(&webroot)).await;
            match rebuilt {
                Ok(Ok(count)) => tracing::info!("Media index rebuilt: {} files", count),
                Ok(Err(e)) => {
                    tracing::warn!("Index rebuild failed, keeping previous snapshot: {}", e)
                }
                Err(e) => tracing::error!("Index rebuild task panicked: {}", e),
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_rebuild_task(_index: SharedIndex, _webroot: PathBuf) {}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}
