//! Axum-based HTTP gateway in front of the tenant registry.
//!
//! Every request outside `/` and `/admin` must carry a valid
//! `x-yildiz-prefix` header. The tenant check itself lives in
//! [`resolver`] and knows nothing about HTTP; this module only adapts it:
//! - tenant validation as an axum middleware
//! - request body size limits (64KB max)
//! - request timeouts (30s)
//! - `powered-by` banner on every response

mod handlers;
mod middleware;
pub mod resolver;

pub use handlers::RawQuery;
pub use middleware::{POWERED_BY, POWERED_BY_HEADER};
pub use resolver::{
    GatewayStats, PREFIX_HEADER, StatsDocument, TenantAccess, TenantGate, TenantRejection,
    TenantResolver, is_exempt_path,
};

use handlers::{handle_admin_stats, handle_health, handle_raw, handle_root, handle_tenant_stats};

use crate::config::Config;
use crate::db::SqliteConnector;
use crate::tenant::TenantRegistry;
use anyhow::{Context, Result};
use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (64KB)
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<dyn TenantResolver>,
}

/// Build the router. `POST /raw` is only routed when `enable_raw` is set.
pub fn router(state: AppState, enable_raw: bool) -> Router {
    let mut app = Router::new()
        .route("/", get(handle_root))
        .route("/admin/health", get(handle_health))
        .route("/admin/stats", get(handle_admin_stats))
        .route("/tenant/stats", get(handle_tenant_stats));

    if enable_raw {
        app = app.route("/raw", post(handle_raw));
    }

    app.layer(axum::middleware::from_fn_with_state(
        state.clone(),
        middleware::require_tenant,
    ))
    .layer(axum::middleware::from_fn(middleware::powered_by))
    .with_state(state)
    .layer(CorsLayer::permissive())
    .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
    .layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(REQUEST_TIMEOUT_SECS),
    ))
}

/// Run the HTTP gateway on the configured host and port.
pub async fn run_gateway(config: Config) -> Result<()> {
    let host = config.gateway.host.clone();
    let port = config.gateway.port;
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid gateway address {host}:{port}"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind gateway to {addr}"))?;

    run_gateway_with_listener(listener, config).await
}

/// Run the HTTP gateway from a pre-bound listener until Ctrl-C.
pub async fn run_gateway_with_listener(
    listener: tokio::net::TcpListener,
    config: Config,
) -> Result<()> {
    let connector = SqliteConnector::open(&config.database).await?;
    let registry = Arc::new(TenantRegistry::new(
        Arc::new(connector),
        config.janitor.clone(),
    ));

    serve(
        listener,
        registry,
        config.gateway.enable_raw,
        shutdown_signal(),
    )
    .await
}

/// Serve `registry` on `listener` until `shutdown` resolves, then stop every
/// tenant's janitor.
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    registry: Arc<TenantRegistry>,
    enable_raw: bool,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    let state = AppState {
        resolver: Arc::new(TenantGate::new(Arc::clone(&registry))),
    };
    let app = router(state, enable_raw);

    tracing::info!(%addr, enable_raw, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("gateway server failed")?;

    registry.close();
    tracing::info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}
