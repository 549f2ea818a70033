use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use common::utils::logging::{init_logging_default, init_logging_json};
use configs::{AppConfig, LogFormat};
use dotenvy::dotenv;
use service::StoreHandle;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::routes::{self, AppState};

fn init_logging(format: LogFormat) {
    match format {
        LogFormat::Compact => init_logging_default(),
        LogFormat::Json => init_logging_json(),
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

/// Connect the store once and build the router around the resulting handle.
/// A failed connection is logged and the app still serves non-store routes.
pub async fn build_app(cfg: &AppConfig) -> Router {
    let handle = StoreHandle::connect(&cfg.store).await;
    if !handle.is_connected() {
        warn!(
            backend = %cfg.store.backend,
            reason = handle.failure().unwrap_or("unknown"),
            "store unavailable; /api/names will answer 500"
        );
    }
    let state = AppState::new(Arc::new(handle));
    routes::build_router(state, build_cors())
}

/// Public entry: load config, build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = AppConfig::load_and_validate()?;
    init_logging(cfg.logging.format);

    let app = build_app(&cfg).await;

    let addr = bind_addr(&cfg)?;
    info!(%addr, backend = %cfg.store.backend, collection = %cfg.store.collection, "starting names api");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
