use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing::info;

mod analysis;
mod assistant;
mod config;
mod generation;
mod handlers;
mod llm;
mod recommend;
mod state;
mod utils;

use config::CONFIG;
use generation::DesignGenerator;
use state::AppState;
use utils::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let _guards = init_logging();

    // The pipeline itself loads lazily on the first /generate request.
    let state = AppState::new(DesignGenerator::from_config());

    let app = Router::new()
        .route("/", get(handlers::health))
        .route("/generate", post(handlers::generate::generate_design))
        .route("/chat", post(handlers::chat::chat))
        .route("/analyze-room", post(handlers::analyze::analyze_room))
        .route("/recommend", post(handlers::recommend::recommend))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], CONFIG.port));
    info!("Starting GruhaBuddy AI service on port {}", CONFIG.port);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {err}");
    }
}
