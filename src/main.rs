use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod common;
mod config;
mod docs;
mod infrastructure;
mod modules;
mod routes;
mod state;
mod workers;


use config::settings::AppConfig;
use infrastructure::ffmpeg::transcoder::{FfmpegTranscoder, TranscodeProfile};
use infrastructure::storage::transient::TransientStorage;
use modules::converter::controller::WorkflowController;
use modules::converter::session::SessionStore;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting server...");

    let config = AppConfig::new();

    let storage = TransientStorage::new(&config.transient_dir)
        .with_context(|| format!("cannot use {} for transient files", config.transient_dir.display()))?;
    storage.purge().context("cannot clean transient storage")?;

    let ffmpeg = FfmpegTranscoder::new(&config.ffmpeg_path);
    match ffmpeg.version() {
        Ok(version) => info!("🎥 Using {}", version),
        Err(e) => warn!("{} is not usable, conversions will fail: {:#}", ffmpeg.binary().display(), e),
    }

    let controller = WorkflowController::new(
        storage.clone(),
        Arc::new(ffmpeg),
        TranscodeProfile::mp4(&config.ffmpeg_preset),
        config.strict_extensions,
    );
    let state = AppState::new(config.clone(), controller, SessionStore::new());

    tokio::spawn(workers::session_reaper::start_session_reaper(state.clone()));

    let app = app::create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shutting down, cleaning transient storage");
    if let Err(e) = storage.purge() {
        warn!("Failed to clean transient storage: {}", e);
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
