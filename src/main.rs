use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use face_detection_service::config::ServiceConfig;
use face_detection_service::face_detection::model_mtcnn::onnx::load_cascade;
use face_detection_service::server::{self, AppState};
use face_detection_service::MtcnnDetector;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServiceConfig::load().context("loading service config")?;
    info!(?config, "service config");

    // the scoring backend is loaded once and shared by every request
    let cascade = load_cascade(&config.model_dir, config.inference_threads)
        .with_context(|| format!("loading models from {}", config.model_dir.display()))?;
    let detector = Arc::new(MtcnnDetector::new(cascade, config.detector()));
    info!("Starting: face detection");

    let state = Arc::new(AppState::new(detector, config.request_timeout()));
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("binding {}", config.bind_address))?;
    info!(address = %config.bind_address, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // no signal handler available, run until killed
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
