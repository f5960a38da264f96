pub mod handlers;

use crate::{
    Result,
    config::{Config, ServerConfig},
    recognition::{HttpVolumeClient, Orchestrator},
    vision::Recognizer,
    volume::VolumeService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
};
use handlers::{RecognitionState, VolumeState};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

pub fn recognition_router(state: RecognitionState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/recognize", post(handlers::recognize))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn volume_router(state: VolumeState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/estimate-volume", post(handlers::estimate_volume))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_recognition(config: Config) -> Result<()> {
    let settings = config.recognition;

    // Models are loaded once and shared by every request.
    let models = settings.models.clone();
    let recognizer = tokio::task::spawn_blocking(move || Recognizer::from_config(&models))
        .await
        .map_err(|e| crate::Error::internal(format!("Model loading task failed: {}", e)))??;

    let volume_client = HttpVolumeClient::from_config(&settings.volume_service)?;
    info!(
        url = volume_client.url(),
        timeout_secs = settings.volume_service.timeout_secs,
        "Volume service client configured"
    );

    let state = RecognitionState {
        orchestrator: Arc::new(Orchestrator::new(
            Arc::new(recognizer),
            Arc::new(volume_client),
        )),
    };

    serve(
        &settings.server,
        recognition_router(state, settings.max_upload_bytes),
    )
    .await
}

pub async fn run_volume(config: Config) -> Result<()> {
    let settings = config.volume;

    tokio::fs::create_dir_all(&settings.scratch_dir).await?;

    let service = VolumeService::from_config(&settings);
    info!(
        scratch_dir = %service.scratch_dir().display(),
        estimator = %settings.estimator.program,
        "Volume service configured"
    );

    let state = VolumeState {
        service: Arc::new(service),
    };

    serve(
        &settings.server,
        volume_router(state, settings.max_upload_bytes),
    )
    .await
}

async fn serve(server: &ServerConfig, app: Router) -> Result<()> {
    let addr = SocketAddr::new(server.host.parse()?, server.port);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
