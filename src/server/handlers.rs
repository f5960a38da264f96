use crate::{
    Result,
    recognition::Orchestrator,
    types::{RecognitionResult, VolumeEstimate},
    upload::read_file_field,
    volume::VolumeService,
};
use axum::{
    extract::{Multipart, State},
    response::Json,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

/// Recognition service context, built once at startup.
#[derive(Clone)]
pub struct RecognitionState {
    pub orchestrator: Arc<Orchestrator>,
}

/// Volume service context, built once at startup.
#[derive(Clone)]
pub struct VolumeState {
    pub service: Arc<VolumeService>,
}

pub async fn root() -> Json<Value> {
    Json(json!({"message": "Food Recognition API is running"}))
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}

pub async fn recognize(
    State(state): State<RecognitionState>,
    multipart: Multipart,
) -> Result<Json<RecognitionResult>> {
    let upload = read_file_field(multipart).await.inspect_err(|e| {
        warn!(stage = "upload", "Rejected recognition request: {}", e);
    })?;
    info!("Received recognition request for: {}", upload.filename);

    let result = state.orchestrator.recognize(upload).await?;
    Ok(Json(result))
}

pub async fn estimate_volume(
    State(state): State<VolumeState>,
    multipart: Multipart,
) -> Result<Json<VolumeEstimate>> {
    let upload = read_file_field(multipart).await.inspect_err(|e| {
        warn!(stage = "upload", "Rejected volume request: {}", e);
    })?;
    info!("Received volume request for: {}", upload.filename);

    let estimate = state.service.estimate(&upload).await?;
    Ok(Json(estimate))
}
