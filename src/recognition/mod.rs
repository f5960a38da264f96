//! Recognition pipeline: a mandatory local label plus a best-effort volume
//! from the volume service.

mod client;

pub use client::{HttpVolumeClient, RemoteUnavailable, VolumeClient, VolumeLookup};

use crate::{
    Error, Result,
    types::{RecognitionResult, UploadedImage},
    vision::{Label, Recognizer, UNKNOWN_LABEL},
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct Orchestrator {
    recognizer: Arc<Recognizer>,
    volume: Arc<dyn VolumeClient>,
}

impl Orchestrator {
    pub fn new(recognizer: Arc<Recognizer>, volume: Arc<dyn VolumeClient>) -> Self {
        Self { recognizer, volume }
    }

    /// Rejects uploads that are not a non-empty `image/*`.
    pub fn validate(upload: &UploadedImage) -> Result<()> {
        if !upload.is_image() {
            return Err(Error::invalid_input("File must be an image"));
        }
        if upload.is_empty() {
            return Err(Error::invalid_input("Empty file"));
        }
        Ok(())
    }

    pub async fn recognize(&self, upload: UploadedImage) -> Result<RecognitionResult> {
        Self::validate(&upload).inspect_err(|e| {
            warn!(
                filename = %upload.filename,
                content_type = ?upload.content_type,
                stage = "validate",
                "Rejected upload: {}", e
            );
        })?;

        info!(filename = %upload.filename, size = upload.len(), "Processing image");

        let label = self.local_label(&upload).await.inspect_err(|e| {
            error!(
                filename = %upload.filename,
                stage = "recognize",
                "Error processing image: {}", e
            );
        })?;

        info!(filename = %upload.filename, label = label.as_str(), "Recognition result");

        let name = match label {
            Label::Unknown => return Ok(RecognitionResult::success(UNKNOWN_LABEL, None)),
            Label::Food(name) => name,
        };

        let volume = match self.volume.lookup(&upload).await {
            VolumeLookup::Estimated(volume_ml) => {
                info!(filename = %upload.filename, volume_ml, "Volume estimation result");
                Some(volume_ml)
            }
            VolumeLookup::Unavailable(reason) => {
                warn!(
                    filename = %upload.filename,
                    stage = "volume",
                    "Continuing without volume: {}", reason
                );
                None
            }
        };

        Ok(RecognitionResult::success(name, volume))
    }

    /// Model inference is CPU bound, keep it off the async workers.
    async fn local_label(&self, upload: &UploadedImage) -> Result<Label> {
        let recognizer = Arc::clone(&self.recognizer);
        let bytes = upload.bytes.clone();

        tokio::task::spawn_blocking(move || recognizer.recognize(&bytes))
            .await
            .map_err(|e| Error::internal(format!("Inference task failed: {}", e)))?
    }
}
