//! Volume estimation: persist the upload, hand it to an [`Estimator`], always
//! clean up.

mod estimator;
mod parse;
mod scratch;

pub use estimator::{Estimator, ProcessEstimator};

use crate::{
    Error, Result,
    config::VolumeConfig,
    types::{UploadedImage, VolumeEstimate},
};
use scratch::ScratchFile;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct VolumeService {
    scratch_dir: PathBuf,
    allowed_extensions: Vec<String>,
    estimator: Arc<dyn Estimator>,
}

impl VolumeService {
    pub fn new(
        scratch_dir: impl Into<PathBuf>,
        allowed_extensions: Vec<String>,
        estimator: Arc<dyn Estimator>,
    ) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            estimator,
        }
    }

    pub fn from_config(config: &VolumeConfig) -> Self {
        Self::new(
            config.scratch_dir.clone(),
            config.allowed_extensions.clone(),
            Arc::new(ProcessEstimator::new(config.estimator.clone())),
        )
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Lower-cased extension of `filename` if it is on the allow-list.
    pub fn accepted_extension(&self, filename: &str) -> Result<String> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .filter(|ext| self.allowed_extensions.contains(ext));

        extension.ok_or_else(|| {
            let allowed = self.allowed_extensions.join("/");
            Error::unsupported_format(format!("Only {} supported", allowed))
        })
    }

    pub async fn estimate(&self, upload: &UploadedImage) -> Result<VolumeEstimate> {
        let extension = self.accepted_extension(&upload.filename).inspect_err(|_| {
            warn!(
                filename = %upload.filename,
                stage = "validate",
                "Rejected upload with unsupported extension"
            );
        })?;

        let scratch = ScratchFile::create(&self.scratch_dir, &extension, &upload.bytes)
            .await
            .inspect_err(|e| {
                error!(
                    filename = %upload.filename,
                    stage = "persist",
                    "Failed to persist upload: {}", e
                );
            })?;

        let outcome = self.estimator.estimate(scratch.path()).await;
        drop(scratch);

        match outcome {
            Ok(volume_ml) => {
                info!(filename = %upload.filename, volume_ml, "Volume estimation succeeded");
                Ok(VolumeEstimate { volume_ml })
            }
            Err(e) => {
                error!(
                    filename = %upload.filename,
                    stage = "estimate",
                    "Volume estimation failed: {}", e
                );
                Err(e)
            }
        }
    }
}
