use crate::{Error, Result, config::VolumeServiceConfig, types::UploadedImage, upload::FILE_FIELD};
use async_trait::async_trait;
use reqwest::{
    StatusCode,
    multipart::{Form, Part},
};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Why no volume came back. Each branch is logged distinctly; none of them
/// fails the recognition request.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RemoteUnavailable {
    #[error("volume service timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("volume service unreachable: {0}")]
    Unreachable(String),

    #[error("volume service returned {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("volume service returned malformed JSON: {0}")]
    MalformedBody(String),

    #[error("volume service response has no numeric volume_ml: {0}")]
    MissingVolume(String),
}

/// Outcome of the best-effort volume call.
#[derive(Debug, Clone, PartialEq)]
pub enum VolumeLookup {
    Estimated(f64),
    Unavailable(RemoteUnavailable),
}

#[async_trait]
pub trait VolumeClient: Send + Sync {
    async fn lookup(&self, image: &UploadedImage) -> VolumeLookup;
}

/// Posts the original upload to the volume service's `/estimate-volume`.
pub struct HttpVolumeClient {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpVolumeClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build volume client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    pub fn from_config(config: &VolumeServiceConfig) -> Result<Self> {
        Self::new(config.url.clone(), Duration::from_secs(config.timeout_secs))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn form(image: &UploadedImage) -> Form {
        let untyped = || Part::bytes(image.bytes.to_vec()).file_name(image.filename.clone());

        // An unparseable MIME type is still sent, just untyped.
        let part = match &image.content_type {
            Some(content_type) => untyped().mime_str(content_type).unwrap_or_else(|_| untyped()),
            None => untyped(),
        };
        Form::new().part(FILE_FIELD, part)
    }

    async fn request(&self, image: &UploadedImage) -> std::result::Result<f64, RemoteUnavailable> {
        let response = self
            .client
            .post(&self.url)
            .multipart(Self::form(image))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        info!("Volume service response status: {}", status);

        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        // Only a plain 200 carries an estimate.
        if status != StatusCode::OK {
            return Err(RemoteUnavailable::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| RemoteUnavailable::MalformedBody(format!("{}: {}", e, body)))?;
        debug!("Volume service response data: {}", parsed);

        parsed
            .get("volume_ml")
            .and_then(Value::as_f64)
            .ok_or(RemoteUnavailable::MissingVolume(body))
    }

    fn transport_error(&self, e: reqwest::Error) -> RemoteUnavailable {
        if e.is_timeout() {
            RemoteUnavailable::Timeout {
                timeout: self.timeout,
            }
        } else {
            RemoteUnavailable::Unreachable(e.to_string())
        }
    }
}

#[async_trait]
impl VolumeClient for HttpVolumeClient {
    async fn lookup(&self, image: &UploadedImage) -> VolumeLookup {
        info!(url = %self.url, filename = %image.filename, "Calling volume service");

        match self.request(image).await {
            Ok(volume) => VolumeLookup::Estimated(volume),
            Err(reason) => VolumeLookup::Unavailable(reason),
        }
    }
}
