use crate::{Error, Result, types::UploadedImage};
use axum::{
    extract::{Multipart, multipart::MultipartError},
    http::StatusCode,
};
use tracing::debug;

pub const FILE_FIELD: &str = "file";

/// Pulls the `file` field out of a multipart form. Other fields are ignored.
pub async fn read_file_field(mut multipart: Multipart) -> Result<UploadedImage> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Malformed multipart body", e))?
    {
        if field.name() != Some(FILE_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(&format!("Failed to read upload {}", filename), e))?;

        debug!(
            filename = %filename,
            content_type = ?content_type,
            size = bytes.len(),
            "Received upload"
        );

        return Ok(UploadedImage {
            filename,
            content_type,
            bytes,
        });
    }

    Err(Error::invalid_input("Missing multipart field 'file'"))
}

/// Bodies cut off by the upload limit keep their 413, anything else is a bad
/// request.
fn multipart_error(context: &str, e: MultipartError) -> Error {
    let message = format!("{}: {}", context, e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::payload_too_large(message)
    } else {
        Error::invalid_input(message)
    }
}
