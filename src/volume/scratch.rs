use crate::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Uploaded image persisted for the length of one estimation. The file is
/// removed when the guard drops, whichever way the request ends.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Writes `bytes` to `<dir>/<random>.<extension>`.
    pub async fn create(dir: &Path, extension: &str, bytes: &[u8]) -> Result<Self> {
        tokio::fs::create_dir_all(dir).await?;

        let name = format!("{}.{}", Uuid::new_v4().simple(), extension);
        // Guard first so a failed write still cleans up the partial file.
        let scratch = Self {
            path: dir.join(name),
        };
        tokio::fs::write(&scratch.path, bytes).await?;

        debug!(path = %scratch.path.display(), size = bytes.len(), "Scratch file written");
        Ok(scratch)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Scratch file removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                "Failed to remove scratch file: {}", e
            ),
        }
    }
}
