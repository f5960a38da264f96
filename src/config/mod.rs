mod types;

pub use types::*;

use crate::Result;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

pub async fn load() -> Result<Config> {
    let lookup = |key: &str| env::var(key).ok();

    let mut config = read(lookup("CONFIG_PATH"), Path::new(DEFAULT_CONFIG_PATH)).await?;
    config.apply_env_overrides(lookup);
    Ok(config)
}

/// Only an explicitly requested file is mandatory.
async fn read(explicit: Option<String>, default_path: &Path) -> Result<Config> {
    let config_path = match explicit {
        Some(path) => PathBuf::from(path),
        None if default_path.exists() => default_path.to_path_buf(),
        None => {
            debug!("No {} found, using built-in defaults", default_path.display());
            return Ok(Config::default());
        }
    };

    debug!("Loading configuration from: {}", config_path.display());

    let config_str = tokio::fs::read_to_string(&config_path).await?;
    parse(&config_str)
}

impl Config {
    /// Deployment overrides for the peer URL and the scratch directory.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("VOLUME_SERVICE_URL") {
            debug!("VOLUME_SERVICE_URL overrides volume service url");
            self.recognition.volume_service.url = url;
        }
        if let Some(dir) = lookup("SCRATCH_DIR") {
            debug!("SCRATCH_DIR overrides scratch directory");
            self.volume.scratch_dir = dir.into();
        }
    }
}

pub fn parse(config_str: &str) -> Result<Config> {
    let config: Config = serde_yaml::from_str(config_str)?;
    Ok(config)
}
