pub mod config;
pub mod error;
pub mod logging;
pub mod recognition;
pub mod server;
pub mod types;
pub mod upload;
pub mod vision;
pub mod volume;

pub use error::{Error, Result};
