//! # Maintainer Error Types

use thiserror::Error;
use warden_sync::SyncError;

/// Errors that can occur in the maintenance engine.
///
/// Ordinary domain events, such as an entity going quiet past its drop
/// deadline, are not errors.
#[derive(Error, Debug)]
pub enum MaintainerError {
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    ConfigIo {
        /// Path that was being read.
        path: String,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A threading primitive failed.
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Result type for maintenance operations.
pub type MaintainerResult<T> = Result<T, MaintainerError>;
