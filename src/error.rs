//! # Error Types
//!
//! Custom error types for Tello Console using `thiserror`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Tello Console
#[derive(Debug, Error)]
pub enum TelloError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Socket setup or send failures other than a receive timeout
    #[error("Network error: {0}")]
    Network(String),

    /// A local command was recognised but its arguments were unusable
    #[error("Invalid argument for '{command}': {reason}")]
    InvalidArgument {
        command: &'static str,
        reason: String,
    },

    /// A script file could not be read
    #[error("Unable to load script {path}: {source}")]
    Script {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for Tello Console
pub type Result<T> = std::result::Result<T, TelloError>;
