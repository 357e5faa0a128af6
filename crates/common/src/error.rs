//! Error types shared across Keepsake crates.

use std::path::PathBuf;

/// Top-level error type for Keepsake operations.
///
/// Only document- and configuration-level failures travel through this type.
/// Failures of individual downloads are reported per job instead.
#[derive(Debug, thiserror::Error)]
pub enum KeepsakeError {
    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Unsupported input file type: {extension}")]
    UnsupportedInput { extension: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Pipeline error: {message}")]
    Pipeline { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using KeepsakeError.
pub type KeepsakeResult<T> = Result<T, KeepsakeError>;

impl KeepsakeError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    pub fn unsupported_input(extension: impl Into<String>) -> Self {
        Self::UnsupportedInput {
            extension: extension.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn pipeline(msg: impl Into<String>) -> Self {
        Self::Pipeline {
            message: msg.into(),
        }
    }
}
