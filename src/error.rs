// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for SnapKeeper

use thiserror::Error;

use crate::resolver::NameError;

/// Result type alias for SnapKeeper operations
pub type Result<T> = std::result::Result<T, SnapKeeperError>;

/// SnapKeeper error types
#[derive(Error, Debug)]
pub enum SnapKeeperError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing API key: set the {0} environment variable")]
    MissingApiKey(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("{provider} returned status {status}: {message}")]
    Rejected {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Provider timed out: {0}")]
    Timeout(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Image too large: {size} bytes (limit {limit} bytes)")]
    ImageTooLarge { size: u64, limit: u64 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Naming error: {0}")]
    Naming(#[from] NameError),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
}

impl SnapKeeperError {
    /// Whether retrying the same request could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Provider(_) => true,
            // Auth and bad-request statuses will not change on a second try
            Self::Rejected { status, .. } => matches!(*status, 408 | 429 | 500..=599),
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}
