// src/error.rs

use thiserror::Error;

/// Core error types for rpmdb
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors, including short page reads
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed database, page, or header structure
    #[error("Format error: {0}")]
    Format(String),

    /// A well-formed value this reader does not accept
    #[error("Unsupported value: {0}")]
    UnsupportedValue(String),

    /// The background scan thread stopped without reporting completion
    #[error("Scan worker failed: {0}")]
    ScanWorker(String),
}

/// Result type alias using rpmdb's Error type
pub type Result<T> = std::result::Result<T, Error>;
