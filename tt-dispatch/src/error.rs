//! Error types for tt-dispatch
//!
//! Selection itself never fails: empty pools and a busy engine are ordinary
//! outcomes. These errors cover loading, persistence and request handling.

use thiserror::Error;

/// Main error type for the dispatcher
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog fetch or parse failure
    #[error("Catalog load error: {0}")]
    CatalogLoad(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors (remote catalog)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A draw is in flight; sequence edits are refused until it settles
    #[error("A draw is in progress")]
    Busy,

    /// Errors from the shared library
    #[error(transparent)]
    Common(#[from] tt_common::Error),
}

/// Convenience Result type using tt-dispatch Error
pub type Result<T> = std::result::Result<T, Error>;
