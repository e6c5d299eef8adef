//! Error types for the Wenku library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`WenkuError`] enum. The variants follow the failure taxonomy of the
//! retrieval core: configuration problems are fatal, while per-chunk and
//! per-query failures are recovered close to where they happen.
//!
//! # Examples
//!
//! ```
//! use wenku::error::{Result, WenkuError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(WenkuError::invalid_config("chunk_size must be positive"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Wenku operations.
#[derive(Error, Debug)]
pub enum WenkuError {
    /// I/O errors (dictionary or configuration files).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Chunker configuration rejected before processing begins.
    #[error("Chunking error: {0}")]
    Chunking(String),

    /// Per-chunk enrichment failure. Recovered by the enricher.
    #[error("Enrichment error: {0}")]
    Enrichment(String),

    /// Segmenter failure while adding a unit to the index.
    #[error("Index mutation error: {0}")]
    IndexMutation(String),

    /// Failure while scoring a query. Recovered by `Bm25Index::score`.
    #[error("Scoring error: {0}")]
    Scoring(String),

    /// Segmentation and tagging errors.
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Document store errors.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration values.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Errors raised by external collaborators (segmenters, stores).
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with WenkuError.
pub type Result<T> = std::result::Result<T, WenkuError>;

impl WenkuError {
    /// Create a new chunking error.
    pub fn chunking<S: Into<String>>(msg: S) -> Self {
        WenkuError::Chunking(msg.into())
    }

    /// Create a new enrichment error.
    pub fn enrichment<S: Into<String>>(msg: S) -> Self {
        WenkuError::Enrichment(msg.into())
    }

    /// Create a new index mutation error.
    pub fn index_mutation<S: Into<String>>(msg: S) -> Self {
        WenkuError::IndexMutation(msg.into())
    }

    /// Create a new scoring error.
    pub fn scoring<S: Into<String>>(msg: S) -> Self {
        WenkuError::Scoring(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        WenkuError::Analysis(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        WenkuError::Storage(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        WenkuError::InvalidConfig(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        WenkuError::Other(msg.into())
    }
}
