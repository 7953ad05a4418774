//! Error types for the glucolog crate

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlucologError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No {kind} record with id {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Usage error: {0}")]
    Usage(String),
}
