//! Core error types for seqsmith

use thiserror::Error;

/// Main error type for seqsmith operations
#[derive(Error, Debug)]
pub enum SeqsmithError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parsing error: {0}")]
    Parse(String),

    #[error("Unknown format: {0}")]
    Format(String),

    #[error("Alphabet mismatch: {0}")]
    Alphabet(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("External tool error: {0}")]
    External(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// Result type alias for seqsmith operations
pub type SeqsmithResult<T> = Result<T, SeqsmithError>;

// Conversion implementations for common error types
impl From<serde_json::Error> for SeqsmithError {
    fn from(err: serde_json::Error) -> Self {
        SeqsmithError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for SeqsmithError {
    fn from(err: anyhow::Error) -> Self {
        SeqsmithError::Other(err.to_string())
    }
}

impl From<regex::Error> for SeqsmithError {
    fn from(err: regex::Error) -> Self {
        SeqsmithError::InvalidInput(format!("bad pattern: {}", err))
    }
}
