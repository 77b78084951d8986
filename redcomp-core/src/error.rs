//! Error types for redcomp

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error at offset {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Unexpected end of expression: {0}")]
    UnexpectedEof(String),

    #[error("Invalid port reference: {0:?}")]
    InvalidPort(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
