//! Solver error types

use redcomp_contracts::TranslationError;
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while running a property group through the solver
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Translation failed: {0}")]
    Translation(#[from] TranslationError),

    #[error("Cannot start solver {executable}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Nonzero exit without cancellation
    #[error("Abnormal termination, exit code {code}\n{text}")]
    AbnormalTermination { code: i32, text: String },

    /// A band the script prints is absent from the solver output
    #[error("Solver output has no band \"{band}\"\n{text}")]
    MissingBand { band: String, text: String },

    #[error("Expected {expected} property results but the document holds {found}\n{text}")]
    ResultCount {
        expected: usize,
        found: usize,
        text: String,
    },

    #[error("Error parsing results document: {0}")]
    Document(String),

    #[error("Timeout must be positive")]
    InvalidTimeout,

    #[error("Solver did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Job queue is closed")]
    QueueClosed,

    #[error("Worker thread panicked")]
    WorkerPanicked,
}

impl From<quick_xml::Error> for SolverError {
    fn from(err: quick_xml::Error) -> Self {
        SolverError::Document(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for SolverError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        SolverError::Document(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SolverError>;

/// The messages of `err` and all of its sources, one per line
pub fn nested_messages(err: &(dyn StdError + 'static)) -> String {
    let mut messages = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        let message = cause.to_string();
        if !messages.iter().any(|m| m.contains(&message)) {
            messages.push(message);
        }
        source = cause.source();
    }
    messages.join("\n")
}
