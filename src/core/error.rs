use rusqlite;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanactError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Failed to initialize database: {0}")]
    DatabaseInitializationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}
