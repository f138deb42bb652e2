//! Row sink trait and error types
//!
//! This module defines the interface every per-level output implements.

use crate::hierarchy::Row;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for the rows of one level
///
/// Appending is the only mutation. Implementations must be `Send` so the
/// aggregator can share them between traversal branches behind a mutex.
pub trait RowSink: Send {
    /// Appends one row
    fn write_row(&mut self, row: &Row) -> OutputResult<()>;

    /// Makes every written row durable
    fn flush(&mut self) -> OutputResult<()>;
}
