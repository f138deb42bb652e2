//! In-memory sink

use crate::hierarchy::{Level, Row};
use crate::output::traits::{OutputResult, RowSink};
use std::sync::{Arc, Mutex, PoisonError};

/// Collects rows in memory
///
/// Clones share the same buffer, so one handle can be given to the aggregator
/// (for any number of levels) while another reads the rows back.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    rows: Arc<Mutex<Vec<Row>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows written so far, in write order
    pub fn rows(&self) -> Vec<Row> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Field lists of the rows written for one level
    pub fn rows_at(&self, level: Level) -> Vec<Vec<String>> {
        self.rows()
            .into_iter()
            .filter(|row| row.level == level)
            .map(|row| row.fields)
            .collect()
    }
}

impl RowSink for MemorySink {
    fn write_row(&mut self, row: &Row) -> OutputResult<()> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(row.clone());
        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        Ok(())
    }
}
