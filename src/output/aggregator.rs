//! Result aggregator
//!
//! Collects the rows emitted by traversal branches into one sink per level.
//! Branches may emit concurrently; appending is the only operation, so a mutex
//! per sink is all the coordination needed. No deduplication is done here.

use crate::hierarchy::{Level, NodePath, Row};
use crate::output::csv_output::CsvSink;
use crate::output::stats::{CrawlStatistics, RunStatus, StatisticsSnapshot};
use crate::output::traits::{OutputResult, RowSink};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Append-only row collection, one sink per level
pub struct Aggregator {
    sinks: Vec<Mutex<Box<dyn RowSink>>>,
    stats: CrawlStatistics,
}

impl Aggregator {
    /// Builds an aggregator from a sink factory called once per level
    pub fn new<F>(mut factory: F) -> OutputResult<Self>
    where
        F: FnMut(Level) -> OutputResult<Box<dyn RowSink>>,
    {
        let sinks = Level::ALL
            .iter()
            .map(|level| factory(*level).map(Mutex::new))
            .collect::<OutputResult<Vec<_>>>()?;

        Ok(Self {
            sinks,
            stats: CrawlStatistics::new(),
        })
    }

    /// Opens one CSV file per level in `directory`
    pub fn open_csv(directory: &Path) -> OutputResult<Self> {
        Self::new(|level| Ok(Box::new(CsvSink::create(directory, level)?) as Box<dyn RowSink>))
    }

    /// Emits the row describing the leaf of `path`
    ///
    /// Write failures are logged and counted; they never interrupt the crawl.
    pub fn emit(&self, path: &NodePath) {
        let Some(row) = Row::from_path(path) else {
            return;
        };

        let result = self.sinks[row.level.depth()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_row(&row);

        match result {
            Ok(()) => self.stats.record_row(row.level),
            Err(e) => {
                tracing::error!("Failed to write {} row for {}: {}", row.level, path, e);
                self.stats.record_sink_error();
            }
        }
    }

    /// Live counters
    pub fn statistics(&self) -> &CrawlStatistics {
        &self.stats
    }

    /// Flushes every sink and freezes the statistics
    pub fn finish(&self, status: RunStatus) -> OutputResult<StatisticsSnapshot> {
        for sink in &self.sinks {
            sink.lock().unwrap_or_else(PoisonError::into_inner).flush()?;
        }
        Ok(self.stats.snapshot(status))
    }
}
