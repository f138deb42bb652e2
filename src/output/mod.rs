//! Output module for harvested rows
//!
//! This module handles:
//! - Collecting rows from concurrent traversal branches
//! - Writing one CSV file per hierarchy level
//! - Recording and printing crawl statistics

mod aggregator;
mod csv_output;
mod memory;
pub mod stats;
mod traits;

pub use aggregator::Aggregator;
pub use csv_output::CsvSink;
pub use memory::MemorySink;
pub use stats::{print_statistics, CrawlStatistics, RunStatus, StatisticsSnapshot};
pub use traits::{OutputError, OutputResult, RowSink};
