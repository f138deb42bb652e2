//! Crawl statistics
//!
//! Counters are updated concurrently from every traversal branch and read once
//! at the end of a run for the summary printed to stdout.

use crate::hierarchy::Level;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every reachable branch was visited
    Completed,

    /// The run was cancelled; rows written so far are kept
    Interrupted,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }
}

/// Live counters for one portal run
#[derive(Debug)]
pub struct CrawlStatistics {
    started_at: DateTime<Utc>,

    /// Rows emitted, per level
    rows: [AtomicU64; 5],

    /// Parents whose child list came back empty, per child level
    empty: [AtomicU64; 5],

    /// Parents whose request failed after all retries, per child level
    unavailable: [AtomicU64; 5],

    /// Children skipped for an invalid identifier
    skipped_ids: AtomicU64,

    /// Rows that could not be written
    sink_errors: AtomicU64,
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            rows: Default::default(),
            empty: Default::default(),
            unavailable: Default::default(),
            skipped_ids: AtomicU64::new(0),
            sink_errors: AtomicU64::new(0),
        }
    }

    pub fn record_row(&self, level: Level) {
        self.rows[level.depth()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_empty(&self, child_level: Level) {
        self.empty[child_level.depth()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unavailable(&self, child_level: Level) {
        self.unavailable[child_level.depth()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self, count: usize) {
        self.skipped_ids.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_sink_error(&self) {
        self.sink_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rows(&self, level: Level) -> u64 {
        self.rows[level.depth()].load(Ordering::Relaxed)
    }

    /// Freezes the counters into a snapshot
    pub fn snapshot(&self, status: RunStatus) -> StatisticsSnapshot {
        let load = |counters: &[AtomicU64; 5]| -> [u64; 5] {
            std::array::from_fn(|i| counters[i].load(Ordering::Relaxed))
        };
        let finished_at = Utc::now();

        StatisticsSnapshot {
            started_at: self.started_at,
            finished_at,
            duration_seconds: (finished_at - self.started_at).num_seconds().max(0) as u64,
            status,
            rows: load(&self.rows),
            empty: load(&self.empty),
            unavailable: load(&self.unavailable),
            skipped_ids: self.skipped_ids.load(Ordering::Relaxed),
            sink_errors: self.sink_errors.load(Ordering::Relaxed),
        }
    }
}

impl Default for CrawlStatistics {
    fn default() -> Self {
        Self::new()
    }
}

/// Frozen statistics of a finished run
#[derive(Debug, Clone)]
pub struct StatisticsSnapshot {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub status: RunStatus,
    pub rows: [u64; 5],
    pub empty: [u64; 5],
    pub unavailable: [u64; 5],
    pub skipped_ids: u64,
    pub sink_errors: u64,
}

impl StatisticsSnapshot {
    pub fn rows(&self, level: Level) -> u64 {
        self.rows[level.depth()]
    }

    pub fn empty(&self, level: Level) -> u64 {
        self.empty[level.depth()]
    }

    pub fn unavailable(&self, level: Level) -> u64 {
        self.unavailable[level.depth()]
    }

    pub fn total_rows(&self) -> u64 {
        self.rows.iter().sum()
    }
}

/// Prints statistics to stdout in a human-readable format
pub fn print_statistics(portal: &str, stats: &StatisticsSnapshot) {
    println!("=== Harvest Statistics: {} ===\n", portal);

    println!("Run:");
    println!("  Status: {}", stats.status.as_str());
    println!("  Started: {}", stats.started_at.to_rfc3339());
    println!("  Finished: {}", stats.finished_at.to_rfc3339());
    println!("  Duration: {}s", stats.duration_seconds);
    println!();

    println!("Rows by level:");
    for level in Level::ALL {
        println!("  {:<10} {}", format!("{}:", level), stats.rows(level));
    }
    println!("  {:<10} {}", "Total:", stats.total_rows());
    println!();

    let has_gaps = Level::ALL
        .iter()
        .any(|l| stats.empty(*l) > 0 || stats.unavailable(*l) > 0);
    if has_gaps {
        println!("Branches without children:");
        for level in Level::ALL {
            let (empty, unavailable) = (stats.empty(level), stats.unavailable(level));
            if empty > 0 || unavailable > 0 {
                println!(
                    "  {:<10} {} empty, {} unavailable after retries",
                    format!("{}:", level),
                    empty,
                    unavailable
                );
            }
        }
        println!();
    }

    if stats.skipped_ids > 0 {
        println!("Skipped invalid identifiers: {}", stats.skipped_ids);
    }
    if stats.sink_errors > 0 {
        println!("Rows lost to write errors: {}", stats.sink_errors);
    }
}
