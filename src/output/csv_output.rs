//! CSV file sink
//!
//! One file per level, header first. Each row is flushed as soon as it is
//! written, so a run that dies halfway still leaves readable files.

use crate::hierarchy::{Level, Row};
use crate::output::traits::{OutputError, OutputResult, RowSink};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Streams rows of one level into `<directory>/<level>.csv`
pub struct CsvSink {
    level: Level,
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl CsvSink {
    /// Creates (or truncates) the level's file and writes its header
    pub fn create(directory: &Path, level: Level) -> OutputResult<Self> {
        std::fs::create_dir_all(directory)?;
        let path = directory.join(level.file_name());

        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(level.header())?;
        writer.flush()?;

        tracing::debug!("Opened {} sink at {}", level, path.display());

        Ok(Self {
            level,
            path,
            writer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RowSink for CsvSink {
    fn write_row(&mut self, row: &Row) -> OutputResult<()> {
        if row.level != self.level {
            return Err(OutputError::Write(format!(
                "{} row sent to the {} file",
                row.level, self.level
            )));
        }

        self.writer.write_record(&row.fields)?;
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
