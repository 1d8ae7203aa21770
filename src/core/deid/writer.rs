//! Batched delimited output

use crate::domain::Result;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Quoting of an output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    /// Quote only fields that need it
    Necessary,
    /// Quote every field
    Always,
}

impl From<Quoting> for csv::QuoteStyle {
    fn from(q: Quoting) -> Self {
        match q {
            Quoting::Necessary => csv::QuoteStyle::Necessary,
            Quoting::Always => csv::QuoteStyle::Always,
        }
    }
}

/// Layout of one output file
#[derive(Debug, Clone)]
pub struct OutputFormat {
    pub delimiter: u8,
    pub quoting: Quoting,
    /// Header row written once when the file is created; `None` for headerless files
    pub header: Option<Vec<String>>,
}

impl OutputFormat {
    pub fn delimited(delimiter: u8, header: &[&str]) -> Self {
        Self {
            delimiter,
            quoting: Quoting::Necessary,
            header: Some(header.iter().map(|h| h.to_string()).collect()),
        }
    }

    /// Comma-delimited, every field quoted
    pub fn quoted_csv(header: &[&str]) -> Self {
        Self {
            delimiter: b',',
            quoting: Quoting::Always,
            header: Some(header.iter().map(|h| h.to_string()).collect()),
        }
    }

    pub fn headerless(delimiter: u8) -> Self {
        Self {
            delimiter,
            quoting: Quoting::Necessary,
            header: None,
        }
    }
}

/// Buffers rows of one output file and writes them a batch at a time
///
/// Creating a writer truncates the target file and writes the header, so an output file
/// always exists with its header even when no row reaches it. Rows are written in the
/// order they were pushed, field by field, without inspection.
pub struct BatchWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows: Vec<Vec<String>>,
    batch_size: usize,
    written: usize,
}

impl BatchWriter {
    /// Creates (or truncates) `path` and writes the header, if any
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file can't be created or the header can't be written.
    pub fn create(path: impl Into<PathBuf>, format: &OutputFormat, batch_size: usize) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(format.delimiter)
            .quote_style(format.quoting.into())
            .terminator(csv::Terminator::Any(b'\n'))
            .has_headers(false)
            .flexible(true)
            .from_path(&path)?;

        if let Some(header) = &format.header {
            writer.write_record(header)?;
            writer.flush()?;
        }

        tracing::debug!(path = %path.display(), "Output file created");

        Ok(Self {
            path,
            writer,
            rows: Vec::new(),
            batch_size: batch_size.max(1),
            written: 0,
        })
    }

    /// Buffers a row and writes the batch once it is full
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a triggered flush fails.
    pub fn push(&mut self, row: Vec<String>) -> Result<()> {
        self.rows.push(row);
        if self.rows.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Writes every buffered row
    ///
    /// # Returns
    ///
    /// Returns the number of rows written by this call.
    pub fn flush(&mut self) -> Result<usize> {
        let count = self.rows.len();
        for row in self.rows.drain(..) {
            self.writer.write_record(&row)?;
        }
        self.writer.flush()?;
        self.written += count;

        if count > 0 {
            tracing::debug!(path = %self.path.display(), rows = count, total = self.written, "Flushed batch");
        }
        Ok(count)
    }

    /// Flushes the remaining rows and returns the total written
    pub fn finish(mut self) -> Result<usize> {
        self.flush()?;
        Ok(self.written)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows buffered but not yet written
    pub fn buffered(&self) -> usize {
        self.rows.len()
    }

    /// Rows written so far
    pub fn written(&self) -> usize {
        self.written
    }
}
