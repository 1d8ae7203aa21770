//! Pass summary and reporting
//!
//! This module defines the counters every pass keeps and logs when it ends.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Kind of pass a summary belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Patient MRN file → patient mapping
    PatientMapping,
    /// Encounter file → encounter mapping
    EncounterMapping,
    /// De-identification of an encounter or fact file
    Deidentify,
    /// De-identified file → headerless bulk-load file
    BulkTransform,
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PassKind::PatientMapping => "patient mapping",
            PassKind::EncounterMapping => "encounter mapping",
            PassKind::Deidentify => "de-identification",
            PassKind::BulkTransform => "bulk transform",
        };
        f.write_str(name)
    }
}

/// How a pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Running,
    Completed,
    /// Stopped because the invalid row count went past the configured maximum
    Aborted,
}

/// Summary of one pass over one input file
#[derive(Debug, Clone)]
pub struct PassSummary {
    pub kind: PassKind,

    /// Input file of the pass
    pub input: PathBuf,

    /// Data rows read (header excluded)
    pub rows_read: usize,

    /// Rows written to the valid or bulk-load output
    pub valid_rows: usize,

    /// Rows routed to the error output (or unreadable rows in a transform)
    pub invalid_rows: usize,

    /// Rows a mapping pass ignored (no usable identifier)
    pub skipped_rows: usize,

    /// New surrogate keys allocated
    pub keys_allocated: usize,

    /// Mapping entries appended (or that would have been in dry-run mode)
    pub entries_appended: usize,

    /// Output files written by the pass
    pub outputs: Vec<PathBuf>,

    pub outcome: PassOutcome,

    pub dry_run: bool,

    pub duration: Duration,
}

impl PassSummary {
    /// Create a new empty summary for a pass over `input`
    pub fn new(kind: PassKind, input: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            input: input.into(),
            rows_read: 0,
            valid_rows: 0,
            invalid_rows: 0,
            skipped_rows: 0,
            keys_allocated: 0,
            entries_appended: 0,
            outputs: Vec::new(),
            outcome: PassOutcome::Running,
            dry_run: false,
            duration: Duration::from_secs(0),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn add_output(&mut self, path: impl Into<PathBuf>) {
        self.outputs.push(path.into());
    }

    /// Check if the pass completed without invalid rows
    pub fn is_successful(&self) -> bool {
        self.outcome == PassOutcome::Completed && self.invalid_rows == 0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        let input = self.input.display().to_string();
        match self.outcome {
            PassOutcome::Aborted => tracing::error!(
                pass = %self.kind,
                input = %input,
                rows_read = self.rows_read,
                valid = self.valid_rows,
                invalid = self.invalid_rows,
                duration_ms = self.duration.as_millis() as u64,
                "Pass aborted"
            ),
            _ => tracing::info!(
                pass = %self.kind,
                input = %input,
                rows_read = self.rows_read,
                valid = self.valid_rows,
                invalid = self.invalid_rows,
                skipped = self.skipped_rows,
                keys_allocated = self.keys_allocated,
                entries_appended = self.entries_appended,
                dry_run = self.dry_run,
                duration_ms = self.duration.as_millis() as u64,
                "Pass completed"
            ),
        }

        for output in &self.outputs {
            tracing::info!(pass = %self.kind, output = %output.display(), "Output written");
        }
    }
}
