//! Delimited input files

use crate::domain::record::RecordKind;
use crate::domain::{DeidError, Result};
use std::fs::File;
use std::path::Path;

/// Opens a delimited file whose first row is a header
///
/// Short and long rows are tolerated; a missing trailing field reads as empty. Header
/// names are trimmed, field values are not.
///
/// # Errors
///
/// Returns [`DeidError::MalformedInput`] if the file is missing or can't be opened.
pub fn open_input(path: &Path, delimiter: u8) -> Result<csv::Reader<File>> {
    build_reader(path, delimiter, true)
}

fn build_reader(path: &Path, delimiter: u8, flexible: bool) -> Result<csv::Reader<File>> {
    if !path.is_file() {
        return Err(DeidError::MalformedInput(format!(
            "Input file not found: {}",
            path.display()
        )));
    }

    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .flexible(flexible)
        .from_path(path)
        .map_err(|e| {
            DeidError::MalformedInput(format!("Failed to open {}: {}", path.display(), e))
        })
}

/// Opens a record file and checks its header against `kind`
///
/// # Errors
///
/// Returns [`DeidError::MalformedInput`] if the file can't be opened, its header can't be
/// read or a required column is missing.
pub fn open_records(path: &Path, delimiter: u8, kind: RecordKind) -> Result<csv::Reader<File>> {
    checked(build_reader(path, delimiter, true)?, path, kind)
}

/// Like [`open_records`], but a row whose field count differs from the header fails to read
pub fn open_strict_records(
    path: &Path,
    delimiter: u8,
    kind: RecordKind,
) -> Result<csv::Reader<File>> {
    checked(build_reader(path, delimiter, false)?, path, kind)
}

fn checked(
    mut reader: csv::Reader<File>,
    path: &Path,
    kind: RecordKind,
) -> Result<csv::Reader<File>> {
    let header = reader.headers().map_err(|e| {
        DeidError::MalformedInput(format!(
            "Failed to read header of {}: {}",
            path.display(),
            e
        ))
    })?;
    kind.check_header(header)?;
    Ok(reader)
}

/// Converts a row read failure into a fatal input error
pub(crate) fn unreadable_row(path: &Path, row_number: usize, err: csv::Error) -> DeidError {
    DeidError::MalformedInput(format!(
        "Unreadable row {} in {}: {}",
        row_number,
        path.display(),
        err
    ))
}
