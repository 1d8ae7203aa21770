//! Bulk-load transform
//!
//! Turns a de-identified file into the headerless, fixed-column file the bulk-copy tool
//! loads into the visit dimension or observation fact table.

use crate::core::deid::reader::open_strict_records;
use crate::core::deid::summary::{PassKind, PassOutcome, PassSummary};
use crate::core::deid::writer::{BatchWriter, OutputFormat};
use crate::core::deid::PassConfig;
use crate::domain::record::{EncounterRecord, FactRecord, InputRecord, DATE_FORMAT};
use crate::domain::{DeidError, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Column order of the visit dimension bulk-load file
pub const VISIT_DIMENSION_COLUMNS: [&str; 18] = [
    "EncounterID",
    "PatientID",
    "ActiveStatusCd",
    "StartDate",
    "EndDate",
    "InOutCd",
    "LocationCd",
    "LocationPath",
    "LengthOfStay",
    "VisitBlob",
    "UpdateDate",
    "DownloadDate",
    "ImportDate",
    "SourceSystemCd",
    "UploadId",
    "ActivityTypeCD",
    "ActivityStatusCD",
    "ProgramCD",
];

/// Column order of the observation fact bulk-load file
pub const OBSERVATION_FACT_COLUMNS: [&str; 24] = [
    "LINE_NUM",
    "EncounterID",
    "PatientID",
    "ConceptCD",
    "ProviderID",
    "StartDate",
    "ModifierCD",
    "InstanceNum",
    "VALTYPE_CD",
    "TVAL_CHAR",
    "NVAL_NUM",
    "VALUEFLAG_CD",
    "QUANTITY_NUM",
    "UnitCD",
    "END_DATE",
    "LOCATION_CD",
    "OBSERVATION_BLOB",
    "CONFIDENCE_NUM",
    "UPDATE_DATE",
    "DOWNLOAD_DATE",
    "IMPORT_DATE",
    "SOURCESYSTEM_CD",
    "UPLOAD_ID",
    "TEXT_SEARCH_INDEX",
];

const NVAL_NUM_WIDTH: usize = 10;

/// A de-identified record that maps onto one bulk-load row
pub trait BulkRecord: InputRecord {
    /// Name of the bulk-load file, without extension
    const TABLE: &'static str;

    /// Fields of the bulk-load row for data row `line_num`
    fn bulk_row(self, line_num: usize, import_date: &str) -> Vec<String>;
}

impl BulkRecord for EncounterRecord {
    const TABLE: &'static str = "visit_dimension";

    fn bulk_row(self, _line_num: usize, import_date: &str) -> Vec<String> {
        let empty = String::new;
        vec![
            self.encounter_id,
            self.patient_id,
            empty(),
            self.start_date,
            self.end_date,
            empty(),
            empty(),
            empty(),
            empty(),
            empty(),
            empty(),
            empty(),
            import_date.to_string(),
            empty(),
            empty(),
            self.activity_type_cd,
            self.activity_status_cd,
            self.program_cd,
        ]
    }
}

/// Value type of an observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationValue {
    pub valtype_cd: &'static str,
    pub tval_char: String,
    pub nval_num: String,
}

impl ObservationValue {
    /// Classifies a raw `value` field
    ///
    /// Finite numbers are numeric (`N`, `E`, the value cut to 10 characters), an empty value
    /// has no type (`@`), anything else is text (`T`).
    pub fn classify(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Self {
                valtype_cd: "@",
                tval_char: String::new(),
                nval_num: String::new(),
            };
        }

        match trimmed.parse::<f64>() {
            Ok(number) if number.is_finite() => Self {
                valtype_cd: "N",
                tval_char: "E".to_string(),
                nval_num: trimmed.chars().take(NVAL_NUM_WIDTH).collect(),
            },
            _ => Self {
                valtype_cd: "T",
                tval_char: value.to_string(),
                nval_num: String::new(),
            },
        }
    }
}

impl BulkRecord for FactRecord {
    const TABLE: &'static str = "observation_fact";

    fn bulk_row(self, line_num: usize, import_date: &str) -> Vec<String> {
        let value = ObservationValue::classify(&self.value);
        let empty = String::new;
        vec![
            line_num.to_string(),
            self.encounter_id,
            self.patient_id,
            self.concept_cd,
            self.provider_id,
            self.start_date,
            self.modifier_cd,
            self.instance_num,
            value.valtype_cd.to_string(),
            value.tval_char,
            value.nval_num,
            empty(),
            empty(),
            self.unit_cd,
            empty(),
            empty(),
            empty(),
            empty(),
            empty(),
            empty(),
            import_date.to_string(),
            empty(),
            empty(),
            "1".to_string(),
        ]
    }
}

/// Writes bulk-load files from de-identified files
pub struct BulkTransform {
    delimiter: u8,
    max_errors: usize,
    batch_size: usize,
    import_date: String,
}

impl BulkTransform {
    /// De-identified files are read and bulk-load files written with the output delimiter
    pub fn new(config: &PassConfig, import_timestamp: DateTime<Utc>) -> Self {
        Self {
            delimiter: config.output_delimiter,
            max_errors: config.max_validation_error_count,
            batch_size: config.write_batch_size,
            import_date: import_timestamp.format(DATE_FORMAT).to_string(),
        }
    }

    /// Bulk-load file of `deid_file`: `bcp/<table>.bcp` in the same directory
    pub fn output_path<R: BulkRecord>(deid_file: &Path) -> PathBuf {
        let dir = deid_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        dir.join("bcp").join(format!("{}.bcp", R::TABLE))
    }

    /// Transforms `deid_file` into its bulk-load file
    ///
    /// Unreadable rows are skipped and logged; once more than the configured maximum were
    /// skipped the transform stops.
    ///
    /// # Errors
    ///
    /// - [`DeidError::MalformedInput`] if the file is missing or its header is incomplete
    /// - [`DeidError::ErrorBudgetExceeded`] when too many rows are unreadable
    pub fn run<R: BulkRecord>(&self, deid_file: &Path) -> Result<PassSummary> {
        let start = Instant::now();
        let output = Self::output_path::<R>(deid_file);
        let mut summary = PassSummary::new(PassKind::BulkTransform, deid_file);

        let mut reader = open_strict_records(deid_file, self.delimiter, R::KIND)?;
        let mut writer = BatchWriter::create(
            &output,
            &OutputFormat::headerless(self.delimiter),
            self.batch_size,
        )?;
        summary.add_output(&output);

        tracing::info!(
            input = %deid_file.display(),
            output = %output.display(),
            table = R::TABLE,
            "Starting bulk transform"
        );

        for (index, result) in reader.deserialize::<R>().enumerate() {
            let line_num = index + 1;
            summary.rows_read = line_num;

            match result {
                Ok(record) => {
                    writer.push(record.bulk_row(line_num, &self.import_date))?;
                    summary.valid_rows += 1;
                }
                Err(e) => {
                    tracing::warn!(row = line_num, error = %e, "Skipping unreadable row");
                    summary.invalid_rows += 1;

                    if summary.invalid_rows > self.max_errors {
                        writer.flush()?;
                        summary.outcome = PassOutcome::Aborted;
                        let summary = summary.with_duration(start.elapsed());
                        summary.log_summary();
                        return Err(DeidError::ErrorBudgetExceeded {
                            max_errors: self.max_errors,
                            observed: summary.invalid_rows,
                        });
                    }
                }
            }
        }

        writer.finish()?;

        summary.outcome = PassOutcome::Completed;
        let summary = summary.with_duration(start.elapsed());
        summary.log_summary();
        Ok(summary)
    }
}
