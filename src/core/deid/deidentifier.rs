//! Streaming de-identification
//!
//! One pass reads an encounter or fact file row by row, validates each row, replaces its
//! identifiers with surrogate keys and routes it to the de-identified file or to the error
//! file. Valid rows are written in batches; error rows are held until the pass ends or the
//! error budget runs out, then written in input order.

use crate::config::PipelineConfig;
use crate::core::deid::reader::{open_records, unreadable_row};
use crate::core::deid::summary::{PassKind, PassOutcome, PassSummary};
use crate::core::deid::writer::{BatchWriter, OutputFormat};
use crate::core::validate::{KeyLookup, RecordValidator};
use crate::domain::errors::ValidationError;
use crate::domain::record::RecordKind;
use crate::domain::{DeidError, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Extra columns of the error file
pub const ERROR_COLUMNS: [&str; 2] = ["ValidationError", "ErrorRowNumber"];

/// Settings of one de-identification pass
#[derive(Debug, Clone)]
pub struct PassConfig {
    pub input_delimiter: u8,
    pub output_delimiter: u8,
    /// Invalid rows tolerated; one more aborts the pass
    pub max_validation_error_count: usize,
    pub write_batch_size: usize,
    pub dry_run: bool,
}

impl PassConfig {
    pub fn from_config(pipeline: &PipelineConfig, dry_run: bool) -> Self {
        Self {
            input_delimiter: pipeline.input_delimiter_byte(),
            output_delimiter: pipeline.output_delimiter_byte(),
            max_validation_error_count: pipeline.max_validation_error_count,
            write_batch_size: pipeline.write_batch_size,
            dry_run,
        }
    }
}

/// Output files of a de-identification pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeidOutputs {
    /// Valid rows, same schema as the input
    pub deid: PathBuf,
    /// Invalid rows with their validation messages and row numbers
    pub errors: PathBuf,
}

impl DeidOutputs {
    /// Default layout next to the input file:
    /// `deid/<kind>.csv` and `logs/error_deid_<kind>.csv`
    pub fn beside(input: &Path, kind: RecordKind) -> Self {
        let dir = input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self {
            deid: dir.join("deid").join(format!("{}.csv", kind.as_str())),
            errors: dir
                .join("logs")
                .join(format!("error_deid_{}.csv", kind.as_str())),
        }
    }
}

/// Runs de-identification passes
pub struct StreamDeidentifier {
    config: PassConfig,
}

impl StreamDeidentifier {
    pub fn new(config: PassConfig) -> Self {
        Self { config }
    }

    /// De-identifies `input` into `outputs`
    ///
    /// Both output files are truncated and given their header before the first row is
    /// read. The pass stops as soon as the number of invalid rows exceeds
    /// `max_validation_error_count`; everything buffered up to that row is written first.
    ///
    /// # Errors
    ///
    /// - [`DeidError::MalformedInput`] if the input is missing, its header lacks a required
    ///   column, or a row can't be read
    /// - [`DeidError::ErrorBudgetExceeded`] when the pass aborts on the error budget
    /// - an I/O error if an output file can't be written
    pub fn run<R: RecordValidator>(
        &self,
        input: &Path,
        outputs: &DeidOutputs,
        keys: &dyn KeyLookup,
    ) -> Result<PassSummary> {
        let start = Instant::now();
        let kind = R::KIND;
        let mut summary = PassSummary::new(PassKind::Deidentify, input);
        summary.dry_run = self.config.dry_run;

        let mut reader = open_records(input, self.config.input_delimiter, kind)?;

        let header = kind.header();
        let mut valid = BatchWriter::create(
            &outputs.deid,
            &OutputFormat::delimited(self.config.output_delimiter, header),
            self.config.write_batch_size,
        )?;
        let error_header: Vec<&str> = header.iter().chain(ERROR_COLUMNS.iter()).copied().collect();
        // Error rows stay buffered until the pass ends
        let mut errors = BatchWriter::create(
            &outputs.errors,
            &OutputFormat::quoted_csv(&error_header),
            usize::MAX,
        )?;
        summary.add_output(&outputs.deid);
        summary.add_output(&outputs.errors);

        tracing::info!(
            kind = %kind,
            input = %input.display(),
            max_errors = self.config.max_validation_error_count,
            batch_size = self.config.write_batch_size,
            "Starting de-identification pass"
        );

        for (index, result) in reader.deserialize::<R>().enumerate() {
            let row_number = index + 1;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    valid.flush()?;
                    errors.flush()?;
                    return Err(unreadable_row(input, row_number, e));
                }
            };
            summary.rows_read = row_number;

            let validated = record.validate(keys);
            let mut row: Vec<String> = validated
                .record
                .fields()
                .into_iter()
                .map(str::to_string)
                .collect();

            if validated.is_valid() {
                valid.push(row)?;
                summary.valid_rows += 1;
                continue;
            }

            let failure = ValidationError::new(row_number, validated.messages);
            tracing::debug!(kind = %kind, row = row_number, errors = %failure.joined(), "Row failed validation");
            row.push(failure.joined());
            row.push(row_number.to_string());
            errors.push(row)?;
            summary.invalid_rows += 1;

            if summary.invalid_rows > self.config.max_validation_error_count {
                valid.flush()?;
                errors.flush()?;

                summary.outcome = PassOutcome::Aborted;
                let summary = summary.with_duration(start.elapsed());
                summary.log_summary();
                tracing::error!(
                    kind = %kind,
                    max_errors = self.config.max_validation_error_count,
                    row = row_number,
                    "Exiting de-identification as max error records limit reached"
                );

                return Err(DeidError::ErrorBudgetExceeded {
                    max_errors: self.config.max_validation_error_count,
                    observed: summary.invalid_rows,
                });
            }
        }

        valid.finish()?;
        errors.finish()?;

        summary.outcome = PassOutcome::Completed;
        let summary = summary.with_duration(start.elapsed());
        summary.log_summary();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{MappingDomain, SurrogateKey};
    use crate::domain::record::{EncounterRecord, FactRecord};
    use std::fs;
    use tempfile::TempDir;

    const ENCOUNTERS: &str =
        "EncounterID,PatientID,StartDate,EndDate,ActivityTypeCD,ActivityStatusCD,ProgramCD";

    fn keys(domain: MappingDomain, id: &str) -> Option<SurrogateKey> {
        let key = match (domain, id) {
            (MappingDomain::Patient, "P1") => 100,
            (MappingDomain::Patient, "P2") => 101,
            (MappingDomain::Encounter, "E1") => 1,
            (MappingDomain::Encounter, "E2") => 2,
            _ => return None,
        };
        SurrogateKey::new(key).ok()
    }

    fn config(max_errors: usize, batch: usize) -> PassConfig {
        PassConfig {
            input_delimiter: b',',
            output_delimiter: b',',
            max_validation_error_count: max_errors,
            write_batch_size: batch,
            dry_run: false,
        }
    }

    fn write_input(dir: &TempDir, name: &str, header: &str, rows: &[&str]) -> PathBuf {
        let path = dir.path().join(name);
        let mut content = format!("{header}\n");
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_outputs_beside_input() {
        let outputs = DeidOutputs::beside(Path::new("/data/in/visits.csv"), RecordKind::Encounters);
        assert_eq!(outputs.deid, PathBuf::from("/data/in/deid/encounters.csv"));
        assert_eq!(
            outputs.errors,
            PathBuf::from("/data/in/logs/error_deid_encounters.csv")
        );

        let outputs = DeidOutputs::beside(Path::new("facts.csv"), RecordKind::Facts);
        assert_eq!(outputs.deid, PathBuf::from("./deid/facts.csv"));
    }

    #[test]
    fn test_routes_valid_and_invalid_rows() {
        let dir = TempDir::new().unwrap();
        let input = write_input(
            &dir,
            "encounters.csv",
            ENCOUNTERS,
            &[
                "E1,P1,2024-01-01 08:00:00,2024-01-02 08:00:00,IN,A,PRG",
                "E9,P2,,,,,",
                "E2,P2,,,OUT,,",
            ],
        );
        let outputs = DeidOutputs::beside(&input, RecordKind::Encounters);

        let summary = StreamDeidentifier::new(config(10, 100))
            .run::<EncounterRecord>(&input, &outputs, &keys)
            .unwrap();

        assert_eq!(summary.rows_read, 3);
        assert_eq!(summary.valid_rows, 2);
        assert_eq!(summary.invalid_rows, 1);
        assert_eq!(summary.outcome, PassOutcome::Completed);

        assert_eq!(
            fs::read_to_string(&outputs.deid).unwrap(),
            format!("{ENCOUNTERS}\n1,100,2024-01-01 08:00:00,2024-01-02 08:00:00,IN,A,PRG\n2,101,,,OUT,,\n")
        );
        assert_eq!(
            fs::read_to_string(&outputs.errors).unwrap(),
            "\"EncounterID\",\"PatientID\",\"StartDate\",\"EndDate\",\"ActivityTypeCD\",\"ActivityStatusCD\",\"ProgramCD\",\"ValidationError\",\"ErrorRowNumber\"\n\
             \"E9\",\"101\",\"\",\"\",\"\",\"\",\"\",\"Encounter mapping not found\",\"2\"\n"
        );
    }

    #[test]
    fn test_aborts_one_past_the_budget() {
        let dir = TempDir::new().unwrap();
        let input = write_input(
            &dir,
            "encounters.csv",
            ENCOUNTERS,
            &["E1,P1,,,,,", "X1,,,,,,", "X2,,,,,,", "E2,P2,,,,,", "X3,,,,,,", "X4,,,,,,"],
        );
        let outputs = DeidOutputs::beside(&input, RecordKind::Encounters);

        let err = StreamDeidentifier::new(config(2, 100))
            .run::<EncounterRecord>(&input, &outputs, &keys)
            .unwrap_err();
        assert!(matches!(
            err,
            DeidError::ErrorBudgetExceeded {
                max_errors: 2,
                observed: 3
            }
        ));

        let valid = fs::read_to_string(&outputs.deid).unwrap();
        assert_eq!(valid.lines().count(), 3);

        let mut reader = csv::Reader::from_path(&outputs.errors).unwrap();
        let row_numbers: Vec<String> = reader
            .records()
            .map(|r| r.unwrap().get(8).unwrap().to_string())
            .collect();
        assert_eq!(row_numbers, vec!["2", "3", "5"]);
    }

    #[test]
    fn test_fact_defaults_and_output_delimiter() {
        let dir = TempDir::new().unwrap();
        let input = write_input(
            &dir,
            "facts.csv",
            "EncounterID|PatientID|ConceptCD|ProviderID|StartDate|ModifierCD|InstanceNum|value|UnitCD",
            &["|P1|LOINC:1||2024-01-01 10:00:00|||7.5|mg"],
        );
        let outputs = DeidOutputs::beside(&input, RecordKind::Facts);
        let mut cfg = config(0, 100);
        cfg.input_delimiter = b'|';
        cfg.output_delimiter = b'\t';

        let summary = StreamDeidentifier::new(cfg)
            .run::<FactRecord>(&input, &outputs, &keys)
            .unwrap();
        assert!(summary.is_successful());

        let content = fs::read_to_string(&outputs.deid).unwrap();
        assert_eq!(
            content.lines().nth(1).unwrap(),
            "0\t100\tLOINC:1\t0\t2024-01-01 10:00:00\t@\t1\t7.5\tmg"
        );
    }

    #[test]
    fn test_outputs_truncated_on_rerun() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "encounters.csv", ENCOUNTERS, &["E1,P1,,,,,"]);
        let outputs = DeidOutputs::beside(&input, RecordKind::Encounters);
        let deidentifier = StreamDeidentifier::new(config(0, 100));

        deidentifier.run::<EncounterRecord>(&input, &outputs, &keys).unwrap();
        deidentifier.run::<EncounterRecord>(&input, &outputs, &keys).unwrap();

        assert_eq!(fs::read_to_string(&outputs.deid).unwrap().lines().count(), 2);
        assert_eq!(fs::read_to_string(&outputs.errors).unwrap().lines().count(), 1);
    }
}
