//! Mapping passes
//!
//! A mapping pass reads one input file and assigns surrogate keys to every external id it
//! hasn't seen before. The patient pass reads an MRN file, the encounter pass reads the
//! encounter file ahead of its de-identification.

use crate::config::PipelineConfig;
use crate::core::deid::reader::{open_input, open_records, unreadable_row};
use crate::core::deid::summary::{PassKind, PassOutcome, PassSummary};
use crate::core::mapping::allocator::SurrogateKeyAllocator;
use crate::core::mapping::store::IdentityMappingStore;
use crate::domain::ids::{ExternalId, MappingDomain};
use crate::domain::mapping::MappingEntry;
use crate::domain::record::{EncounterRecord, PatientAliasRecord, RecordKind};
use crate::domain::{DeidError, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Instant;

/// Values stamped on every entry a mapping pass creates
#[derive(Debug, Clone)]
pub struct MappingPassContext {
    pub source_system_code: String,
    pub project_id: String,
    pub input_delimiter: u8,
    pub import_timestamp: DateTime<Utc>,
}

impl MappingPassContext {
    pub fn from_config(pipeline: &PipelineConfig, import_timestamp: DateTime<Utc>) -> Self {
        Self {
            source_system_code: pipeline.source_system_code.clone(),
            project_id: pipeline.project_id.clone(),
            input_delimiter: pipeline.input_delimiter_byte(),
            import_timestamp,
        }
    }
}

/// Assigns patient surrogate keys from an MRN file
///
/// The header names the source system of each alias column. All aliases of one row share
/// one key: the key of the last already-mapped alias in column order, or a new one when
/// none is mapped. Rows without any alias are skipped.
///
/// # Errors
///
/// Returns [`DeidError::MalformedInput`] for a missing or unreadable file and a storage
/// error if an append fails. Entries appended before the failure stay persisted.
pub async fn map_patients(
    path: &Path,
    store: &mut IdentityMappingStore,
    allocator: &mut SurrogateKeyAllocator,
    ctx: &MappingPassContext,
) -> Result<PassSummary> {
    expect_domain(store, allocator, MappingDomain::Patient)?;

    let start = Instant::now();
    let mut summary = PassSummary::new(PassKind::PatientMapping, path);
    summary.dry_run = store.is_dry_run();
    let appended_before = store.appended();

    let mut reader = open_input(path, ctx.input_delimiter)?;
    let sources = reader
        .headers()
        .map_err(|e| {
            DeidError::MalformedInput(format!("Failed to read header of {}: {}", path.display(), e))
        })?
        .clone();
    if sources.iter().all(|s| s.trim().is_empty()) {
        return Err(DeidError::MalformedInput(format!(
            "MRN file {} has no source system columns",
            path.display()
        )));
    }

    tracing::info!(
        input = %path.display(),
        sources = sources.len(),
        start_key = allocator.current() + 1,
        "Starting patient mapping pass"
    );

    let mut row = csv::StringRecord::new();
    loop {
        let row_number = summary.rows_read + 1;
        match reader.read_record(&mut row) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                store.flush().await?;
                return Err(unreadable_row(path, row_number, e));
            }
        }
        summary.rows_read = row_number;

        let record = PatientAliasRecord::from_row(&sources, &row);
        if record.is_empty() {
            tracing::debug!(row = row_number, "Skipping MRN row without aliases");
            summary.skipped_rows += 1;
            continue;
        }

        let aliases: Vec<(&str, ExternalId)> = record
            .aliases
            .iter()
            .filter_map(|(source, alias)| {
                ExternalId::parse_optional(alias).map(|id| (source.as_str(), id))
            })
            .collect();

        let mapped: Vec<_> = aliases
            .iter()
            .filter_map(|(_, id)| store.lookup(id))
            .collect();

        let key = match mapped.last() {
            Some(&key) => {
                if mapped.iter().any(|k| *k != key) {
                    tracing::warn!(
                        row = row_number,
                        kept_key = key.get(),
                        "Aliases of one patient map to different keys; keeping the last"
                    );
                }
                key
            }
            None => {
                summary.keys_allocated += 1;
                allocator.next_key()
            }
        };

        for (source, id) in aliases {
            if store.lookup(&id).is_some() {
                continue;
            }
            store
                .record(MappingEntry::patient(
                    id,
                    key,
                    source,
                    ctx.project_id.as_str(),
                    ctx.import_timestamp,
                ))
                .await?;
        }
    }

    store.flush().await?;

    summary.valid_rows = summary.rows_read - summary.skipped_rows;
    summary.entries_appended = store.appended() - appended_before;
    summary.outcome = PassOutcome::Completed;
    let summary = summary.with_duration(start.elapsed());
    summary.log_summary();
    Ok(summary)
}

/// Assigns encounter surrogate keys from an encounter file
///
/// Rows with an empty EncounterID or PatientID are skipped; the de-identification pass
/// reports them. Repeats of an EncounterID within the file keep the key of the first row.
///
/// # Errors
///
/// Returns [`DeidError::MalformedInput`] if the file is missing or lacks a required column,
/// and a storage error if an append fails.
pub async fn map_encounters(
    path: &Path,
    store: &mut IdentityMappingStore,
    allocator: &mut SurrogateKeyAllocator,
    ctx: &MappingPassContext,
) -> Result<PassSummary> {
    expect_domain(store, allocator, MappingDomain::Encounter)?;

    let start = Instant::now();
    let mut summary = PassSummary::new(PassKind::EncounterMapping, path);
    summary.dry_run = store.is_dry_run();
    let appended_before = store.appended();

    let mut reader = open_records(path, ctx.input_delimiter, RecordKind::Encounters)?;

    tracing::info!(
        input = %path.display(),
        start_key = allocator.current() + 1,
        "Starting encounter mapping pass"
    );

    for (index, result) in reader.deserialize::<EncounterRecord>().enumerate() {
        let row_number = index + 1;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                store.flush().await?;
                return Err(unreadable_row(path, row_number, e));
            }
        };
        summary.rows_read = row_number;

        let (Some(encounter_id), Some(patient_id)) = (
            ExternalId::parse_optional(&record.encounter_id),
            ExternalId::parse_optional(&record.patient_id),
        ) else {
            summary.skipped_rows += 1;
            continue;
        };

        let (key, allocated) = store.resolve_or_allocate(&encounter_id, allocator);
        if !allocated {
            continue;
        }
        summary.keys_allocated += 1;

        store
            .record(MappingEntry::encounter(
                encounter_id,
                key,
                patient_id,
                ctx.source_system_code.as_str(),
                ctx.project_id.as_str(),
                ctx.import_timestamp,
            ))
            .await?;
    }

    store.flush().await?;

    summary.valid_rows = summary.rows_read - summary.skipped_rows;
    summary.entries_appended = store.appended() - appended_before;
    summary.outcome = PassOutcome::Completed;
    let summary = summary.with_duration(start.elapsed());
    summary.log_summary();
    Ok(summary)
}

fn expect_domain(
    store: &IdentityMappingStore,
    allocator: &SurrogateKeyAllocator,
    domain: MappingDomain,
) -> Result<()> {
    if store.domain() != domain || allocator.domain() != domain {
        return Err(DeidError::Other(format!(
            "{} mapping pass given a {} store and a {} allocator",
            domain,
            store.domain(),
            allocator.domain()
        )));
    }
    Ok(())
}
