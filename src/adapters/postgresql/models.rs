//! PostgreSQL row models
//!
//! Row structures for the `patient_mapping` and `encounter_mapping` tables and the SQL
//! that reads and writes them.

use crate::domain::ids::{ExternalId, MappingDomain, SurrogateKey};
use crate::domain::mapping::MappingEntry;
use crate::domain::{Result, StorageError};
use chrono::{DateTime, Utc};
use tokio_postgres::Row;

/// Highest key in use, 0 for an empty table
pub fn max_key_query(domain: MappingDomain) -> &'static str {
    match domain {
        MappingDomain::Patient => {
            "SELECT COALESCE(MAX(patient_num), 0)::BIGINT FROM patient_mapping"
        }
        MappingDomain::Encounter => {
            "SELECT COALESCE(MAX(encounter_num), 0)::BIGINT FROM encounter_mapping"
        }
    }
}

/// Full (external id, key) projection of a mapping table
pub fn load_all_query(domain: MappingDomain) -> &'static str {
    match domain {
        MappingDomain::Patient => {
            "SELECT patient_ide, patient_num::BIGINT FROM patient_mapping"
        }
        MappingDomain::Encounter => {
            "SELECT encounter_ide, encounter_num::BIGINT FROM encounter_mapping"
        }
    }
}

pub fn count_query(domain: MappingDomain) -> &'static str {
    match domain {
        MappingDomain::Patient => "SELECT COUNT(*) FROM patient_mapping",
        MappingDomain::Encounter => "SELECT COUNT(*) FROM encounter_mapping",
    }
}

// Explicit casts let the same statements run against i2b2 tables declared with INT keys
// and TIMESTAMP columns.
pub const INSERT_PATIENT_MAPPING: &str = r#"
    INSERT INTO patient_mapping (
        patient_ide, patient_ide_source, patient_num, project_id, import_date
    )
    VALUES ($1, $2, $3::BIGINT, $4, $5::TIMESTAMPTZ)
"#;

pub const INSERT_ENCOUNTER_MAPPING: &str = r#"
    INSERT INTO encounter_mapping (
        encounter_ide, encounter_ide_source, encounter_num,
        patient_ide, patient_ide_source, project_id, import_date
    )
    VALUES ($1, $2, $3::BIGINT, $4, $5, $6, $7::TIMESTAMPTZ)
"#;

/// Row of the `patient_mapping` table
#[derive(Debug, Clone)]
pub struct PostgreSQLPatientMapping {
    pub patient_ide: String,
    pub patient_ide_source: String,
    pub patient_num: i64,
    pub project_id: String,
    pub import_date: DateTime<Utc>,
}

impl PostgreSQLPatientMapping {
    pub fn from_domain(entry: &MappingEntry) -> Self {
        Self {
            patient_ide: entry.external_id.to_string(),
            patient_ide_source: entry.source_system_code.clone(),
            patient_num: entry.surrogate_key.get(),
            project_id: entry.project_id.clone(),
            import_date: entry.import_timestamp,
        }
    }
}

/// Row of the `encounter_mapping` table
#[derive(Debug, Clone)]
pub struct PostgreSQLEncounterMapping {
    pub encounter_ide: String,
    pub encounter_ide_source: String,
    pub encounter_num: i64,
    pub patient_ide: String,
    pub patient_ide_source: String,
    pub project_id: String,
    pub import_date: DateTime<Utc>,
}

impl PostgreSQLEncounterMapping {
    /// Convert from a domain entry
    ///
    /// # Errors
    ///
    /// Fails for entries that carry no patient reference.
    pub fn from_domain(entry: &MappingEntry) -> Result<Self> {
        let patient = entry.patient.as_ref().ok_or_else(|| {
            StorageError::InvalidRow(format!(
                "encounter {} has no patient reference",
                entry.external_id
            ))
        })?;

        Ok(Self {
            encounter_ide: entry.external_id.to_string(),
            encounter_ide_source: entry.source_system_code.clone(),
            encounter_num: entry.surrogate_key.get(),
            patient_ide: patient.patient_id.to_string(),
            patient_ide_source: patient.source_system_code.clone(),
            project_id: entry.project_id.clone(),
            import_date: entry.import_timestamp,
        })
    }
}

/// Converts a (external id, key) projection row
pub fn mapping_pair_from_row(row: &Row) -> Result<(ExternalId, SurrogateKey)> {
    let external: String = row
        .try_get(0)
        .map_err(|e| StorageError::InvalidRow(e.to_string()))?;
    let key: i64 = row
        .try_get(1)
        .map_err(|e| StorageError::InvalidRow(e.to_string()))?;

    let external_id = ExternalId::new(external).map_err(StorageError::InvalidRow)?;
    let surrogate_key = SurrogateKey::new(key).map_err(StorageError::InvalidRow)?;
    Ok((external_id, surrogate_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queries_target_domain_tables() {
        assert!(max_key_query(MappingDomain::Patient).contains("patient_mapping"));
        assert!(max_key_query(MappingDomain::Encounter).contains("MAX(encounter_num)"));
        assert!(load_all_query(MappingDomain::Encounter).starts_with("SELECT encounter_ide"));
        assert!(count_query(MappingDomain::Patient).contains("COUNT(*)"));
    }

    #[test]
    fn test_encounter_row_from_domain() {
        let entry = MappingEntry::encounter(
            ExternalId::new("E9").unwrap(),
            SurrogateKey::new(12).unwrap(),
            ExternalId::new("P3").unwrap(),
            "DEMO",
            "DEMO",
            Utc::now(),
        );
        let row = PostgreSQLEncounterMapping::from_domain(&entry).unwrap();
        assert_eq!(row.encounter_ide, "E9");
        assert_eq!(row.encounter_num, 12);
        assert_eq!(row.patient_ide, "P3");
        assert_eq!(row.patient_ide_source, "DEMO");
    }

    #[test]
    fn test_encounter_row_requires_patient() {
        let entry = MappingEntry::patient(
            ExternalId::new("P1").unwrap(),
            SurrogateKey::new(1).unwrap(),
            "EPIC",
            "demo",
            Utc::now(),
        );
        assert!(PostgreSQLEncounterMapping::from_domain(&entry).is_err());

        let row = PostgreSQLPatientMapping::from_domain(&entry);
        assert_eq!(row.patient_ide_source, "EPIC");
        assert_eq!(row.project_id, "demo");
    }
}
