//! Typed input records
//!
//! One struct per record kind, deserialized by column name from a delimited file. The
//! header of a file is checked against [`RecordKind::header`] before any row is read, so a
//! pass never starts on a file that is missing a required column.

use crate::domain::errors::DeidError;
use crate::domain::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp layout accepted for every date column
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column names of the encounter file, in output order
pub const ENCOUNTER_HEADER: [&str; 7] = [
    "EncounterID",
    "PatientID",
    "StartDate",
    "EndDate",
    "ActivityTypeCD",
    "ActivityStatusCD",
    "ProgramCD",
];

/// Column names of the observation fact file, in output order
pub const FACT_HEADER: [&str; 9] = [
    "EncounterID",
    "PatientID",
    "ConceptCD",
    "ProviderID",
    "StartDate",
    "ModifierCD",
    "InstanceNum",
    "value",
    "UnitCD",
];

/// Kind of record a de-identification pass operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Encounters,
    Facts,
}

impl RecordKind {
    /// Required header of the input file
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            RecordKind::Encounters => &ENCOUNTER_HEADER,
            RecordKind::Facts => &FACT_HEADER,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Encounters => "encounters",
            RecordKind::Facts => "facts",
        }
    }

    /// Verifies that every required column is present in `header`
    ///
    /// Extra columns are tolerated and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DeidError::MalformedInput`] naming the missing columns.
    pub fn check_header(&self, header: &csv::StringRecord) -> Result<()> {
        let missing: Vec<&str> = self
            .header()
            .iter()
            .copied()
            .filter(|column| !header.iter().any(|h| h.trim() == *column))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DeidError::MalformedInput(format!(
                "{} file is missing required columns: {}",
                self.as_str(),
                missing.join(", ")
            )))
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "encounters" | "encounter" => Ok(Self::Encounters),
            "facts" | "fact" => Ok(Self::Facts),
            _ => Err(format!(
                "Invalid record kind: {s}. Expected 'encounters' or 'facts'"
            )),
        }
    }
}

/// A record read from a delimited input file
pub trait InputRecord: DeserializeOwned + Clone + Send {
    /// Kind of file this record comes from
    const KIND: RecordKind;

    /// Field values in header order
    fn fields(&self) -> Vec<&str>;
}

/// Row of the encounter (visit) file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterRecord {
    #[serde(rename = "EncounterID", default)]
    pub encounter_id: String,
    #[serde(rename = "PatientID", default)]
    pub patient_id: String,
    #[serde(rename = "StartDate", default)]
    pub start_date: String,
    #[serde(rename = "EndDate", default)]
    pub end_date: String,
    #[serde(rename = "ActivityTypeCD", default)]
    pub activity_type_cd: String,
    #[serde(rename = "ActivityStatusCD", default)]
    pub activity_status_cd: String,
    #[serde(rename = "ProgramCD", default)]
    pub program_cd: String,
}

impl InputRecord for EncounterRecord {
    const KIND: RecordKind = RecordKind::Encounters;

    fn fields(&self) -> Vec<&str> {
        vec![
            &self.encounter_id,
            &self.patient_id,
            &self.start_date,
            &self.end_date,
            &self.activity_type_cd,
            &self.activity_status_cd,
            &self.program_cd,
        ]
    }
}

/// Row of the observation fact file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactRecord {
    #[serde(rename = "EncounterID", default)]
    pub encounter_id: String,
    #[serde(rename = "PatientID", default)]
    pub patient_id: String,
    #[serde(rename = "ConceptCD", default)]
    pub concept_cd: String,
    #[serde(rename = "ProviderID", default)]
    pub provider_id: String,
    #[serde(rename = "StartDate", default)]
    pub start_date: String,
    #[serde(rename = "ModifierCD", default)]
    pub modifier_cd: String,
    #[serde(rename = "InstanceNum", default)]
    pub instance_num: String,
    #[serde(rename = "value", default)]
    pub value: String,
    #[serde(rename = "UnitCD", default)]
    pub unit_cd: String,
}

impl InputRecord for FactRecord {
    const KIND: RecordKind = RecordKind::Facts;

    fn fields(&self) -> Vec<&str> {
        vec![
            &self.encounter_id,
            &self.patient_id,
            &self.concept_cd,
            &self.provider_id,
            &self.start_date,
            &self.modifier_cd,
            &self.instance_num,
            &self.value,
            &self.unit_cd,
        ]
    }
}

/// Row of a patient MRN file
///
/// The header names the source system of each column; a row carries one alias per column,
/// any of which may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientAliasRecord {
    /// (source system, alias) pairs in column order, empty aliases omitted
    pub aliases: Vec<(String, String)>,
}

impl PatientAliasRecord {
    /// Pairs a data row with the header's source names, dropping empty aliases
    pub fn from_row(sources: &csv::StringRecord, row: &csv::StringRecord) -> Self {
        let aliases = sources
            .iter()
            .zip(row.iter())
            .filter(|(_, alias)| !alias.trim().is_empty())
            .map(|(source, alias)| (source.trim().to_string(), alias.to_string()))
            .collect();
        Self { aliases }
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
