//! Identity mapping entries
//!
//! A [`MappingEntry`] is one persisted (external id → surrogate key) pair. Once written,
//! an entry is never updated or deleted by the loader.

use crate::domain::ids::{ExternalId, MappingDomain, SurrogateKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Patient reference carried by encounter entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRef {
    pub patient_id: ExternalId,
    pub source_system_code: String,
}

/// A single identity mapping entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub domain: MappingDomain,
    pub external_id: ExternalId,
    pub surrogate_key: SurrogateKey,
    pub source_system_code: String,
    pub project_id: String,
    pub import_timestamp: DateTime<Utc>,

    /// Patient of the encounter; `None` for patient entries
    pub patient: Option<PatientRef>,
}

impl MappingEntry {
    /// Creates a patient mapping entry
    pub fn patient(
        external_id: ExternalId,
        surrogate_key: SurrogateKey,
        source_system_code: impl Into<String>,
        project_id: impl Into<String>,
        import_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            domain: MappingDomain::Patient,
            external_id,
            surrogate_key,
            source_system_code: source_system_code.into(),
            project_id: project_id.into(),
            import_timestamp,
            patient: None,
        }
    }

    /// Creates an encounter mapping entry; the patient id shares the encounter's source
    pub fn encounter(
        external_id: ExternalId,
        surrogate_key: SurrogateKey,
        patient_id: ExternalId,
        source_system_code: impl Into<String>,
        project_id: impl Into<String>,
        import_timestamp: DateTime<Utc>,
    ) -> Self {
        let source_system_code = source_system_code.into();
        Self {
            domain: MappingDomain::Encounter,
            external_id,
            surrogate_key,
            patient: Some(PatientRef {
                patient_id,
                source_system_code: source_system_code.clone(),
            }),
            source_system_code,
            project_id: project_id.into(),
            import_timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encounter_entry_carries_patient() {
        let entry = MappingEntry::encounter(
            ExternalId::new("E1").unwrap(),
            SurrogateKey::new(5).unwrap(),
            ExternalId::new("P1").unwrap(),
            "DEMO",
            "DEMO",
            Utc::now(),
        );
        assert_eq!(entry.domain, MappingDomain::Encounter);
        let patient = entry.patient.unwrap();
        assert_eq!(patient.patient_id.as_str(), "P1");
        assert_eq!(patient.source_system_code, "DEMO");
    }

    #[test]
    fn test_patient_entry_has_no_patient_ref() {
        let entry = MappingEntry::patient(
            ExternalId::new("MRN1").unwrap(),
            SurrogateKey::new(1).unwrap(),
            "EPIC",
            "demo",
            Utc::now(),
        );
        assert_eq!(entry.domain, MappingDomain::Patient);
        assert!(entry.patient.is_none());
    }
}
