//! Record validation
//!
//! Validation checks one record against the field rules of its kind and resolves its
//! identifier references through the mapping domains. It never fails: every problem is a
//! [`ValidationMessage`] on the returned [`Validated`] record, and references that do
//! resolve are replaced by their surrogate keys even when other checks fail.

use crate::core::mapping::IdentityMappingStore;
use crate::domain::errors::ValidationMessage;
use crate::domain::ids::{MappingDomain, SurrogateKey};
use crate::domain::record::{EncounterRecord, FactRecord, InputRecord, DATE_FORMAT};
use chrono::NaiveDateTime;

/// Read-only access to the surrogate keys of a pass
pub trait KeyLookup {
    /// Key of the raw id `id` in `domain`; `None` for unmapped or empty ids
    fn surrogate_key(&self, domain: MappingDomain, id: &str) -> Option<SurrogateKey>;
}

impl<F> KeyLookup for F
where
    F: Fn(MappingDomain, &str) -> Option<SurrogateKey>,
{
    fn surrogate_key(&self, domain: MappingDomain, id: &str) -> Option<SurrogateKey> {
        self(domain, id)
    }
}

/// Patient and encounter mappings loaded for one pass
pub struct MappingLookup {
    pub patients: IdentityMappingStore,
    pub encounters: IdentityMappingStore,
}

impl MappingLookup {
    pub fn new(patients: IdentityMappingStore, encounters: IdentityMappingStore) -> Self {
        Self {
            patients,
            encounters,
        }
    }
}

impl KeyLookup for MappingLookup {
    fn surrogate_key(&self, domain: MappingDomain, id: &str) -> Option<SurrogateKey> {
        match domain {
            MappingDomain::Patient => self.patients.lookup_str(id),
            MappingDomain::Encounter => self.encounters.lookup_str(id),
        }
    }
}

/// A record after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated<R> {
    /// The record with defaults applied and resolved ids replaced by their keys
    pub record: R,

    /// Findings in detection order; empty for a valid record
    pub messages: Vec<ValidationMessage>,
}

impl<R> Validated<R> {
    pub fn is_valid(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Field rules of one record kind
pub trait RecordValidator: InputRecord {
    /// Validates the record and substitutes every resolvable reference
    fn validate(self, keys: &dyn KeyLookup) -> Validated<Self>;
}

/// True if `value` parses as `YYYY-MM-DD hh:mm:ss`
pub fn is_valid_date(value: &str) -> bool {
    NaiveDateTime::parse_from_str(value, DATE_FORMAT).is_ok()
}

fn resolve(
    keys: &dyn KeyLookup,
    domain: MappingDomain,
    field: &mut String,
    messages: &mut Vec<ValidationMessage>,
) {
    match keys.surrogate_key(domain, field) {
        Some(key) => *field = key.to_string(),
        None => messages.push(ValidationMessage::MappingNotFound(domain)),
    }
}

impl RecordValidator for EncounterRecord {
    fn validate(mut self, keys: &dyn KeyLookup) -> Validated<Self> {
        let mut messages = Vec::new();

        if self.encounter_id.is_empty() {
            messages.push(ValidationMessage::Missing("Encounter ID"));
        }
        if self.patient_id.is_empty() {
            messages.push(ValidationMessage::Missing("Patient ID"));
        }
        if !self.start_date.is_empty() && !is_valid_date(&self.start_date) {
            messages.push(ValidationMessage::InvalidDate("start"));
        }
        if !self.end_date.is_empty() && !is_valid_date(&self.end_date) {
            messages.push(ValidationMessage::InvalidDate("end"));
        }

        // Both lookups run even when the id is missing
        resolve(keys, MappingDomain::Encounter, &mut self.encounter_id, &mut messages);
        resolve(keys, MappingDomain::Patient, &mut self.patient_id, &mut messages);

        Validated {
            record: self,
            messages,
        }
    }
}

impl RecordValidator for FactRecord {
    fn validate(mut self, keys: &dyn KeyLookup) -> Validated<Self> {
        let mut messages = Vec::new();

        if self.patient_id.is_empty() {
            messages.push(ValidationMessage::Missing("PatientID"));
        }
        if self.concept_cd.is_empty() {
            messages.push(ValidationMessage::Missing("ConceptCD"));
        }
        if self.provider_id.is_empty() {
            self.provider_id = "0".to_string();
        }
        if !self.start_date.is_empty() && !is_valid_date(&self.start_date) {
            messages.push(ValidationMessage::InvalidDate("start"));
        }
        if self.modifier_cd.is_empty() {
            self.modifier_cd = "@".to_string();
        }
        if self.instance_num.is_empty() {
            self.instance_num = "1".to_string();
        }

        resolve(keys, MappingDomain::Patient, &mut self.patient_id, &mut messages);

        if self.encounter_id.is_empty() {
            self.encounter_id = "0".to_string();
        } else {
            resolve(keys, MappingDomain::Encounter, &mut self.encounter_id, &mut messages);
        }

        Validated {
            record: self,
            messages,
        }
    }
}
