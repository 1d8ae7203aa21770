//! Domain identifier types with validation
//!
//! Newtype wrappers for source-system identifiers and surrogate keys, plus the
//! [`MappingDomain`] namespace they live in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier namespace within which surrogate keys are unique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingDomain {
    /// Patient identifiers (MRNs and other aliases)
    Patient,
    /// Encounter (visit) identifiers
    Encounter,
}

impl MappingDomain {
    /// All domains, in load order
    pub const ALL: [MappingDomain; 2] = [MappingDomain::Patient, MappingDomain::Encounter];

    /// Capitalized label used in validation messages
    pub fn label(&self) -> &'static str {
        match self {
            MappingDomain::Patient => "Patient",
            MappingDomain::Encounter => "Encounter",
        }
    }

    /// Lowercase name used in logs and config
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingDomain::Patient => "patient",
            MappingDomain::Encounter => "encounter",
        }
    }
}

impl fmt::Display for MappingDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MappingDomain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "patient" | "patients" => Ok(Self::Patient),
            "encounter" | "encounters" => Ok(Self::Encounter),
            _ => Err(format!(
                "Invalid mapping domain: {s}. Expected 'patient' or 'encounter'"
            )),
        }
    }
}

/// Source-system identifier newtype wrapper
///
/// An empty or blank identifier is treated as absent, so construction fails for it.
///
/// # Examples
///
/// ```
/// use deid_loader::domain::ids::ExternalId;
///
/// let id = ExternalId::new("MRN-0042").unwrap();
/// assert_eq!(id.as_str(), "MRN-0042");
/// assert!(ExternalId::parse_optional("  ").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExternalId(String);

impl ExternalId {
    /// Creates a new ExternalId from a string
    ///
    /// # Returns
    ///
    /// Returns `Ok(ExternalId)` if the ID is non-blank, `Err` otherwise
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("External ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns `None` for an empty or blank field, `Some` otherwise
    pub fn parse_optional(id: &str) -> Option<Self> {
        Self::new(id).ok()
    }

    /// Returns the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ExternalId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ExternalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Surrogate key newtype wrapper
///
/// A positive integer, unique within its [`MappingDomain`]. Keys are handed out by the
/// allocator in strictly increasing order and never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SurrogateKey(i64);

impl SurrogateKey {
    /// Creates a key, rejecting zero and negative values
    pub fn new(value: i64) -> Result<Self, String> {
        if value <= 0 {
            return Err(format!("Surrogate key must be positive, got {value}"));
        }
        Ok(Self(value))
    }

    /// Smallest valid key
    pub fn first() -> Self {
        Self(1)
    }

    /// The key directly after this one
    pub fn successor(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw integer value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for SurrogateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for SurrogateKey {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_id_creation() {
        let id = ExternalId::new("MRN-1").unwrap();
        assert_eq!(id.as_str(), "MRN-1");
        assert_eq!(format!("{id}"), "MRN-1");
    }

    #[test]
    fn test_external_id_empty_fails() {
        assert!(ExternalId::new("").is_err());
        assert!(ExternalId::new("   ").is_err());
        assert!(ExternalId::parse_optional("").is_none());
    }

    #[test]
    fn test_external_id_from_str() {
        let id: ExternalId = "E-77".parse().unwrap();
        assert_eq!(id.into_inner(), "E-77");
    }

    #[test]
    fn test_surrogate_key_positive_only() {
        assert_eq!(SurrogateKey::new(1).unwrap().get(), 1);
        assert!(SurrogateKey::new(0).is_err());
        assert!(SurrogateKey::try_from(-4).is_err());
    }

    #[test]
    fn test_surrogate_key_ordering() {
        let a = SurrogateKey::new(3).unwrap();
        let b = SurrogateKey::new(10).unwrap();
        assert!(a < b);
        assert_eq!(a.successor().get(), 4);
        assert_eq!(SurrogateKey::first().get(), 1);
    }

    #[test]
    fn test_mapping_domain_parse() {
        assert_eq!(
            MappingDomain::from_str("Encounters").unwrap(),
            MappingDomain::Encounter
        );
        assert_eq!(
            MappingDomain::from_str("patient").unwrap(),
            MappingDomain::Patient
        );
        assert!(MappingDomain::from_str("concept").is_err());
    }

    #[test]
    fn test_mapping_domain_serialization() {
        let json = serde_json::to_string(&MappingDomain::Encounter).unwrap();
        assert_eq!(json, "\"encounter\"");
    }
}
