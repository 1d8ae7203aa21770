//! Domain models and types for the loader.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`ExternalId`], [`SurrogateKey`], [`MappingDomain`])
//! - **Input records** ([`EncounterRecord`], [`FactRecord`], [`PatientAliasRecord`])
//! - **Mapping entries** ([`MappingEntry`]) as persisted by the mapping store
//! - **Error types** ([`DeidError`], [`StorageError`], [`ValidationError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Identifiers use the newtype pattern so a source id can't be written where a
//! surrogate key is expected:
//!
//! ```rust
//! use deid_loader::domain::{ExternalId, SurrogateKey};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mrn = ExternalId::new("MRN-0042")?;
//! let key = SurrogateKey::new(17)?;
//! assert_eq!(key.get(), 17);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod ids;
pub mod mapping;
pub mod record;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{DeidError, StorageError, ValidationError, ValidationMessage};
pub use ids::{ExternalId, MappingDomain, SurrogateKey};
pub use mapping::MappingEntry;
pub use record::{
    EncounterRecord, FactRecord, InputRecord, PatientAliasRecord, RecordKind, DATE_FORMAT,
};
pub use result::Result;
