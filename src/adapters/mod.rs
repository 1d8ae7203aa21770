//! External system integrations.
//!
//! - [`database`] - Mapping store abstraction (trait and factory)
//! - [`postgresql`] - PostgreSQL mapping store
//! - [`memory`] - In-memory mapping store
//!
//! # Design Pattern
//!
//! Adapters isolate the storage dependency behind [`database::MappingStorage`] so the
//! passes in [`crate::core`] can be tested against the in-memory store.
//!
//! ```rust,no_run
//! use deid_loader::adapters::database::MappingStorage;
//! use deid_loader::adapters::memory::InMemoryMappingStore;
//! use deid_loader::domain::MappingDomain;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryMappingStore::new();
//! let max = store.max_surrogate_key(MappingDomain::Patient).await?;
//! assert_eq!(max, 0);
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod memory;
pub mod postgresql;
