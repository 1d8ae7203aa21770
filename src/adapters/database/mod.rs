//! Mapping store abstraction layer
//!
//! A trait-based abstraction over the store that persists identity mappings, so passes
//! run unchanged against PostgreSQL or the in-memory store.

pub mod factory;
pub mod traits;

pub use factory::create_mapping_storage;
pub use traits::MappingStorage;
