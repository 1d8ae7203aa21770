//! PostgreSQL mapping store
//!
//! Persists identity mappings in the `patient_mapping` and `encounter_mapping` tables.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgreSQLAdapter;
pub use client::PostgreSQLClient;
