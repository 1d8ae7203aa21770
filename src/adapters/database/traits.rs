//! Mapping store abstraction
//!
//! This module defines the trait mapping store adapters implement.

use crate::domain::ids::{ExternalId, MappingDomain, SurrogateKey};
use crate::domain::mapping::MappingEntry;
use crate::domain::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Persistence sink for identity mapping entries
///
/// Implementations hold one table (or equivalent) per [`MappingDomain`]. Entries are only
/// ever appended.
#[async_trait]
pub trait MappingStorage: Send + Sync {
    /// Test the store connection
    ///
    /// # Errors
    ///
    /// Returns an error if the connection test fails.
    async fn test_connection(&self) -> Result<()>;

    /// Create the mapping tables if they don't exist
    async fn ensure_schema(&self) -> Result<()>;

    /// Highest surrogate key persisted for `domain`, 0 when there is none
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    async fn max_surrogate_key(&self, domain: MappingDomain) -> Result<i64>;

    /// Full external id → surrogate key map of `domain`
    ///
    /// A single scan, expected once per pass.
    async fn load_all(&self, domain: MappingDomain) -> Result<HashMap<ExternalId, SurrogateKey>>;

    /// Persist a batch of new entries of one domain
    ///
    /// All-or-nothing: on error no entry of the batch is persisted.
    ///
    /// # Arguments
    ///
    /// * `domain` - Domain every entry belongs to
    /// * `entries` - New entries
    /// * `dry_run` - If true, log what would be written and persist nothing
    ///
    /// # Returns
    ///
    /// Returns the number of entries written (or that would have been written).
    async fn append(
        &self,
        domain: MappingDomain,
        entries: &[MappingEntry],
        dry_run: bool,
    ) -> Result<usize>;

    /// Number of persisted entries of `domain`
    async fn count(&self, domain: MappingDomain) -> Result<u64>;

    /// Short name of the store for logs and status output
    fn store_name(&self) -> &str;
}
