//! Pass-scoped identity mapping store
//!
//! Preloads the persisted mapping of one domain, answers lookups from memory and buffers
//! new entries until a full batch can be appended.

use crate::adapters::database::MappingStorage;
use crate::core::mapping::allocator::SurrogateKeyAllocator;
use crate::domain::ids::{ExternalId, MappingDomain, SurrogateKey};
use crate::domain::mapping::MappingEntry;
use crate::domain::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Identity mapping of one domain for the duration of a pass
///
/// Lookups see both the preloaded entries and the ones assigned earlier in the same pass,
/// so two rows that reference the same new id resolve to the same key.
pub struct IdentityMappingStore {
    domain: MappingDomain,
    storage: Arc<dyn MappingStorage + Send + Sync>,
    cache: HashMap<ExternalId, SurrogateKey>,
    pending: Vec<MappingEntry>,
    write_batch_size: usize,
    dry_run: bool,
    appended: usize,
}

impl IdentityMappingStore {
    /// Loads the full mapping of `domain` from `storage`
    ///
    /// # Errors
    ///
    /// Returns a storage error if the scan fails.
    pub async fn load(
        storage: Arc<dyn MappingStorage + Send + Sync>,
        domain: MappingDomain,
        write_batch_size: usize,
        dry_run: bool,
    ) -> Result<Self> {
        let cache = storage.load_all(domain).await?;

        tracing::info!(
            domain = %domain,
            entries = cache.len(),
            store = storage.store_name(),
            "Loaded identity mapping"
        );

        Ok(Self {
            domain,
            storage,
            cache,
            pending: Vec::new(),
            write_batch_size: write_batch_size.max(1),
            dry_run,
            appended: 0,
        })
    }

    /// Key of `id`, if mapped
    pub fn lookup(&self, id: &ExternalId) -> Option<SurrogateKey> {
        self.cache.get(id).copied()
    }

    /// Key of a raw field value; empty and blank values never resolve
    pub fn lookup_str(&self, id: &str) -> Option<SurrogateKey> {
        ExternalId::parse_optional(id).and_then(|id| self.lookup(&id))
    }

    /// Returns the key of `id`, allocating one if it is unmapped
    ///
    /// The boolean is true when a new key was allocated.
    pub fn resolve_or_allocate(
        &self,
        id: &ExternalId,
        allocator: &mut SurrogateKeyAllocator,
    ) -> (SurrogateKey, bool) {
        match self.lookup(id) {
            Some(key) => (key, false),
            None => (allocator.next_key(), true),
        }
    }

    /// Records a new entry and appends a batch once enough are buffered
    ///
    /// Entries for ids that are already mapped are ignored.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the batch append fails.
    pub async fn record(&mut self, entry: MappingEntry) -> Result<()> {
        if entry.domain != self.domain || self.cache.contains_key(&entry.external_id) {
            tracing::debug!(
                domain = %self.domain,
                external_id = %entry.external_id,
                "Skipping entry for an already mapped id"
            );
            return Ok(());
        }

        self.cache
            .insert(entry.external_id.clone(), entry.surrogate_key);
        self.pending.push(entry);

        if self.pending.len() >= self.write_batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Appends every buffered entry
    ///
    /// # Returns
    ///
    /// Returns the number of entries appended by this call.
    pub async fn flush(&mut self) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        let batch = std::mem::take(&mut self.pending);
        let written = self
            .storage
            .append(self.domain, &batch, self.dry_run)
            .await?;
        self.appended += written;

        tracing::debug!(
            domain = %self.domain,
            batch = written,
            total = self.appended,
            "Flushed mapping entries"
        );
        Ok(written)
    }

    pub fn domain(&self) -> MappingDomain {
        self.domain
    }

    /// Number of known ids, persisted and pending
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Entries buffered but not yet appended
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Entries appended during this pass
    pub fn appended(&self) -> usize {
        self.appended
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}
