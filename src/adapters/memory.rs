//! In-memory mapping store
//!
//! Backs `database_target = "memory"` and the test suite. Nothing survives the process.

use crate::adapters::database::traits::MappingStorage;
use crate::domain::ids::{ExternalId, MappingDomain, SurrogateKey};
use crate::domain::mapping::MappingEntry;
use crate::domain::{Result, StorageError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// [`MappingStorage`] kept in process memory
///
/// Enforces the same uniqueness rule as the PostgreSQL tables: an external id appears at
/// most once per domain. A batch containing a duplicate is rejected as a whole.
#[derive(Default)]
pub struct InMemoryMappingStore {
    tables: Mutex<HashMap<MappingDomain, Vec<MappingEntry>>>,
}

impl InMemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `entries`
    pub fn with_entries(entries: Vec<MappingEntry>) -> Self {
        let mut tables: HashMap<MappingDomain, Vec<MappingEntry>> = HashMap::new();
        for entry in entries {
            tables.entry(entry.domain).or_default().push(entry);
        }
        Self {
            tables: Mutex::new(tables),
        }
    }

    /// Snapshot of the persisted entries of `domain`, in append order
    pub async fn entries(&self, domain: MappingDomain) -> Vec<MappingEntry> {
        self.tables
            .lock()
            .await
            .get(&domain)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl MappingStorage for InMemoryMappingStore {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn max_surrogate_key(&self, domain: MappingDomain) -> Result<i64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .get(&domain)
            .and_then(|entries| entries.iter().map(|e| e.surrogate_key.get()).max())
            .unwrap_or(0))
    }

    async fn load_all(&self, domain: MappingDomain) -> Result<HashMap<ExternalId, SurrogateKey>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .get(&domain)
            .map(|entries| {
                entries
                    .iter()
                    .map(|e| (e.external_id.clone(), e.surrogate_key))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn append(
        &self,
        domain: MappingDomain,
        entries: &[MappingEntry],
        dry_run: bool,
    ) -> Result<usize> {
        if dry_run {
            tracing::info!(
                domain = %domain,
                count = entries.len(),
                "DRY RUN: Would append {} {} mapping entries",
                entries.len(),
                domain
            );
            return Ok(entries.len());
        }

        let mut tables = self.tables.lock().await;
        let table = tables.entry(domain).or_default();

        for (i, entry) in entries.iter().enumerate() {
            let duplicate = entry.domain != domain
                || table.iter().any(|e| e.external_id == entry.external_id)
                || entries[..i].iter().any(|e| e.external_id == entry.external_id);
            if duplicate {
                return Err(StorageError::AppendFailed {
                    domain,
                    count: entries.len(),
                    message: format!(
                        "duplicate or foreign entry for external id {}",
                        entry.external_id
                    ),
                }
                .into());
            }
        }

        table.extend_from_slice(entries);
        Ok(entries.len())
    }

    async fn count(&self, domain: MappingDomain) -> Result<u64> {
        let tables = self.tables.lock().await;
        Ok(tables.get(&domain).map(|t| t.len() as u64).unwrap_or(0))
    }

    fn store_name(&self) -> &str {
        "memory"
    }
}
