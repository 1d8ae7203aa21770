//! PostgreSQL adapter implementing the mapping store trait

use crate::adapters::database::traits::MappingStorage;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{
    count_query, load_all_query, mapping_pair_from_row, max_key_query,
    PostgreSQLEncounterMapping, PostgreSQLPatientMapping, INSERT_ENCOUNTER_MAPPING,
    INSERT_PATIENT_MAPPING,
};
use crate::domain::ids::{ExternalId, MappingDomain, SurrogateKey};
use crate::domain::mapping::MappingEntry;
use crate::domain::{DeidError, Result, StorageError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// PostgreSQL implementation of [`MappingStorage`]
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLAdapter {
    /// Create a new PostgreSQL adapter
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }

    /// Inserts one batch inside a single transaction
    async fn insert_batch(&self, domain: MappingDomain, entries: &[MappingEntry]) -> Result<()> {
        let mut conn = self.client.get_connection().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| append_failed(domain, entries.len(), e))?;

        match domain {
            MappingDomain::Patient => {
                let stmt = tx
                    .prepare_cached(INSERT_PATIENT_MAPPING)
                    .await
                    .map_err(|e| append_failed(domain, entries.len(), e))?;

                for entry in entries {
                    let row = PostgreSQLPatientMapping::from_domain(entry);
                    tx.execute(
                        &stmt,
                        &[
                            &row.patient_ide,
                            &row.patient_ide_source,
                            &row.patient_num,
                            &row.project_id,
                            &row.import_date,
                        ],
                    )
                    .await
                    .map_err(|e| append_failed(domain, entries.len(), e))?;
                }
            }
            MappingDomain::Encounter => {
                let stmt = tx
                    .prepare_cached(INSERT_ENCOUNTER_MAPPING)
                    .await
                    .map_err(|e| append_failed(domain, entries.len(), e))?;

                for entry in entries {
                    let row = PostgreSQLEncounterMapping::from_domain(entry)?;
                    tx.execute(
                        &stmt,
                        &[
                            &row.encounter_ide,
                            &row.encounter_ide_source,
                            &row.encounter_num,
                            &row.patient_ide,
                            &row.patient_ide_source,
                            &row.project_id,
                            &row.import_date,
                        ],
                    )
                    .await
                    .map_err(|e| append_failed(domain, entries.len(), e))?;
                }
            }
        }

        // Dropping the transaction without commit rolls the batch back
        tx.commit()
            .await
            .map_err(|e| append_failed(domain, entries.len(), e))?;
        Ok(())
    }
}

fn append_failed(domain: MappingDomain, count: usize, e: tokio_postgres::Error) -> DeidError {
    StorageError::AppendFailed {
        domain,
        count,
        message: e.to_string(),
    }
    .into()
}

#[async_trait]
impl MappingStorage for PostgreSQLAdapter {
    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.client.ensure_schema().await
    }

    async fn max_surrogate_key(&self, domain: MappingDomain) -> Result<i64> {
        let row = self.client.query_one(max_key_query(domain), &[]).await?;
        let max: i64 = row
            .try_get(0)
            .map_err(|e| StorageError::InvalidRow(e.to_string()))?;

        tracing::debug!(domain = %domain, max_key = max, "Read max surrogate key from PostgreSQL");
        Ok(max)
    }

    async fn load_all(&self, domain: MappingDomain) -> Result<HashMap<ExternalId, SurrogateKey>> {
        tracing::debug!(domain = %domain, "Loading mapping table from PostgreSQL");

        let rows = self.client.query(load_all_query(domain), &[]).await?;

        let mut mapping = HashMap::with_capacity(rows.len());
        for row in &rows {
            let (external_id, key) = mapping_pair_from_row(row)?;
            mapping.insert(external_id, key);
        }

        tracing::debug!(domain = %domain, count = mapping.len(), "Loaded mapping table");
        Ok(mapping)
    }

    async fn append(
        &self,
        domain: MappingDomain,
        entries: &[MappingEntry],
        dry_run: bool,
    ) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        if dry_run {
            tracing::info!(
                domain = %domain,
                count = entries.len(),
                "DRY RUN: Would insert {} {} mapping entries into PostgreSQL",
                entries.len(),
                domain
            );
            return Ok(entries.len());
        }

        self.insert_batch(domain, entries).await?;

        tracing::debug!(
            domain = %domain,
            count = entries.len(),
            "Mapping entries appended to PostgreSQL"
        );
        Ok(entries.len())
    }

    async fn count(&self, domain: MappingDomain) -> Result<u64> {
        let row = self.client.query_one(count_query(domain), &[]).await?;
        let count: i64 = row
            .try_get(0)
            .map_err(|e| StorageError::InvalidRow(e.to_string()))?;
        Ok(count.max(0) as u64)
    }

    fn store_name(&self) -> &str {
        "postgresql"
    }
}
