//! Mapping store factory
//!
//! This module creates the mapping store selected by configuration.

use crate::adapters::database::traits::MappingStorage;
use crate::adapters::memory::InMemoryMappingStore;
use crate::adapters::postgresql::adapter::PostgreSQLAdapter;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::config::schema::{DatabaseTarget, DeidConfig};
use crate::domain::{DeidError, Result};
use std::sync::Arc;

/// Create a mapping store based on the configuration
///
/// This factory function examines the `database_target` in the configuration
/// and creates the appropriate [`MappingStorage`] implementation.
///
/// # Errors
///
/// Returns an error if the PostgreSQL section is missing or the client cannot be created.
pub async fn create_mapping_storage(
    config: &DeidConfig,
) -> Result<Arc<dyn MappingStorage + Send + Sync>> {
    match config.database_target {
        DatabaseTarget::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                DeidError::Configuration(
                    "postgresql configuration is required when database_target = 'postgresql'"
                        .to_string(),
                )
            })?;

            tracing::info!("Creating PostgreSQL mapping store");
            let client = PostgreSQLClient::new(pg_config.clone()).await?;
            let adapter = PostgreSQLAdapter::new(client);

            Ok(Arc::new(adapter) as Arc<dyn MappingStorage + Send + Sync>)
        }
        DatabaseTarget::Memory => {
            tracing::warn!("Using in-memory mapping store; mappings are discarded at exit");
            Ok(Arc::new(InMemoryMappingStore::new()) as Arc<dyn MappingStorage + Send + Sync>)
        }
    }
}
