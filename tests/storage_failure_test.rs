//! Mapping store failures are fatal for the pass that hits them

use async_trait::async_trait;
use deid_loader::adapters::database::MappingStorage;
use deid_loader::adapters::memory::InMemoryMappingStore;
use deid_loader::config::{ApplicationConfig, DatabaseTarget, DeidConfig, LoggingConfig, PipelineConfig};
use deid_loader::core::deid::DeidCoordinator;
use deid_loader::domain::{
    DeidError, ExternalId, MappingDomain, MappingEntry, RecordKind, Result, StorageError,
    SurrogateKey,
};
use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// In-memory store whose appends start failing after `good_appends` successful calls
struct FailingStore {
    inner: InMemoryMappingStore,
    good_appends: usize,
    appends: AtomicUsize,
    fail_loads: bool,
}

impl FailingStore {
    fn failing_appends_after(good_appends: usize) -> Self {
        Self {
            inner: InMemoryMappingStore::new(),
            good_appends,
            appends: AtomicUsize::new(0),
            fail_loads: false,
        }
    }

    fn failing_loads() -> Self {
        Self {
            fail_loads: true,
            ..Self::failing_appends_after(usize::MAX)
        }
    }
}

#[async_trait]
impl MappingStorage for FailingStore {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn max_surrogate_key(&self, domain: MappingDomain) -> Result<i64> {
        self.inner.max_surrogate_key(domain).await
    }

    async fn load_all(&self, domain: MappingDomain) -> Result<HashMap<ExternalId, SurrogateKey>> {
        if self.fail_loads {
            return Err(StorageError::QueryFailed("connection reset".to_string()).into());
        }
        self.inner.load_all(domain).await
    }

    async fn append(
        &self,
        domain: MappingDomain,
        entries: &[MappingEntry],
        dry_run: bool,
    ) -> Result<usize> {
        if self.appends.fetch_add(1, Ordering::SeqCst) >= self.good_appends {
            return Err(StorageError::AppendFailed {
                domain,
                count: entries.len(),
                message: "connection reset".to_string(),
            }
            .into());
        }
        self.inner.append(domain, entries, dry_run).await
    }

    async fn count(&self, domain: MappingDomain) -> Result<u64> {
        self.inner.count(domain).await
    }

    fn store_name(&self) -> &str {
        "failing"
    }
}

fn config(batch_size: usize) -> DeidConfig {
    DeidConfig {
        application: ApplicationConfig::default(),
        pipeline: PipelineConfig {
            write_batch_size: batch_size,
            ..PipelineConfig::default()
        },
        database_target: DatabaseTarget::Memory,
        postgresql: None,
        logging: LoggingConfig::console_only(),
    }
}

#[tokio::test]
async fn test_append_failure_aborts_patient_pass() {
    let dir = TempDir::new().unwrap();
    let mrn = dir.path().join("mrn.csv");
    fs::write(&mrn, "EPIC\nA\nB\nC\nD\nE\n").unwrap();

    let storage = Arc::new(FailingStore::failing_appends_after(1));
    let coordinator = DeidCoordinator::with_storage(config(2), storage.clone(), false);

    let err = coordinator.map_patients(&mrn).await.unwrap_err();

    assert!(matches!(err, DeidError::Storage(StorageError::AppendFailed { .. })));
    assert_eq!(err.exit_code(), 5);
    // The first batch went through before the failure and stays
    assert_eq!(storage.count(MappingDomain::Patient).await.unwrap(), 2);
}

#[tokio::test]
async fn test_rerun_after_failure_continues_from_persisted_max() {
    let dir = TempDir::new().unwrap();
    let mrn = dir.path().join("mrn.csv");
    fs::write(&mrn, "EPIC\nA\nB\nC\n").unwrap();

    let storage = Arc::new(FailingStore::failing_appends_after(1));
    let coordinator = DeidCoordinator::with_storage(config(2), storage.clone(), false);
    assert!(coordinator.map_patients(&mrn).await.is_err());

    let recovered = Arc::new(InMemoryMappingStore::with_entries(
        storage.inner.entries(MappingDomain::Patient).await,
    ));
    let coordinator = DeidCoordinator::with_storage(config(2), recovered.clone(), false);
    let summary = coordinator.map_patients(&mrn).await.unwrap();

    assert_eq!(summary.keys_allocated, 1);
    let map = recovered.load_all(MappingDomain::Patient).await.unwrap();
    assert_eq!(map[&ExternalId::new("A").unwrap()].get(), 1);
    assert_eq!(map[&ExternalId::new("B").unwrap()].get(), 2);
    assert_eq!(map[&ExternalId::new("C").unwrap()].get(), 3);
}

#[tokio::test]
async fn test_load_failure_stops_deidentification_before_output() {
    let dir = TempDir::new().unwrap();
    let facts = dir.path().join("facts.csv");
    fs::write(
        &facts,
        "EncounterID,PatientID,ConceptCD,ProviderID,StartDate,ModifierCD,InstanceNum,value,UnitCD\n\
         ,P1,C1,,,,,1,mg\n",
    )
    .unwrap();

    let storage = Arc::new(FailingStore::failing_loads());
    let coordinator = DeidCoordinator::with_storage(config(100), storage, false);

    let err = coordinator
        .deidentify(RecordKind::Facts, &facts, false)
        .await
        .unwrap_err();

    assert!(matches!(err, DeidError::Storage(StorageError::QueryFailed(_))));
    assert!(!dir.path().join("deid").exists());
}
