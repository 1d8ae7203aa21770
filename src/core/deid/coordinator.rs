//! Pass coordinator
//!
//! Wires configuration, the mapping store and the individual passes together for the
//! CLI commands.

use crate::adapters::database::{create_mapping_storage, MappingStorage};
use crate::config::DeidConfig;
use crate::core::deid::deidentifier::{DeidOutputs, PassConfig, StreamDeidentifier};
use crate::core::deid::summary::PassSummary;
use crate::core::mapping::{
    map_encounters, map_patients, IdentityMappingStore, MappingPassContext,
    SurrogateKeyAllocator,
};
use crate::core::transform::{BulkRecord, BulkTransform};
use crate::core::validate::{MappingLookup, RecordValidator};
use crate::domain::ids::MappingDomain;
use crate::domain::record::{EncounterRecord, FactRecord, RecordKind};
use crate::domain::{DeidError, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Persisted state of one mapping domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainStatus {
    pub domain: MappingDomain,
    pub max_key: i64,
    pub entries: u64,
}

/// Runs passes against one mapping store
pub struct DeidCoordinator {
    config: DeidConfig,
    storage: Arc<dyn MappingStorage + Send + Sync>,
    dry_run: bool,
}

impl DeidCoordinator {
    /// Connects to the configured mapping store and prepares its schema
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an incomplete store section and a storage error
    /// if the store can't be reached or its tables can't be created.
    pub async fn new(config: DeidConfig, dry_run: bool) -> Result<Self> {
        let storage = create_mapping_storage(&config).await?;
        storage.test_connection().await?;
        storage.ensure_schema().await?;
        Ok(Self::with_storage(config, storage, dry_run))
    }

    /// Coordinator over an already prepared store
    pub fn with_storage(
        config: DeidConfig,
        storage: Arc<dyn MappingStorage + Send + Sync>,
        dry_run: bool,
    ) -> Self {
        let dry_run = dry_run || config.application.dry_run;
        if dry_run {
            tracing::info!("DRY RUN MODE: no mapping entries will be persisted");
        }
        Self {
            config,
            storage,
            dry_run,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn storage(&self) -> &Arc<dyn MappingStorage + Send + Sync> {
        &self.storage
    }

    /// Assigns patient surrogate keys from an MRN file
    pub async fn map_patients(&self, mrn_file: &Path) -> Result<PassSummary> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("map_patients", run_id = %run_id);

        self.run_map_patients(mrn_file).instrument(span).await
    }

    async fn run_map_patients(&self, mrn_file: &Path) -> Result<PassSummary> {
        let ctx = MappingPassContext::from_config(&self.config.pipeline, Utc::now());
        let (mut store, mut allocator) = self.open_domain(MappingDomain::Patient).await?;
        map_patients(mrn_file, &mut store, &mut allocator, &ctx).await
    }

    /// De-identifies an encounter or fact file, optionally followed by its bulk transform
    ///
    /// Encounter files first go through the encounter mapping pass, so every complete row
    /// has a key by the time it is validated. Summaries are returned in pass order.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error of any pass; output written and mapping entries
    /// appended before it stay in place.
    pub async fn deidentify(
        &self,
        kind: RecordKind,
        input: &Path,
        transform: bool,
    ) -> Result<Vec<PassSummary>> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("deidentify", run_id = %run_id, kind = %kind);

        self.run_deidentify(kind, input, transform)
            .instrument(span)
            .await
    }

    async fn run_deidentify(
        &self,
        kind: RecordKind,
        input: &Path,
        transform: bool,
    ) -> Result<Vec<PassSummary>> {
        let import_timestamp = Utc::now();
        let mut summaries = Vec::new();

        let (mut encounters, mut allocator) = self.open_domain(MappingDomain::Encounter).await?;
        if kind == RecordKind::Encounters {
            let ctx = MappingPassContext::from_config(&self.config.pipeline, import_timestamp);
            summaries.push(map_encounters(input, &mut encounters, &mut allocator, &ctx).await?);
        }
        let patients = self.load_store(MappingDomain::Patient).await?;
        let lookup = MappingLookup::new(patients, encounters);

        // File passes are synchronous csv I/O; keep them off the async workers
        let pass = PassConfig::from_config(&self.config.pipeline, self.dry_run);
        let input = input.to_path_buf();
        let span = tracing::Span::current();
        let file_summaries = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            match kind {
                RecordKind::Encounters => file_passes::<EncounterRecord>(
                    &pass,
                    &input,
                    &lookup,
                    transform,
                    import_timestamp,
                ),
                RecordKind::Facts => file_passes::<FactRecord>(
                    &pass,
                    &input,
                    &lookup,
                    transform,
                    import_timestamp,
                ),
            }
        })
        .await
        .map_err(|e| DeidError::Other(format!("De-identification task failed: {e}")))??;

        summaries.extend(file_summaries);
        Ok(summaries)
    }

    /// Highest key and entry count of every mapping domain
    pub async fn status(&self) -> Result<Vec<DomainStatus>> {
        let mut status = Vec::with_capacity(MappingDomain::ALL.len());
        for domain in MappingDomain::ALL {
            status.push(DomainStatus {
                domain,
                max_key: self.storage.max_surrogate_key(domain).await?,
                entries: self.storage.count(domain).await?,
            });
        }
        Ok(status)
    }

    async fn open_domain(
        &self,
        domain: MappingDomain,
    ) -> Result<(IdentityMappingStore, SurrogateKeyAllocator)> {
        let allocator = SurrogateKeyAllocator::initialize(self.storage.as_ref(), domain).await?;
        let store = self.load_store(domain).await?;
        Ok((store, allocator))
    }

    async fn load_store(&self, domain: MappingDomain) -> Result<IdentityMappingStore> {
        IdentityMappingStore::load(
            self.storage.clone(),
            domain,
            self.config.pipeline.write_batch_size,
            self.dry_run,
        )
        .await
    }
}

/// De-identification of one file, then its bulk transform when asked for
fn file_passes<R: RecordValidator + BulkRecord>(
    pass: &PassConfig,
    input: &Path,
    lookup: &MappingLookup,
    transform: bool,
    import_timestamp: DateTime<Utc>,
) -> Result<Vec<PassSummary>> {
    let outputs = DeidOutputs::beside(input, R::KIND);
    let deid = StreamDeidentifier::new(pass.clone()).run::<R>(input, &outputs, lookup)?;
    let mut summaries = vec![deid];

    if transform {
        summaries.push(BulkTransform::new(pass, import_timestamp).run::<R>(&outputs.deid)?);
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryMappingStore;
    use crate::config::{ApplicationConfig, DatabaseTarget, LoggingConfig, PipelineConfig};
    use std::fs;
    use tempfile::TempDir;

    fn config() -> DeidConfig {
        DeidConfig {
            application: ApplicationConfig::default(),
            pipeline: PipelineConfig::default(),
            database_target: DatabaseTarget::Memory,
            postgresql: None,
            logging: LoggingConfig::console_only(),
        }
    }

    #[tokio::test]
    async fn test_status_of_empty_store() {
        let coordinator =
            DeidCoordinator::with_storage(config(), Arc::new(InMemoryMappingStore::new()), false);
        let status = coordinator.status().await.unwrap();
        assert_eq!(status.len(), 2);
        assert!(status.iter().all(|s| s.max_key == 0 && s.entries == 0));
    }

    #[tokio::test]
    async fn test_encounter_run_maps_then_deidentifies() {
        let dir = TempDir::new().unwrap();
        let mrn = dir.path().join("mrn.csv");
        fs::write(&mrn, "EPIC\nP1\n").unwrap();
        let encounters = dir.path().join("encounters.csv");
        fs::write(
            &encounters,
            "EncounterID,PatientID,StartDate,EndDate,ActivityTypeCD,ActivityStatusCD,ProgramCD\n\
             E1,P1,,,,,\n",
        )
        .unwrap();

        let storage = Arc::new(InMemoryMappingStore::new());
        let coordinator = DeidCoordinator::with_storage(config(), storage.clone(), false);
        coordinator.map_patients(&mrn).await.unwrap();

        let summaries = coordinator
            .deidentify(RecordKind::Encounters, &encounters, true)
            .await
            .unwrap();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[1].valid_rows, 1);

        let deid = fs::read_to_string(dir.path().join("deid/encounters.csv")).unwrap();
        assert_eq!(deid.lines().nth(1).unwrap(), "1,1,,,,,");
        assert!(dir.path().join("deid/bcp/visit_dimension.bcp").is_file());
    }

    #[tokio::test]
    async fn test_dry_run_from_config() {
        let mut cfg = config();
        cfg.application.dry_run = true;
        let coordinator =
            DeidCoordinator::with_storage(cfg, Arc::new(InMemoryMappingStore::new()), false);
        assert!(coordinator.is_dry_run());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_fact_runs_on_spawned_tasks() {
        let storage = Arc::new(InMemoryMappingStore::new());
        let coordinator = Arc::new(DeidCoordinator::with_storage(config(), storage, false));
        let dir = TempDir::new().unwrap();
        let mrn = dir.path().join("mrn.csv");
        fs::write(&mrn, "EPIC\nP1\n").unwrap();
        coordinator.map_patients(&mrn).await.unwrap();

        let mut handles = Vec::new();
        for name in ["site_a", "site_b"] {
            let site = dir.path().join(name);
            fs::create_dir(&site).unwrap();
            let facts = site.join("facts.csv");
            fs::write(
                &facts,
                "EncounterID,PatientID,ConceptCD,ProviderID,StartDate,ModifierCD,InstanceNum,value,UnitCD\n\
                 ,P1,C1,,,,,5,mg\n",
            )
            .unwrap();
            let coordinator = coordinator.clone();
            handles.push(tokio::spawn(async move {
                coordinator.deidentify(RecordKind::Facts, &facts, true).await
            }));
        }

        for handle in handles {
            let summaries = handle.await.unwrap().unwrap();
            assert_eq!(summaries.len(), 2);
            assert_eq!(summaries[0].valid_rows, 1);
        }
        assert!(dir.path().join("site_a/deid/bcp/observation_fact.bcp").is_file());
        assert!(dir.path().join("site_b/deid/bcp/observation_fact.bcp").is_file());
    }
}
