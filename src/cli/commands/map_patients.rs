//! `map-patients` command

use crate::cli::commands::{connect, fail, print_summary};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the map-patients command
#[derive(Args, Debug)]
pub struct MapPatientsArgs {
    /// MRN file; its header names the source system of each column
    pub mrn_file: PathBuf,

    /// Dry run mode - allocate keys without persisting mapping entries
    #[arg(long)]
    pub dry_run: bool,
}

impl MapPatientsArgs {
    /// Execute the map-patients command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(mrn_file = %self.mrn_file.display(), "Starting map-patients command");

        let coordinator = match connect(config_path, self.dry_run).await {
            Ok(coordinator) => coordinator,
            Err(code) => return Ok(code),
        };

        if coordinator.is_dry_run() {
            println!("🔍 DRY RUN MODE - No mapping entries will be written");
            println!();
        }

        match coordinator.map_patients(&self.mrn_file).await {
            Ok(summary) => {
                println!("✅ Patient mapping completed");
                print_summary(&summary);
                Ok(0)
            }
            Err(e) => Ok(fail(&e, "Patient mapping failed")),
        }
    }
}
