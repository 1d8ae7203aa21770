//! `deidentify` command

use crate::cli::commands::{connect, fail, print_summary};
use crate::domain::{DeidError, RecordKind};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the deidentify command
#[derive(Args, Debug)]
pub struct DeidentifyArgs {
    /// Record kind of the input file (encounters or facts)
    pub kind: RecordKind,

    /// Input file
    pub file: PathBuf,

    /// Dry run mode - write output files but persist no mapping entries
    #[arg(long)]
    pub dry_run: bool,

    /// Also write the bulk-load file of the de-identified output
    #[arg(long)]
    pub transform: bool,
}

impl DeidentifyArgs {
    /// Execute the deidentify command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(
            kind = %self.kind,
            file = %self.file.display(),
            transform = self.transform,
            "Starting deidentify command"
        );

        let coordinator = match connect(config_path, self.dry_run).await {
            Ok(coordinator) => coordinator,
            Err(code) => return Ok(code),
        };

        if coordinator.is_dry_run() {
            println!("🔍 DRY RUN MODE - No mapping entries will be written");
            println!();
        }

        match coordinator
            .deidentify(self.kind, &self.file, self.transform)
            .await
        {
            Ok(summaries) => {
                println!("✅ De-identification of {} completed", self.kind);
                for summary in &summaries {
                    print_summary(summary);
                }
                Ok(0)
            }
            Err(e @ DeidError::ErrorBudgetExceeded { .. }) => {
                Ok(fail(&e, "De-identification aborted; see the error file next to the input"))
            }
            Err(e) => Ok(fail(&e, "De-identification failed")),
        }
    }
}
