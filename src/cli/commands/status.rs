//! Status command implementation
//!
//! Shows the highest surrogate key and the entry count of each mapping domain.

use crate::cli::commands::{connect, fail};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking mapping status");

        let coordinator = match connect(config_path, false).await {
            Ok(coordinator) => coordinator,
            Err(code) => return Ok(code),
        };

        let status = match coordinator.status().await {
            Ok(status) => status,
            Err(e) => return Ok(fail(&e, "Failed to read mapping status")),
        };

        println!("📊 Mapping Status ({})", coordinator.storage().store_name());
        println!();
        println!("{:<12} {:>15} {:>15}", "Domain", "Max Key", "Entries");
        println!("{}", "-".repeat(44));
        for domain in status {
            println!(
                "{:<12} {:>15} {:>15}",
                domain.domain.as_str(),
                domain.max_key,
                domain.entries
            );
        }
        println!();
        Ok(0)
    }
}
