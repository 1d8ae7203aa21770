//! Validate config command implementation

use crate::adapters::postgresql::client::redact_connection_string;
use crate::config::load_config;
use crate::config::schema::DatabaseTarget;
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    ///
    /// Loading already validates; this command reports the outcome without touching the
    /// mapping store.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(e.exit_code());
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!("  Input Delimiter: {:?}", config.pipeline.csv_delimiter);
        println!("  Output Delimiter: {:?}", config.pipeline.output_delimiter);
        println!(
            "  Max Validation Errors: {}",
            config.pipeline.max_validation_error_count
        );
        println!("  Write Batch Size: {}", config.pipeline.write_batch_size);
        println!("  Source System: {}", config.pipeline.source_system_code);
        println!("  Project: {}", config.pipeline.project_id);

        match config.database_target {
            DatabaseTarget::PostgreSQL => {
                if let Some(ref pg_config) = config.postgresql {
                    println!("  Mapping Store: PostgreSQL");
                    println!(
                        "  PostgreSQL Connection: {}",
                        redact_connection_string(pg_config.connection_string.expose_secret().as_str())
                    );
                    println!("  Max Connections: {}", pg_config.max_connections);
                    println!("  SSL Mode: {}", pg_config.ssl_mode);
                }
            }
            DatabaseTarget::Memory => {
                println!("  Mapping Store: in-memory (nothing is persisted)");
            }
        }
        println!();
        Ok(0)
    }
}
