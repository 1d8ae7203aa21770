//! Configuration management for the loader.
//!
//! TOML configuration files with `${VAR_NAME}` substitution, `DEID_<SECTION>_<KEY>`
//! environment overrides, serde defaults for every optional setting and validation on load.
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - log level and dry-run switch
//! - [`PipelineConfig`] - delimiters, error budget, batch size, source system and project
//! - [`PostgreSQLConfig`] - mapping store connection
//! - [`LoggingConfig`] - local file logging
//!
//! # Example Configuration
//!
//! ```toml
//! database_target = "postgresql"
//!
//! [application]
//! log_level = "info"
//!
//! [pipeline]
//! csv_delimiter = ","
//! output_delimiter = "|"
//! max_validation_error_count = 100
//! write_batch_size = 100
//! source_system_code = "DEMO"
//! project_id = "DEMO"
//!
//! [postgresql]
//! connection_string = "${DEID_POSTGRESQL_CONNECTION_STRING}"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, DatabaseTarget, DeidConfig, LoggingConfig, PipelineConfig,
    PostgreSQLConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};

/// Configuration file used when neither `--config` nor `DEID_CONFIG` is given
pub const DEFAULT_CONFIG_FILE: &str = "deid.toml";
