//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{DatabaseTarget, DeidConfig};
use super::secret_string;
use crate::domain::errors::DeidError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into DeidConfig
/// 4. Applies environment variable overrides (DEID_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`DeidError::Configuration`] if the file can't be read or parsed, a referenced
/// environment variable is unset, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use deid_loader::config::loader::load_config;
///
/// let config = load_config("deid.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<DeidConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(DeidError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        DeidError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: DeidConfig = toml::from_str(&contents)
        .map_err(|e| DeidError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        DeidError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied unchanged.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| DeidError::Other(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(DeidError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

/// Parses a single-character delimiter override
fn parse_delimiter(name: &str, val: &str) -> Result<char> {
    let mut chars = val.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(DeidError::Configuration(format!(
            "{name} must be a single character, got '{val}'"
        ))),
    }
}

/// Applies environment variable overrides using DEID_* prefix
///
/// Environment variables follow the pattern: DEID_<SECTION>_<KEY>
/// For example: DEID_PIPELINE_MAX_VALIDATION_ERROR_COUNT, DEID_POSTGRESQL_CONNECTION_STRING
fn apply_env_overrides(config: &mut DeidConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("DEID_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("DEID_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Pipeline overrides
    if let Ok(val) = std::env::var("DEID_PIPELINE_CSV_DELIMITER") {
        config.pipeline.csv_delimiter = parse_delimiter("DEID_PIPELINE_CSV_DELIMITER", &val)?;
    }
    if let Ok(val) = std::env::var("DEID_PIPELINE_OUTPUT_DELIMITER") {
        config.pipeline.output_delimiter =
            parse_delimiter("DEID_PIPELINE_OUTPUT_DELIMITER", &val)?;
    }
    if let Ok(val) = std::env::var("DEID_PIPELINE_MAX_VALIDATION_ERROR_COUNT") {
        if let Ok(max) = val.parse() {
            config.pipeline.max_validation_error_count = max;
        }
    }
    if let Ok(val) = std::env::var("DEID_PIPELINE_WRITE_BATCH_SIZE") {
        if let Ok(size) = val.parse() {
            config.pipeline.write_batch_size = size;
        }
    }
    if let Ok(val) = std::env::var("DEID_PIPELINE_SOURCE_SYSTEM_CODE") {
        config.pipeline.source_system_code = val;
    }
    if let Ok(val) = std::env::var("DEID_PIPELINE_PROJECT_ID") {
        config.pipeline.project_id = val;
    }

    // Store overrides
    if let Ok(val) = std::env::var("DEID_DATABASE_TARGET") {
        config.database_target = match val.to_lowercase().as_str() {
            "postgresql" => DatabaseTarget::PostgreSQL,
            "memory" => DatabaseTarget::Memory,
            other => {
                return Err(DeidError::Configuration(format!(
                    "DEID_DATABASE_TARGET must be 'postgresql' or 'memory', got '{other}'"
                )))
            }
        };
    }

    if let Some(ref mut pg_config) = config.postgresql {
        if let Ok(val) = std::env::var("DEID_POSTGRESQL_CONNECTION_STRING") {
            pg_config.connection_string = secret_string(val);
        }
        if let Ok(val) = std::env::var("DEID_POSTGRESQL_MAX_CONNECTIONS") {
            if let Ok(max) = val.parse() {
                pg_config.max_connections = max;
            }
        }
        if let Ok(val) = std::env::var("DEID_POSTGRESQL_STATEMENT_TIMEOUT_SECONDS") {
            if let Ok(timeout) = val.parse() {
                pg_config.statement_timeout_seconds = timeout;
            }
        }
    }

    // Logging overrides
    if let Ok(val) = std::env::var("DEID_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("DEID_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
