//! CLI interface and argument parsing
//!
//! This module provides the command-line interface of the loader using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// deid-loader - surrogate-key de-identification of encounter and fact files
#[derive(Parser, Debug)]
#[command(name = "deid-loader")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = crate::config::DEFAULT_CONFIG_FILE, env = "DEID_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "DEID_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assign patient surrogate keys from an MRN file
    MapPatients(commands::map_patients::MapPatientsArgs),

    /// De-identify an encounter or fact file
    Deidentify(commands::deidentify::DeidentifyArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show the highest surrogate key and entry count of each mapping
    Status(commands::status::StatusArgs),
}
