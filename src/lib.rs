// deid-loader - surrogate-key de-identification for clinical data loads
// Copyright (c) 2025 deid-loader Contributors
// Licensed under the MIT License

//! # deid-loader
//!
//! Replaces the source identifiers of patient, encounter and observation files with
//! stable integer surrogate keys before the data is bulk-loaded into a clinical data
//! warehouse.
//!
//! ## Overview
//!
//! - **Mapping**: patient aliases and encounter ids get surrogate keys, allocated as
//!   `max + 1` and persisted append-only in a mapping store
//! - **De-identification**: every row is validated, its ids are replaced by their keys,
//!   and it lands in either the de-identified file or the error file
//! - **Error budget**: a pass stops once more rows failed than the configured maximum
//! - **Bulk transform**: de-identified files become headerless bulk-load files
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Mapping passes, validation, de-identification, bulk transform
//! - [`adapters`] - Mapping stores (PostgreSQL, in-memory)
//! - [`domain`] - Ids, records, mapping entries and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deid_loader::config::load_config;
//! use deid_loader::core::deid::DeidCoordinator;
//! use deid_loader::domain::RecordKind;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("deid.toml")?;
//!     let coordinator = DeidCoordinator::new(config, false).await?;
//!
//!     coordinator.map_patients(Path::new("mrn.csv")).await?;
//!     coordinator
//!         .deidentify(RecordKind::Facts, Path::new("facts.csv"), true)
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Fatal errors are [`domain::DeidError`]; per-row findings are
//! [`domain::ValidationMessage`]s written to the error file and never abort a pass on
//! their own.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
