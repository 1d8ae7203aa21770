//! Core pipeline logic.
//!
//! # Modules
//!
//! - [`mapping`] - Surrogate key allocation, mapping cache and mapping passes
//! - [`validate`] - Field rules and id resolution per record kind
//! - [`deid`] - Streaming de-identification, batched output and pass coordination
//! - [`transform`] - Bulk-load files from de-identified files
//!
//! # Workflow
//!
//! 1. **Map patients**: assign keys to every alias of an MRN file
//! 2. **Map encounters**: assign keys to the encounters of an encounter file
//! 3. **De-identify**: validate each row, substitute keys, route valid and invalid rows
//! 4. **Transform** (optional): write the headerless bulk-load file
//!
//! # Example
//!
//! ```rust,no_run
//! use deid_loader::config::load_config;
//! use deid_loader::core::deid::DeidCoordinator;
//! use deid_loader::domain::RecordKind;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("deid.toml")?;
//! let coordinator = DeidCoordinator::new(config, false).await?;
//!
//! coordinator.map_patients(Path::new("data/mrn.csv")).await?;
//! let summaries = coordinator
//!     .deidentify(RecordKind::Encounters, Path::new("data/encounters.csv"), true)
//!     .await?;
//!
//! for summary in &summaries {
//!     println!("{}: {} valid, {} invalid", summary.kind, summary.valid_rows, summary.invalid_rows);
//! }
//! # Ok(())
//! # }
//! ```

pub mod deid;
pub mod mapping;
pub mod transform;
pub mod validate;
