//! De-identification passes
//!
//! - [`reader`] - Input files and header checks
//! - [`writer`] - Batched output files
//! - [`deidentifier`] - The streaming validate-substitute-route pass
//! - [`summary`] - Per-pass counters and reporting
//! - [`coordinator`] - Runs the passes behind each CLI command

pub mod coordinator;
pub mod deidentifier;
pub mod reader;
pub mod summary;
pub mod writer;

pub use coordinator::{DeidCoordinator, DomainStatus};
pub use deidentifier::{DeidOutputs, PassConfig, StreamDeidentifier, ERROR_COLUMNS};
pub use summary::{PassKind, PassOutcome, PassSummary};
pub use writer::{BatchWriter, OutputFormat, Quoting};
