//! Bulk-load transformation
//!
//! De-identified encounter and fact files are rewritten into the column layout of the
//! visit dimension and observation fact tables, headerless, for the external bulk-copy tool.

pub mod bulk;

pub use bulk::{BulkRecord, BulkTransform, ObservationValue};
