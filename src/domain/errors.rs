//! Domain error types
//!
//! This module defines the closed error taxonomy of the loader. Per-row problems are
//! [`ValidationMessage`]s and never abort a pass on their own; everything in [`DeidError`]
//! is fatal for the pass that raised it. Third-party error types are converted to strings
//! so they don't leak through the public API.

use crate::domain::ids::MappingDomain;
use std::fmt;
use thiserror::Error;

/// Main loader error type
///
/// Every fallible operation in the crate returns this type (see [`crate::domain::Result`]).
#[derive(Debug, Error)]
pub enum DeidError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Missing or unreadable input file, or a header that doesn't match the record kind.
    /// Raised before a pass starts.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// The running count of invalid rows went past the configured maximum
    #[error("Exiting as max error records limit reached - {max_errors} (observed {observed})")]
    ErrorBudgetExceeded {
        /// Configured maximum validation error count
        max_errors: usize,
        /// Invalid rows observed when the pass aborted
        observed: usize,
    },

    /// Mapping store failures
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O errors on input or output files
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl DeidError {
    /// Process exit code used by the CLI for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            DeidError::Configuration(_) => 2,
            DeidError::ErrorBudgetExceeded { .. } => 3,
            DeidError::MalformedInput(_) => 4,
            _ => 5,
        }
    }
}

/// Mapping store errors
///
/// Failures reading from or writing to the identity mapping sink. These are never
/// retried inside a pass.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to connect or to obtain a pooled connection
    #[error("Failed to connect to mapping store: {0}")]
    ConnectionFailed(String),

    /// A read query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A batched insert failed; nothing from that batch was persisted
    #[error("Failed to append {count} {domain} mapping entries: {message}")]
    AppendFailed {
        domain: MappingDomain,
        count: usize,
        message: String,
    },

    /// Schema creation failed
    #[error("Failed to prepare mapping schema: {0}")]
    SchemaFailed(String),

    /// A stored row could not be converted into a mapping entry
    #[error("Invalid stored mapping: {0}")]
    InvalidRow(String),
}

/// A single per-row validation finding
///
/// The `Display` text is what ends up in the `ValidationError` column of the error file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationMessage {
    /// A required field is empty; carries the message label of the field
    Missing(&'static str),

    /// A date field is present but doesn't match `YYYY-MM-DD hh:mm:ss`
    InvalidDate(&'static str),

    /// A non-empty reference has no surrogate key in its domain
    MappingNotFound(MappingDomain),
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationMessage::Missing(field) => write!(f, "{field} is Null"),
            ValidationMessage::InvalidDate(field) => write!(f, "Invalid {field} date format"),
            ValidationMessage::MappingNotFound(domain) => {
                write!(f, "{} mapping not found", domain.label())
            }
        }
    }
}

/// Validation failure of one input row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// 1-based data row number in the input file (header excluded)
    pub row_number: usize,

    /// Findings in the order they were detected
    pub messages: Vec<ValidationMessage>,
}

impl ValidationError {
    /// Creates a validation error for a row
    pub fn new(row_number: usize, messages: Vec<ValidationMessage>) -> Self {
        Self {
            row_number,
            messages,
        }
    }

    /// Comma-joined messages, as written to the error file
    pub fn joined(&self) -> String {
        self.messages
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Returns true if any finding is a missing mapping
    pub fn has_mapping_miss(&self) -> bool {
        self.messages
            .iter()
            .any(|m| matches!(m, ValidationMessage::MappingNotFound(_)))
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row_number, self.joined())
    }
}

impl std::error::Error for ValidationError {}

// Conversion from std::io::Error
impl From<std::io::Error> for DeidError {
    fn from(err: std::io::Error) -> Self {
        DeidError::Io(err.to_string())
    }
}

// Conversion from csv::Error
impl From<csv::Error> for DeidError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            DeidError::Io(err.to_string())
        } else {
            DeidError::Serialization(err.to_string())
        }
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for DeidError {
    fn from(err: toml::de::Error) -> Self {
        DeidError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deid_error_display() {
        let err = DeidError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_budget_error_display() {
        let err = DeidError::ErrorBudgetExceeded {
            max_errors: 10,
            observed: 11,
        };
        assert_eq!(
            err.to_string(),
            "Exiting as max error records limit reached - 10 (observed 11)"
        );
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_storage_error_conversion() {
        let storage_err = StorageError::QueryFailed("timeout".to_string());
        let err: DeidError = storage_err.into();
        assert!(matches!(err, DeidError::Storage(_)));
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_append_failed_display() {
        let err = StorageError::AppendFailed {
            domain: MappingDomain::Encounter,
            count: 100,
            message: "duplicate key".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to append 100 encounter mapping entries: duplicate key"
        );
    }

    #[test]
    fn test_validation_message_text() {
        assert_eq!(
            ValidationMessage::Missing("Encounter ID").to_string(),
            "Encounter ID is Null"
        );
        assert_eq!(
            ValidationMessage::InvalidDate("start").to_string(),
            "Invalid start date format"
        );
        assert_eq!(
            ValidationMessage::MappingNotFound(MappingDomain::Patient).to_string(),
            "Patient mapping not found"
        );
    }

    #[test]
    fn test_validation_error_joined() {
        let err = ValidationError::new(
            3,
            vec![
                ValidationMessage::Missing("Encounter ID"),
                ValidationMessage::MappingNotFound(MappingDomain::Encounter),
            ],
        );
        assert_eq!(err.joined(), "Encounter ID is Null,Encounter mapping not found");
        assert!(err.has_mapping_miss());
        assert_eq!(
            err.to_string(),
            "row 3: Encounter ID is Null,Encounter mapping not found"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: DeidError = io_err.into();
        assert!(matches!(err, DeidError::Io(_)));
    }

    #[test]
    fn test_csv_error_conversion() {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader("a,b\nc\n".as_bytes());
        let csv_err = reader.records().nth(1).unwrap().unwrap_err();
        let err: DeidError = csv_err.into();
        assert!(matches!(err, DeidError::Serialization(_)));
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: DeidError = toml_err.into();
        assert!(matches!(err, DeidError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_deid_error_implements_std_error() {
        let err = DeidError::MalformedInput("missing header".to_string());
        let _: &dyn std::error::Error = &err;
        assert_eq!(err.exit_code(), 4);
    }
}
