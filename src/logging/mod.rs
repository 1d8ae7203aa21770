//! Logging and observability
//!
//! Structured logging through `tracing`:
//! - console output at the configured level
//! - optional JSON lines in a rolling local file
//!
//! # Example
//!
//! ```no_run
//! use deid_loader::logging::init_logging;
//! use deid_loader::config::LoggingConfig;
//!
//! let config = LoggingConfig::console_only();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(input = "encounters.csv", "Pass started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use deid_loader::log_error_with_context;
/// use deid_loader::domain::DeidError;
///
/// let error = DeidError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
