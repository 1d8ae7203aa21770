//! CLI command implementations

pub mod deidentify;
pub mod map_patients;
pub mod status;
pub mod validate;

use crate::config::load_config;
use crate::core::deid::{DeidCoordinator, PassSummary};
use crate::domain::DeidError;
use crate::log_error_with_context;

/// Reports a failed command and returns its exit code
pub(crate) fn fail(error: &DeidError, context: &str) -> i32 {
    log_error_with_context!(error, context);
    eprintln!("❌ {context}");
    eprintln!("   Error: {error}");
    error.exit_code()
}

/// Loads the configuration and connects to the mapping store
pub(crate) async fn connect(
    config_path: &str,
    dry_run: bool,
) -> std::result::Result<DeidCoordinator, i32> {
    let config = load_config(config_path)
        .map_err(|e| fail(&e, "Failed to load configuration file"))?;
    DeidCoordinator::new(config, dry_run)
        .await
        .map_err(|e| fail(&e, "Failed to connect to the mapping store"))
}

pub(crate) fn print_summary(summary: &PassSummary) {
    println!("  {} of {}", summary.kind, summary.input.display());
    println!("    Rows read:        {}", summary.rows_read);
    println!("    Valid:            {}", summary.valid_rows);
    println!("    Invalid:          {}", summary.invalid_rows);
    if summary.skipped_rows > 0 {
        println!("    Skipped:          {}", summary.skipped_rows);
    }
    if summary.keys_allocated > 0 || summary.entries_appended > 0 {
        println!("    Keys allocated:   {}", summary.keys_allocated);
        println!("    Entries appended: {}", summary.entries_appended);
    }
    for output in &summary.outputs {
        println!("    Output:           {}", output.display());
    }
    println!("    Duration:         {:.2}s", summary.duration.as_secs_f64());
}
