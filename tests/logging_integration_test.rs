//! Integration tests for logging functionality

use deid_loader::config::LoggingConfig;
use deid_loader::logging::init_logging;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(config.local_enabled);
    assert_eq!(config.local_path, "logs");
    assert_eq!(config.local_rotation, "daily");
    assert_eq!(config.local_max_size_mb, 100);
}

#[test]
fn test_console_only_config() {
    let config = LoggingConfig::console_only();
    assert!(!config.local_enabled);
}

#[test]
fn test_invalid_level_is_rejected_before_init() {
    let err = init_logging("verbose", &LoggingConfig::console_only()).err().unwrap();
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("Invalid log level"));
}

// The global subscriber can be set once per process, so both initializations live in one test
#[test]
fn test_init_creates_log_directory_once() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("nested").join("logs");

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
        local_max_size_mb: 10,
    };
    assert!(!log_path.exists());

    let guard = init_logging("debug", &config).unwrap();
    assert!(log_path.is_dir());

    let second = init_logging("info", &LoggingConfig::console_only());
    assert!(second.is_err());

    drop(guard);
}
