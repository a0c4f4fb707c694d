use cadence_core::config::{CadenceConfig, ConfigManager, ConfigurationError};
use std::collections::HashMap;
use std::path::PathBuf;

fn shipped_config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

#[test]
fn test_shipped_base_config_matches_defaults() {
    let manager =
        ConfigManager::load_with_overrides(Some(shipped_config_dir()), "development", Some(HashMap::new()))
            .unwrap();
    assert_eq!(manager.config(), &CadenceConfig::default());
}

#[test]
fn test_shipped_test_environment_overrides() {
    let manager =
        ConfigManager::load_with_overrides(Some(shipped_config_dir()), "test", Some(HashMap::new()))
            .unwrap();
    let config = manager.config();

    assert_eq!(config.batching.max_sample_count, 100);
    assert_eq!(config.batching.max_read_count, 10);
    assert!(!config.batching.prefetch_enabled);
    assert_eq!(config.sequencer.max_in_flight_bundles, 2);
    // Untouched keys keep the base file's values
    assert_eq!(config.sequencer.retry_attempts, 2);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(manager.environment(), "test");
}

#[test]
fn test_environment_variables_override_files() {
    let overrides = HashMap::from([
        ("CADENCE_BATCHING__MAX_READ_COUNT".to_string(), "7".to_string()),
        ("CADENCE_SEQUENCER__PERSIST_CUMULATIVE_LINEAGE".to_string(), "false".to_string()),
    ]);
    let manager =
        ConfigManager::load_with_overrides(Some(shipped_config_dir()), "test", Some(overrides)).unwrap();

    assert_eq!(manager.config().batching.max_read_count, 7);
    assert!(!manager.config().sequencer.persist_cumulative_lineage);
    assert_eq!(manager.config().batching.max_sample_count, 100);
}

#[test]
fn test_zero_read_bound_rejected() {
    let overrides = HashMap::from([(
        "CADENCE_BATCHING__MAX_READ_COUNT".to_string(),
        "0".to_string(),
    )]);
    let err = ConfigManager::load_with_overrides(Some(shipped_config_dir()), "test", Some(overrides))
        .err()
        .unwrap();
    assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
}

#[test]
fn test_missing_directory_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ConfigManager::load_with_overrides(
        Some(dir.path().join("absent")),
        "production",
        Some(HashMap::new()),
    )
    .unwrap();
    assert_eq!(manager.config(), &CadenceConfig::default());
}
