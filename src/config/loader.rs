//! Configuration Loader
//!
//! Environment-aware configuration loading. Handles file discovery, environment detection,
//! and layering of file and environment-variable sources through the `config` crate.

use super::error::{ConfigResult, ConfigurationError};
use super::CadenceConfig;
use crate::constants::{CONFIG_FILE_STEM, ENV_PREFIX};
use config::{Config, Environment, File};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub struct ConfigManager {
    config: CadenceConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_overrides(config_dir, environment, None)
    }

    /// Load configuration with an explicit environment-variable map in place of the process
    /// environment. Lets tests exercise `CADENCE_` overrides without touching global state.
    pub fn load_with_overrides(
        config_dir: Option<PathBuf>,
        environment: &str,
        env_source: Option<HashMap<String, String>>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment = %environment,
            directory = %config_directory.display(),
            "Loading configuration"
        );

        let config = Self::build_config(&config_directory, environment, env_source)?;
        config.validate()?;

        info!(
            environment = %environment,
            max_sample_count = config.batching.max_sample_count,
            max_read_count = config.batching.max_read_count,
            prefetch_enabled = config.batching.prefetch_enabled,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration, validating it first
    pub fn from_config(config: CadenceConfig, environment: &str) -> ConfigResult<ConfigManager> {
        config.validate()?;
        Ok(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: PathBuf::from("config"),
        })
    }

    fn build_config(
        config_directory: &Path,
        environment: &str,
        env_source: Option<HashMap<String, String>>,
    ) -> ConfigResult<CadenceConfig> {
        let defaults = Config::try_from(&CadenceConfig::default())?;
        let base_file = config_directory.join(CONFIG_FILE_STEM);
        let env_file = config_directory.join(format!("{CONFIG_FILE_STEM}.{environment}"));

        if !base_file.with_extension("toml").exists() {
            debug!(
                path = %base_file.with_extension("toml").display(),
                "Base configuration file not found, using defaults"
            );
        }

        let builder = Config::builder()
            .add_source(defaults)
            .add_source(File::from(base_file).required(false))
            .add_source(File::from(env_file).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env_source),
            );

        let merged = builder.build()?;
        merged
            .try_deserialize::<CadenceConfig>()
            .map_err(ConfigurationError::from)
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &CadenceConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect current environment: `CADENCE_ENV || APP_ENV || 'development'`
    pub fn detect_environment() -> String {
        env::var("CADENCE_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        let possible_dirs = [
            PathBuf::from("config"),
            PathBuf::from("../config"),
            PathBuf::from("../../config"),
        ];

        for dir in possible_dirs {
            if dir.join(format!("{CONFIG_FILE_STEM}.toml")).exists() {
                debug!(directory = %dir.display(), "Found config directory");
                return dir;
            }
        }

        PathBuf::from("config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_missing_directory_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
                .unwrap();
        assert_eq!(manager.config(), &CadenceConfig::default());
        assert_eq!(manager.environment(), "test");
    }

    #[test]
    fn test_environment_file_overrides_base() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "cadence.toml",
            "[batching]\nmax_sample_count = 5000\nmax_read_count = 40\n",
        );
        write(
            dir.path(),
            "cadence.production.toml",
            "[batching]\nmax_read_count = 90\n",
        );

        let manager = ConfigManager::load_from_directory_with_env(
            Some(dir.path().to_path_buf()),
            "production",
        )
        .unwrap();
        assert_eq!(manager.config().batching.max_sample_count, 5000);
        assert_eq!(manager.config().batching.max_read_count, 90);
    }

    #[test]
    fn test_env_variables_override_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "cadence.toml", "[sequencer]\nmax_in_flight_bundles = 3\n");

        let overrides = HashMap::from([(
            "CADENCE_SEQUENCER__MAX_IN_FLIGHT_BUNDLES".to_string(),
            "9".to_string(),
        )]);
        let manager = ConfigManager::load_with_overrides(
            Some(dir.path().to_path_buf()),
            "test",
            Some(overrides),
        )
        .unwrap();
        assert_eq!(manager.config().sequencer.max_in_flight_bundles, 9);
    }

    #[test]
    fn test_invalid_bounds_fail_validation() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "cadence.toml", "[batching]\nmax_read_count = 0\n");

        let result =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test");
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "cadence.toml", "[batching\nmax_read_count = ");

        let result =
            ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test");
        assert!(matches!(result, Err(ConfigurationError::Parse { .. })));
    }
}
