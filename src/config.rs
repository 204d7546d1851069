//! Application configuration using Figment.
//!
//! Configuration is loaded from:
//! 1. `config/mircat.toml` (base configuration, optional)
//! 2. Environment variables prefixed with `MIRCAT_`, with `__` separating
//!    nesting levels (`MIRCAT_LASER__BACKEND=mock`)
//!
//! The `[laser]` table is the driver table handed to
//! [`MircatFactory`](crate::factory::MircatFactory).
//!
//! # Example
//! ```no_run
//! use mircat::config::MircatConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MircatConfig::load()?;
//! println!("backend: {}", config.laser.backend);
//! # Ok(())
//! # }
//! ```

use crate::factory::MircatDriverConfig;
use crate::tracing_setup::{parse_log_level, OutputFormat};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/mircat.toml";

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "MIRCAT_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to encode driver table: {0}")]
    Encode(#[from] toml::ser::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Figment(Box::new(e))
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MircatConfig {
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Driver table for the MIRcat factory
    #[serde(default)]
    pub laser: MircatDriverConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: OutputFormat,
}

fn default_name() -> String {
    "mircat".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_format: OutputFormat::default(),
        }
    }
}

impl MircatConfig {
    /// Load from [`DEFAULT_CONFIG_PATH`] and the environment.
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from `path` and the environment. A missing file contributes
    /// nothing; every field has a default.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    /// [`Self::load_from`] followed by [`Self::validate`].
    pub fn load_validated(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::load_from(path)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Semantic checks serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        parse_log_level(&self.application.log_level)?;
        self.laser
            .validate()
            .map_err(|e| format!("[laser] {e}"))
    }

    /// The `[laser]` table as the factory consumes it.
    pub fn driver_table(&self) -> Result<toml::Value, ConfigError> {
        Ok(toml::Value::try_from(&self.laser)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::Backend;
    use figment::Jail;
    use serial_test::serial;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        let config = MircatConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.application.log_level, "info");
        assert_eq!(config.laser.backend, Backend::Dll);
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = MircatConfig::default();
        config.application.log_level = "loud".to_string();
        assert!(config.validate().unwrap_err().contains("loud"));
    }

    #[test]
    fn test_invalid_laser_section_is_prefixed() {
        let mut config = MircatConfig::default();
        config.laser.preferred_qcl = 0;
        assert!(config.validate().unwrap_err().starts_with("[laser]"));
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[application]
log_level = "debug"
log_format = "json"

[laser]
backend = "mock"
preferred_qcl = 2
wait_timeout_ms = 10000
"#
        )
        .unwrap();

        let config = MircatConfig::load_validated(file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.application.log_format, OutputFormat::Json);
        assert_eq!(config.laser.backend, Backend::Mock);
        assert_eq!(config.laser.preferred_qcl, 2);
        assert_eq!(config.laser.wait_timeout_ms, 10_000);
        assert_eq!(config.laser.poll_interval_ms, 500);
    }

    #[test]
    #[serial]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = MircatConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, MircatConfig::default());
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            std::fs::create_dir(jail.directory().join("config")).map_err(|e| e.to_string())?;
            jail.create_file(
                "config/mircat.toml",
                r#"
[laser]
backend = "dll"
sdk_dir = "C:/MIRcat_laser/SDK"
preferred_qcl = 3
"#,
            )?;
            jail.set_env("MIRCAT_LASER__PREFERRED_QCL", "4");
            jail.set_env("MIRCAT_APPLICATION__LOG_LEVEL", "warn");

            let config = MircatConfig::load()?;
            assert_eq!(config.laser.preferred_qcl, 4);
            assert_eq!(config.laser.backend, Backend::Dll);
            assert_eq!(
                config.laser.sdk_dir,
                Some(PathBuf::from("C:/MIRcat_laser/SDK"))
            );
            assert_eq!(config.application.log_level, "warn");
            Ok(())
        });
    }

    #[test]
    #[serial]
    fn test_sdk_dir_env_var_is_not_config() {
        Jail::expect_with(|jail| {
            jail.set_env("MIRCAT_SDK_DIR", "/opt/mircat");
            let config = MircatConfig::load()?;
            assert_eq!(config.laser.sdk_dir, None);
            Ok(())
        });
    }

    #[test]
    #[serial]
    fn test_load_validated_rejects_bad_values() {
        Jail::expect_with(|jail| {
            jail.create_file("bad.toml", "[laser]\npreferred_qcl = 9\n")?;
            let err = MircatConfig::load_validated("bad.toml").unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)));
            Ok(())
        });
    }

    #[test]
    fn test_driver_table_round_trips() {
        let mut config = MircatConfig::default();
        config.laser.backend = Backend::Mock;
        config.laser.auto_connect = true;

        let table = config.driver_table().unwrap();
        assert_eq!(table["backend"].as_str(), Some("mock"));
        assert!(table.get("library_path").is_none());

        let back: MircatDriverConfig = table.try_into().unwrap();
        assert_eq!(back, config.laser);
    }
}
