//! Configuration loading shared by the Doodling binaries.
//!
//! Settings are layered, later sources overriding earlier ones:
//! 1. Built-in defaults (the `Default` impl of the target type)
//! 2. `{directory}/default.toml` (if exists)
//! 3. `{directory}/{environment}.toml` (if exists, environment from `APP_ENV`)
//! 4. An explicit file passed on the command line (must exist)
//! 5. Environment variables with the given prefix, `__` separated
//!
//! ## Example
//!
//! ```toml
//! [telemetry]
//! json_logging = true
//! log_level = "debug"
//!
//! [scheduler]
//! job_timeout_secs = 120
//! ```
//!
//! `TRENDING__SCHEDULER__JOB_TIMEOUT_SECS=60` overrides the file value.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where a layered configuration is read from
#[derive(Debug, Clone)]
pub struct ConfigSources {
    /// Directory holding `default.toml` and per-environment files
    pub directory: PathBuf,
    /// Environment name selecting `{environment}.toml`
    pub environment: Option<String>,
    /// Explicit configuration file, required to exist when set
    pub explicit_file: Option<PathBuf>,
    /// Environment variable prefix, e.g. `TRENDING`
    pub env_prefix: String,
}

impl ConfigSources {
    /// Standard sources: `config/` directory, `APP_ENV` environment
    pub fn new(env_prefix: impl Into<String>) -> Self {
        Self {
            directory: PathBuf::from("config"),
            environment: std::env::var("APP_ENV").ok(),
            explicit_file: None,
            env_prefix: env_prefix.into(),
        }
    }

    /// Add an explicit file on top of the directory files
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_file = Some(path.into());
        self
    }

    /// Read files from another directory
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }
}

/// Load `T` from its defaults and the given sources
pub fn load_layered<T>(sources: &ConfigSources) -> Result<T>
where
    T: DeserializeOwned + Serialize + Default,
{
    let defaults = config::Config::try_from(&T::default())
        .context("Failed to serialize default configuration")?;

    let mut builder = config::Config::builder()
        .add_source(defaults)
        .add_source(
            config::File::from(sources.directory.join("default"))
                .required(false),
        );

    if let Some(env) = &sources.environment {
        builder = builder.add_source(
            config::File::from(sources.directory.join(env))
                .required(false),
        );
    }

    if let Some(path) = &sources.explicit_file {
        builder = builder.add_source(config::File::from(path.clone()).required(true));
    }

    let config = builder
        .add_source(
            config::Environment::with_prefix(&sources.env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Service name attached to log records
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Enable JSON logging format
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_service_name() -> String {
    "doodling-trending".to_string()
}

fn default_json_logging() -> bool {
    false
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            json_logging: default_json_logging(),
            log_level: default_log_level(),
        }
    }
}

impl TelemetryConfig {
    /// Validate the telemetry section
    pub fn validate(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            anyhow::bail!(
                "Invalid log level '{}'. Must be one of: {}",
                self.log_level,
                valid_log_levels.join(", ")
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug, Serialize, Deserialize)]
    struct Sample {
        name: String,
        limit: u64,
        telemetry: TelemetryConfig,
    }

    impl Default for Sample {
        fn default() -> Self {
            Self {
                name: "default".to_string(),
                limit: 100,
                telemetry: TelemetryConfig::default(),
            }
        }
    }

    fn empty_dir_sources(prefix: &str) -> ConfigSources {
        ConfigSources {
            directory: std::env::temp_dir().join("doodling-config-missing"),
            environment: None,
            explicit_file: None,
            env_prefix: prefix.to_string(),
        }
    }

    #[test]
    fn test_defaults_load_without_files() {
        let sample: Sample = load_layered(&empty_dir_sources("DOODLING_TEST_DEFAULTS")).unwrap();
        assert_eq!(sample.name, "default");
        assert_eq!(sample.limit, 100);
        assert_eq!(sample.telemetry.log_level, "info");
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!(
            "doodling-config-{}.toml",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "limit = 7\n[telemetry]\nlog_level = \"debug\"").unwrap();

        let sources = empty_dir_sources("DOODLING_TEST_FILE").with_file(&path);
        let sample: Sample = load_layered(&sources).unwrap();

        assert_eq!(sample.limit, 7);
        assert_eq!(sample.name, "default");
        assert_eq!(sample.telemetry.log_level, "debug");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let sources = empty_dir_sources("DOODLING_TEST_MISSING")
            .with_file(std::env::temp_dir().join("doodling-does-not-exist.toml"));
        assert!(load_layered::<Sample>(&sources).is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let telemetry = TelemetryConfig {
            log_level: "verbose".to_string(),
            ..Default::default()
        };
        assert!(telemetry.validate().is_err());
    }
}
