//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `PRESSROOM_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `PRESSROOM_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `PRESSROOM_STORAGE__RETENTION=12h` sets the `storage.retention` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use pressroom::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}", config.bind_address());
//! # Ok(())
//! # }
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "PRESSROOM_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Output format for the tracing fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Directory holding template layout files (`*.toml`)
    pub templates_dir: PathBuf,
    /// Artifact storage configuration
    pub storage: StorageConfig,
    /// Allowed CORS origins; "*" allows any origin
    pub cors_allowed_origins: Vec<String>,
    /// Enable Prometheus metrics endpoint at `/internal/metrics`
    pub enable_metrics: bool,
    /// Log output format (plain console output or JSON lines)
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            templates_dir: PathBuf::from("templates"),
            storage: StorageConfig::default(),
            cors_allowed_origins: vec!["*".to_string()],
            enable_metrics: false,
            log_format: LogFormat::Plain,
        }
    }
}

/// Artifact store configuration.
///
/// Durations accept humantime strings ("30s", "12h", "7d").
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory where generated documents are persisted
    pub root: PathBuf,
    /// How long an artifact stays retrievable before it becomes eligible for eviction
    #[serde(with = "humantime_serde")]
    pub retention: Duration,
    /// Artifacts younger than this are never evicted, so an eviction pass
    /// cannot remove a file an in-flight retrieval is about to read
    #[serde(with = "humantime_serde")]
    pub eviction_grace: Duration,
    /// How often the background eviction sweep runs
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("generated_pdfs"),
            retention: Duration::from_secs(24 * 60 * 60),
            eviction_grace: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("PRESSROOM_").split("__"))
    }

    fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Config validation: port must be non-zero".to_string());
        }
        if self.storage.retention.is_zero() {
            return Err("Config validation: storage.retention must be non-zero".to_string());
        }
        if self.storage.sweep_interval < Duration::from_secs(1) {
            return Err("Config validation: storage.sweep_interval must be at least 1 second".to_string());
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn test_args(path: &str) -> Args {
        Args {
            config: path.to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_defaults_without_config_file() {
        Jail::expect_with(|_jail| {
            let config = Config::load(&test_args("missing.yaml"))?;

            assert_eq!(config.port, 8000);
            assert_eq!(config.storage.retention, Duration::from_secs(86400));
            assert_eq!(config.log_format, LogFormat::Plain);
            Ok(())
        });
    }

    #[test]
    fn test_yaml_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
port: 9100
templates_dir: layouts
storage:
  root: /var/lib/pressroom/artifacts
  retention: 12h
  eviction_grace: 30s
  sweep_interval: 1m
log_format: json
"#,
            )?;

            let config = Config::load(&test_args("test.yaml"))?;

            assert_eq!(config.port, 9100);
            assert_eq!(config.templates_dir, PathBuf::from("layouts"));
            assert_eq!(config.storage.retention, Duration::from_secs(12 * 3600));
            assert_eq!(config.storage.eviction_grace, Duration::from_secs(30));
            assert_eq!(config.storage.sweep_interval, Duration::from_secs(60));
            assert_eq!(config.log_format, LogFormat::Json);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_yaml() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "port: 9100\n")?;
            jail.set_env("PRESSROOM_PORT", "9200");
            jail.set_env("PRESSROOM_STORAGE__RETENTION", "1h");

            let config = Config::load(&test_args("test.yaml"))?;

            assert_eq!(config.port, 9200);
            assert_eq!(config.storage.retention, Duration::from_secs(3600));
            Ok(())
        });
    }

    #[test]
    fn test_rejects_zero_retention() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "storage:\n  retention: 0s\n")?;

            assert!(Config::load(&test_args("test.yaml")).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_rejects_unknown_fields() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "listen_port: 9100\n")?;

            assert!(Config::load(&test_args("test.yaml")).is_err());
            Ok(())
        });
    }
}
