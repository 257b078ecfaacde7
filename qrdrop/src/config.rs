//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `QRDROP_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `QRDROP_` override YAML values
//! 3. **DATABASE_URL** - Special case: overrides `database.url` if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `QRDROP_STORAGE__UPLOAD_DIR=/data/uploads` sets the `storage.upload_dir` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use qrdrop::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}:{}", config.host, config.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! QRDROP_PORT=8080
//! QRDROP_PUBLIC_URL=https://share.example.com
//! DATABASE_URL="sqlite:///var/lib/qrdrop/files.db"
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "QRDROP_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// All fields have defaults, so an empty (or missing) YAML file yields a runnable server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Base URL recipients use to reach the server. Share links and QR codes are built on it.
    pub public_url: Url,
    /// Set from the raw `DATABASE_URL` environment variable; replaces `database.url` on load.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// Record store settings
    pub database: DatabaseConfig,
    /// Content and static asset directories
    pub storage: StorageConfig,
    /// QR code rendering
    pub share: ShareConfig,
    /// Export traces over OTLP (configured via the standard `OTEL_*` environment variables)
    pub enable_otel_export: bool,
}

/// SQLite record store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite connection string, e.g. `sqlite://file_sharing.db` or `sqlite::memory:`
    pub url: String,
    pub pool: PoolSettings,
}

/// Connection pool settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections to maintain
    pub min_connections: u32,
    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,
    /// Time before idle connections are closed (seconds, 0 = never)
    pub idle_timeout_secs: u64,
    /// Maximum lifetime of a connection (seconds, 0 = never)
    pub max_lifetime_secs: u64,
}

/// Where uploaded content and generated QR images live on disk.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Uploaded files, stored as `{upload_dir}/{batch_id}/{filename}`
    pub upload_dir: PathBuf,
    /// QR images, stored as `{static_dir}/{batch_id}.png` and served under `/static`
    pub static_dir: PathBuf,
}

/// QR code rendering options.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShareConfig {
    /// Edge length of one QR module, in pixels
    pub module_size: u32,
    /// Surround the code with the standard quiet zone
    pub quiet_zone: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            public_url: Url::parse("http://localhost:5000").expect("default public_url is a valid URL"),
            database_url: None,
            database: DatabaseConfig::default(),
            storage: StorageConfig::default(),
            share: ShareConfig::default(),
            enable_otel_export: false,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://file_sharing.db".to_string(),
            pool: PoolSettings::default(),
        }
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            min_connections: 0,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,  // 10 minutes
            max_lifetime_secs: 1800, // 30 minutes
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            static_dir: PathBuf::from("static"),
        }
    }
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            module_size: 10,
            quiet_zone: true,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        if let Some(url) = config.database_url.take() {
            config.database.url = url;
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if !matches!(self.public_url.scheme(), "http" | "https") {
            return Err(Error::Validation {
                message: format!(
                    "Config validation: public_url must be an http(s) URL, got scheme '{}'",
                    self.public_url.scheme()
                ),
            });
        }

        if self.database.url.trim().is_empty() {
            return Err(Error::Validation {
                message: "Config validation: database.url cannot be empty".to_string(),
            });
        }

        let pool = &self.database.pool;
        if pool.max_connections == 0 {
            return Err(Error::Validation {
                message: "Config validation: database.pool.max_connections must be at least 1".to_string(),
            });
        }
        if pool.min_connections > pool.max_connections {
            return Err(Error::Validation {
                message: format!(
                    "Config validation: database.pool.min_connections ({}) cannot be greater than max_connections ({})",
                    pool.min_connections, pool.max_connections
                ),
            });
        }

        if self.share.module_size == 0 {
            return Err(Error::Validation {
                message: "Config validation: share.module_size must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            // QRDROP_CONFIG names the file itself and is consumed by clap
            .merge(Env::prefixed("QRDROP_").ignore(&["CONFIG"]).split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(path: &str) -> Args {
        Args {
            config: path.to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let config = Config::load(&args("does-not-exist.yaml"))?;

            assert_eq!(config.port, 5000);
            assert_eq!(config.public_url.as_str(), "http://localhost:5000/");
            assert_eq!(config.database.url, "sqlite://file_sharing.db");
            assert_eq!(config.storage.upload_dir, PathBuf::from("uploads"));
            assert_eq!(config.storage.static_dir, PathBuf::from("static"));
            assert_eq!(config.share.module_size, 10);
            assert!(!config.enable_otel_export);

            Ok(())
        });
    }

    #[test]
    fn test_yaml_values() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
port: 8080
public_url: https://share.example.com
storage:
  upload_dir: /data/uploads
share:
  module_size: 4
"#,
            )?;

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.port, 8080);
            assert_eq!(config.public_url.as_str(), "https://share.example.com/");
            assert_eq!(config.storage.upload_dir, PathBuf::from("/data/uploads"));
            // Unset nested fields keep their defaults
            assert_eq!(config.storage.static_dir, PathBuf::from("static"));
            assert_eq!(config.share.module_size, 4);
            assert!(config.share.quiet_zone);

            Ok(())
        });
    }

    #[test]
    fn test_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "port: 8080\n")?;

            jail.set_env("QRDROP_HOST", "127.0.0.1");
            jail.set_env("QRDROP_PORT", "9090");
            jail.set_env("QRDROP_STORAGE__STATIC_DIR", "/srv/static");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.host, "127.0.0.1");
            assert_eq!(config.port, 9090);
            assert_eq!(config.storage.static_dir, PathBuf::from("/srv/static"));
            assert_eq!(config.bind_address(), "127.0.0.1:9090");

            Ok(())
        });
    }

    #[test]
    fn test_database_url_env_overrides_database_section() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
database:
  url: sqlite://from-yaml.db
  pool:
    max_connections: 2
"#,
            )?;

            jail.set_env("DATABASE_URL", "sqlite://from-env.db");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.database.url, "sqlite://from-env.db");
            assert!(config.database_url.is_none());
            assert_eq!(config.database.pool.max_connections, 2);

            Ok(())
        });
    }

    #[test]
    fn test_unknown_fields_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "max_file_size: 100\n")?;

            assert!(Config::load(&args("test.yaml")).is_err());

            Ok(())
        });
    }

    #[test]
    fn test_validation_rejects_non_http_public_url() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "public_url: ftp://files.example.com\n")?;

            let err = Config::load(&args("test.yaml")).unwrap_err();
            assert!(err.to_string().contains("public_url"));

            Ok(())
        });
    }

    #[test]
    fn test_validation_rejects_inverted_pool_bounds() {
        let mut config = Config::default();
        config.database.pool.min_connections = 10;
        config.database.pool.max_connections = 2;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_module_size() {
        let mut config = Config::default();
        config.share.module_size = 0;

        assert!(config.validate().is_err());
    }
}
