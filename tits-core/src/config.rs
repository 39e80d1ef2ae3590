//! Store connection settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::error::{TitsError, TitsResult};

/// The only time precision the series layer writes and reads with
pub const TIME_PRECISION_MS: &str = "ms";

/// Config file read when `TITS_CONFIG_PATH` is not set, if it exists
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yml";

/// Environment section used when `TITS_ENV` is not set
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Layout of the config file: one store section per environment
#[derive(Debug, Deserialize)]
struct ConfigFile {
    influxdb: HashMap<String, StoreConfig>,
}

/// Connection configuration for the time-series store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database name
    #[serde(alias = "db_name")]
    pub database: String,

    /// Username for authentication
    #[serde(alias = "db_user")]
    pub username: String,

    /// Password for authentication
    #[serde(alias = "db_pw")]
    pub password: String,

    /// Store host name
    pub host: String,

    /// Store HTTP API port
    pub port: u16,

    /// Precision of timestamps on the wire
    pub time_precision: String,

    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: "tits_development".to_string(),
            username: "root".to_string(),
            password: "root".to_string(),
            host: "localhost".to_string(),
            port: 8086,
            time_precision: TIME_PRECISION_MS.to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

impl StoreConfig {
    /// Load configuration from file, environment variables, and defaults.
    ///
    /// The file is `TITS_CONFIG_PATH`, or `config/config.yml` when present,
    /// and the section is picked by `TITS_ENV` (default `development`).
    /// `TITS_INFLUX_*` variables override whatever the file sets.
    pub fn load() -> TitsResult<Self> {
        let environment =
            env::var("TITS_ENV").unwrap_or_else(|_| DEFAULT_ENVIRONMENT.to_string());

        let mut config = if let Ok(config_path) = env::var("TITS_CONFIG_PATH") {
            Self::load_from_file(&config_path, &environment)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load_from_file(DEFAULT_CONFIG_PATH, &environment)?
        } else {
            Self::default()
        };

        if let Ok(database) = env::var("TITS_INFLUX_DATABASE") {
            config.database = database;
        }

        if let Ok(username) = env::var("TITS_INFLUX_USERNAME") {
            config.username = username;
        }

        if let Ok(password) = env::var("TITS_INFLUX_PASSWORD") {
            config.password = password;
        }

        if let Ok(host) = env::var("TITS_INFLUX_HOST") {
            config.host = host;
        }

        if let Ok(port) = env::var("TITS_INFLUX_PORT") {
            config.port = port.parse().map_err(|e| {
                TitsError::configuration(format!("Invalid TITS_INFLUX_PORT {:?}: {}", port, e))
            })?;
        }

        if let Ok(timeout) = env::var("TITS_INFLUX_TIMEOUT_MS") {
            config.request_timeout_ms = timeout.parse().map_err(|e| {
                TitsError::configuration(format!(
                    "Invalid TITS_INFLUX_TIMEOUT_MS {:?}: {}",
                    timeout, e
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load the `environment` section of a YAML config file
    pub fn load_from_file<P: AsRef<Path>>(path: P, environment: &str) -> TitsResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            TitsError::configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml_str(&contents, environment).map_err(|e| {
            TitsError::configuration(format!("{} (in {})", e, path.display()))
        })
    }

    /// Parse the `environment` section of YAML config text.
    ///
    /// ```yaml
    /// influxdb:
    ///   development:
    ///     db_name: tits_development
    ///     host: localhost
    ///     port: 8086
    /// ```
    pub fn from_yaml_str(contents: &str, environment: &str) -> TitsResult<Self> {
        let mut file: ConfigFile = serde_yaml::from_str(contents)
            .map_err(|e| TitsError::configuration(format!("Failed to parse config: {}", e)))?;

        file.influxdb.remove(environment).ok_or_else(|| {
            TitsError::configuration(format!(
                "No influxdb section for environment {:?}",
                environment
            ))
        })
    }

    /// Builder-style database override
    pub fn with_database<S: Into<String>>(mut self, database: S) -> Self {
        self.database = database.into();
        self
    }

    /// Builder-style host and port override
    pub fn with_address<S: Into<String>>(mut self, host: S, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Builder-style credentials override
    pub fn with_credentials<U: Into<String>, P: Into<String>>(
        mut self,
        username: U,
        password: P,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> TitsResult<()> {
        if self.database.is_empty() {
            return Err(TitsError::configuration("Database name cannot be empty"));
        }

        if self.host.is_empty() {
            return Err(TitsError::configuration("Store host cannot be empty"));
        }

        if self.port == 0 {
            return Err(TitsError::configuration("Store port must be greater than 0"));
        }

        if self.request_timeout_ms == 0 {
            return Err(TitsError::configuration(
                "Request timeout must be greater than 0",
            ));
        }

        if self.time_precision != TIME_PRECISION_MS {
            return Err(TitsError::configuration(format!(
                "Unsupported time precision {:?}, only {:?} is supported",
                self.time_precision, TIME_PRECISION_MS
            )));
        }

        Ok(())
    }

    /// Base URL of the store's HTTP API
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Get the request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = StoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.database, "tits_development");
        assert_eq!(config.base_url(), "http://localhost:8086");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_configs() {
        assert!(StoreConfig::default().with_database("").validate().is_err());
        assert!(StoreConfig::default()
            .with_address("localhost", 0)
            .validate()
            .is_err());

        let mut config = StoreConfig::default();
        config.time_precision = "s".to_string();
        assert!(matches!(
            config.validate(),
            Err(TitsError::Configuration(_))
        ));
    }

    const CONFIG_YAML: &str = r#"
influxdb:
  development:
    db_name: tits_development
    db_user: dev
    db_pw: secret
    host: localhost
    port: 8086
  test:
    db_name: tits_test
    host: influx.test
"#;

    #[test]
    fn test_yaml_sections_by_environment() {
        let development = StoreConfig::from_yaml_str(CONFIG_YAML, "development").unwrap();
        assert_eq!(development.database, "tits_development");
        assert_eq!(development.username, "dev");
        assert_eq!(development.password, "secret");

        let test = StoreConfig::from_yaml_str(CONFIG_YAML, "test").unwrap();
        assert_eq!(test.database, "tits_test");
        assert_eq!(test.host, "influx.test");
        assert_eq!(test.port, 8086);
        assert_eq!(test.username, "root");
    }

    #[test]
    fn test_yaml_errors_are_configuration_errors() {
        assert!(matches!(
            StoreConfig::from_yaml_str(CONFIG_YAML, "production"),
            Err(TitsError::Configuration(_))
        ));
        assert!(matches!(
            StoreConfig::from_yaml_str("influxdb: [1, 2", "development"),
            Err(TitsError::Configuration(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("tits-config-{}.yml", std::process::id()));
        std::fs::write(&path, CONFIG_YAML).unwrap();

        let config = StoreConfig::load_from_file(&path, "test").unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.database, "tits_test");

        assert!(StoreConfig::load_from_file(&path, "test").is_err());
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"database": "tits_test", "port": 9999}"#).unwrap();
        assert_eq!(config.database, "tits_test");
        assert_eq!(config.port, 9999);
        assert_eq!(config.username, "root");
    }
}
