//! BPJS report backend core library
//!
//! Data access for the registration dashboard: date-range queries over the
//! hospital's MySQL database, a result cache, and the JSON API serving them.

pub mod api;
pub mod cache;
pub mod db;
pub mod error;
pub mod models;
pub mod report;

/// Application configuration
pub mod config {
    use std::collections::HashMap;
    use std::fmt;

    use config::{ConfigError, Environment, File};
    use serde::Deserialize;

    #[derive(Debug, Clone, Deserialize)]
    pub struct Config {
        pub server: ServerConfig,
        #[serde(default)]
        pub cache: CacheConfig,
        #[serde(skip)]
        pub database: DatabaseConfig,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ServerConfig {
        pub host: String,
        pub port: u16,
    }

    /// Result cache policy. Both limits unset means an unbounded cache.
    #[derive(Debug, Clone, Default, Deserialize)]
    pub struct CacheConfig {
        pub ttl_secs: Option<u64>,
        pub capacity: Option<usize>,
    }

    /// Credentials for the registration database, read once at startup.
    #[derive(Clone, Deserialize)]
    pub struct DatabaseConfig {
        pub host: String,
        pub user: String,
        #[serde(rename = "pass")]
        pub password: String,
        #[serde(rename = "name")]
        pub database: String,
        pub port: u16,
    }

    impl Default for DatabaseConfig {
        fn default() -> Self {
            Self {
                host: "192.168.11.5".to_string(),
                user: "rsds_db".to_string(),
                password: String::new(),
                database: "rsds_db".to_string(),
                port: 3306,
            }
        }
    }

    impl fmt::Debug for DatabaseConfig {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("DatabaseConfig")
                .field("host", &self.host)
                .field("user", &self.user)
                .field("password", &"<redacted>")
                .field("database", &self.database)
                .field("port", &self.port)
                .finish()
        }
    }

    impl DatabaseConfig {
        /// Read `DB_HOST`, `DB_USER`, `DB_PASS`, `DB_NAME` and `DB_PORT`.
        pub fn from_env() -> Result<Self, ConfigError> {
            Self::build(Environment::with_prefix("DB"))
        }

        /// Same as [`from_env`](Self::from_env) over an explicit variable set.
        pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
            Self::build(Environment::with_prefix("DB").source(Some(vars)))
        }

        fn build(env: Environment) -> Result<Self, ConfigError> {
            let defaults = Self::default();
            config::Config::builder()
                .set_default("host", defaults.host)?
                .set_default("user", defaults.user)?
                .set_default("pass", defaults.password)?
                .set_default("name", defaults.database)?
                .set_default("port", i64::from(defaults.port))?
                .add_source(env)
                .build()?
                .try_deserialize()
        }
    }

    /// Load configuration from `config/default.toml` and the environment
    pub fn load_config() -> Result<Config, ConfigError> {
        let settings = config::Config::builder()
            // Start with default settings
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080_i64)?
            .add_source(File::with_name("config/default").required(false))
            // Override with environment variables, e.g. REPORT_CACHE__TTL_SECS
            .add_source(
                Environment::with_prefix("REPORT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut config: Config = settings.try_deserialize()?;
        config.database = DatabaseConfig::from_env()?;
        Ok(config)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        }

        #[test]
        fn database_defaults_apply_without_env() {
            let config = DatabaseConfig::from_vars(HashMap::new()).unwrap();
            assert_eq!(config.host, "192.168.11.5");
            assert_eq!(config.port, 3306);
            assert!(config.password.is_empty());
        }

        #[test]
        fn database_env_overrides_defaults() {
            let config = DatabaseConfig::from_vars(vars(&[
                ("DB_HOST", "10.0.0.7"),
                ("DB_USER", "report"),
                ("DB_PASS", "s3cret"),
                ("DB_NAME", "simrs"),
                ("DB_PORT", "3307"),
            ]))
            .unwrap();
            assert_eq!(config.host, "10.0.0.7");
            assert_eq!(config.user, "report");
            assert_eq!(config.password, "s3cret");
            assert_eq!(config.database, "simrs");
            assert_eq!(config.port, 3307);
        }

        #[test]
        fn bad_port_is_rejected() {
            assert!(DatabaseConfig::from_vars(vars(&[("DB_PORT", "many")])).is_err());
        }

        #[test]
        fn debug_output_hides_password() {
            let config = DatabaseConfig {
                password: "s3cret".into(),
                ..DatabaseConfig::default()
            };
            assert!(!format!("{:?}", config).contains("s3cret"));
        }
    }
}
