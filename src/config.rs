use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Application configuration, loaded once at startup.
///
/// Values are layered: `config/default.toml` (optional), an optional
/// environment-specific file, then `STOCKLEDGER_`-prefixed environment
/// variables override everything.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub auto_migrate: bool,
    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub db_min_connections: u32,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_environment() -> String {
    "development".to_string()
}
fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    1
}
fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let run_env =
            std::env::var("STOCKLEDGER_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_env)).required(false))
            .add_source(Environment::with_prefix("STOCKLEDGER"))
            .build()?
            .try_deserialize()
    }

    /// Minimal configuration suitable for tests.
    pub fn for_tests(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".to_string(),
            port: 18080,
            environment: "test".to_string(),
            auto_migrate: true,
            db_max_connections: 1,
            db_min_connections: 1,
            log_level: "debug".to_string(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_produces_sane_defaults() {
        let cfg = AppConfig::for_tests("sqlite::memory:");
        assert_eq!(cfg.bind_address(), "127.0.0.1:18080");
        assert!(cfg.auto_migrate);
        assert!(!cfg.is_production());
    }
}
