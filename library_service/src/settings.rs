use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::library_repository::PostgresLibraryRepositoryConfig;

/// Process settings, read from environment variables such as `DB_HOST` or `LISTEN_PORT`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    pub use_in_memory_db: bool,
    pub db_host: String,
    pub db_username: String,
    pub db_password: String,
    pub listen_address: String,
    pub listen_port: u16,
    /// Exports spans to a local Jaeger agent when set
    pub tracing_enabled: bool,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::default().try_parsing(true))
    }

    fn from_environment(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("use_in_memory_db", false)?
            .set_default("db_host", "127.0.0.1")?
            .set_default("db_username", "postgres")?
            .set_default("db_password", "postgres")?
            .set_default("listen_address", "0.0.0.0")?
            .set_default("listen_port", 8080)?
            .set_default("tracing_enabled", true)?
            .add_source(environment)
            .build()?
            .try_deserialize()
    }

    pub fn postgres_config(&self) -> PostgresLibraryRepositoryConfig {
        PostgresLibraryRepositoryConfig {
            hostname: self.db_host.clone(),
            username: self.db_username.clone(),
            password: self.db_password.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load_from(vars: &[(&str, &str)]) -> Settings {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Settings::from_environment(Environment::default().try_parsing(true).source(Some(source)))
            .expect("Failed to load settings")
    }

    #[test]
    fn test_defaults() {
        assert_eq!(
            load_from(&[]),
            Settings {
                use_in_memory_db: false,
                db_host: "127.0.0.1".to_string(),
                db_username: "postgres".to_string(),
                db_password: "postgres".to_string(),
                listen_address: "0.0.0.0".to_string(),
                listen_port: 8080,
                tracing_enabled: true,
            }
        );
    }

    #[test]
    fn test_environment_overrides() {
        let settings = load_from(&[
            ("USE_IN_MEMORY_DB", "true"),
            ("DB_HOST", "db.local"),
            ("LISTEN_PORT", "9000"),
            ("TRACING_ENABLED", "false"),
        ]);
        assert!(settings.use_in_memory_db);
        assert_eq!(settings.db_host, "db.local");
        assert_eq!(settings.listen_port, 9000);
        assert!(!settings.tracing_enabled);

        let postgres_config = settings.postgres_config();
        assert_eq!(postgres_config.hostname, "db.local");
        assert_eq!(postgres_config.username, "postgres");
    }
}
