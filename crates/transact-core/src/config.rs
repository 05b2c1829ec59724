use std::time::Duration;

use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::context::Context;
use crate::error::{CoreError, CoreResult};
use crate::options::{AccessMode, DeferrableMode, IsolationLevel, TxOptions};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub transaction: TransactionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u8,
}

/// Defaults applied to transactions opened without explicit options.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionConfig {
    pub isolation_level: Option<IsolationLevel>,
    pub access_mode: Option<AccessMode>,
    pub deferrable_mode: Option<DeferrableMode>,
    pub timeout_secs: Option<u64>,
}

impl TransactionConfig {
    #[must_use]
    pub const fn options(&self) -> TxOptions {
        TxOptions {
            isolation_level: self.isolation_level,
            access_mode: self.access_mode,
            deferrable_mode: self.deferrable_mode,
        }
    }

    /// ## Summary
    /// Derives a context for one transaction from `parent`, bounded by
    /// `timeout_secs` when it is set.
    #[must_use]
    pub fn context(&self, parent: &Context) -> Context {
        match self.timeout_secs {
            Some(secs) => parent.with_timeout(Duration::from_secs(secs)),
            None => parent.child(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from an optional `config.toml` and environment variables.
    /// Environment variables take precedence over file values.
    ///
    /// Nested keys are separated by a double underscore, so
    /// `TRANSACTION__TIMEOUT_SECS` sets `transaction.timeout_secs` and
    /// `DATABASE__URL` sets `database.url`.
    ///
    /// ## Errors
    /// Returns an error if building the configuration, deserializing it, or
    /// validating it fails.
    pub fn load() -> Result<Self> {
        Self::from_sources(
            config::File::with_name("config.toml").required(false),
            environment(),
        )
    }

    fn from_sources<F>(file: F, env: config::Environment) -> Result<Self>
    where
        F: config::Source + Send + Sync + 'static,
    {
        // Later sources override earlier ones.
        let settings = Config::builder()
            .set_default("database.max_connections", 4)?
            .set_default("logging.level", "info")?
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize::<Self>()?;

        settings.validate()?;
        Ok(settings)
    }

    /// ## Summary
    /// Checks values that deserialize fine but cannot be used.
    ///
    /// ## Errors
    /// Returns `CoreError::ConfigError` describing the first invalid value.
    pub fn validate(&self) -> CoreResult<()> {
        if self.database.url.trim().is_empty() {
            return Err(CoreError::ConfigError("database.url is empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(CoreError::ConfigError(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.transaction.timeout_secs == Some(0) {
            return Err(CoreError::ConfigError(
                "transaction.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn environment() -> config::Environment {
    config::Environment::default()
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    tracing::debug!(
        max_connections = settings.database.max_connections,
        transaction = ?settings.transaction,
        "Configuration loaded"
    );
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> Result<Settings> {
        Ok(Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize::<Settings>()?)
    }

    #[test]
    fn test_transaction_section_is_optional() {
        let settings = from_toml(
            r#"
            [database]
            url = "postgres://localhost/app"
            max_connections = 2

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(settings.transaction.options(), TxOptions::default());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_transaction_options_deserialize() {
        let settings = from_toml(
            r#"
            [database]
            url = "postgres://localhost/app"
            max_connections = 2

            [transaction]
            isolation_level = "repeatable_read"
            access_mode = "read_only"
            timeout_secs = 5

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(
            settings.transaction.options(),
            TxOptions::new().repeatable_read().read_only()
        );
        assert_eq!(settings.transaction.timeout_secs, Some(5));
    }

    #[test]
    fn test_unknown_isolation_level_is_rejected() {
        let result = from_toml(
            r#"
            [database]
            url = "postgres://localhost/app"
            max_connections = 2

            [transaction]
            isolation_level = "snapshot"

            [logging]
            level = "debug"
            "#,
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_connections() {
        let settings = from_toml(
            r#"
            [database]
            url = "postgres://localhost/app"
            max_connections = 0

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        let err = settings.validate().unwrap_err();
        assert!(matches!(err, CoreError::ConfigError(_)));
    }

    fn env_of(vars: &[(&str, &str)]) -> config::Environment {
        let vars: config::Map<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        environment().source(Some(vars))
    }

    const FILE: &str = r#"
        [database]
        url = "postgres://localhost/app"
        max_connections = 2

        [transaction]
        isolation_level = "read_committed"
        timeout_secs = 30

        [logging]
        level = "debug"
    "#;

    #[test]
    fn test_environment_overrides_file() {
        let settings = Settings::from_sources(
            config::File::from_str(FILE, config::FileFormat::Toml),
            env_of(&[
                ("DATABASE__MAX_CONNECTIONS", "9"),
                ("TRANSACTION__TIMEOUT_SECS", "5"),
                ("TRANSACTION__ISOLATION_LEVEL", "serializable"),
                ("TRANSACTION__ACCESS_MODE", "read_only"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.database.max_connections, 9);
        assert_eq!(settings.database.url, "postgres://localhost/app");
        assert_eq!(settings.transaction.timeout_secs, Some(5));
        assert_eq!(
            settings.transaction.options(),
            TxOptions::new().serializable().read_only()
        );
    }

    #[test]
    fn test_file_values_kept_without_environment() {
        let settings = Settings::from_sources(
            config::File::from_str(FILE, config::FileFormat::Toml),
            env_of(&[("PATH", "/usr/bin"), ("TRANSACTION__TIMEOUT_SECS", "")]),
        )
        .unwrap();

        assert_eq!(settings.database.max_connections, 2);
        assert_eq!(settings.transaction.timeout_secs, Some(30));
        assert_eq!(
            settings.transaction.options(),
            TxOptions::new().read_committed()
        );
    }

    #[test]
    fn test_environment_alone_is_enough() {
        let settings = Settings::from_sources(
            config::File::from_str("", config::FileFormat::Toml),
            env_of(&[
                ("DATABASE__URL", "postgres://db/app"),
                ("LOGGING__LEVEL", "warn"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.database.url, "postgres://db/app");
        assert_eq!(settings.database.max_connections, 4);
        assert_eq!(settings.logging.level, "warn");
        assert!(settings.transaction.timeout_secs.is_none());
    }

    #[test]
    fn test_invalid_environment_value_is_rejected() {
        let result = Settings::from_sources(
            config::File::from_str(FILE, config::FileFormat::Toml),
            env_of(&[("TRANSACTION__TIMEOUT_SECS", "0")]),
        );

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_timeout_bounds_the_context() {
        let config = TransactionConfig {
            timeout_secs: Some(3),
            ..TransactionConfig::default()
        };
        let parent = Context::background();

        assert!(config.context(&parent).deadline().is_some());
        assert!(TransactionConfig::default().context(&parent).deadline().is_none());
    }
}
