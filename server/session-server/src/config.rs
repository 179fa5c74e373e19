//! Layered server configuration
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML
//! file, then `SESSION__*` environment variables (`__` separates nesting
//! levels, e.g. `SESSION__AUTH__TOKEN__ACCESS_TOKEN_LIFETIME=600`).
//! `JWT_SECRET` and `JWT_REFRESH_SECRET` fill in secrets left unset.

use auth_gateway::{CookieConfig, Environment, GateConfig, GateConfigError};
use auth_identity::DevIdentityConfig;
use auth_session::{CodecError, SessionConfig, StoreBackend, TokenConfig};
use config::{builder::DefaultState, Config, ConfigBuilder, File};
use logger_redacted::LoggerConfig;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "session-server";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub environment: Environment,

    /// Required when the session store backend is `postgres`
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub logging: LoggerConfig,

    #[serde(default)]
    pub dev_identity: DevIdentityConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub token: TokenConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub cookies: CookieConfig,

    #[serde(default)]
    pub dev_auto_login: bool,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid token configuration: {0}")]
    Token(#[from] CodecError),

    #[error("invalid gate configuration: {0}")]
    Gate(#[from] GateConfigError),

    #[error("database_url is required for the postgres session store")]
    MissingDatabaseUrl,
}

impl AuthSettings {
    pub fn gate_config(&self, environment: Environment) -> GateConfig {
        GateConfig {
            environment,
            cookies: self.cookies.clone(),
            dev_auto_login: self.dev_auto_login,
        }
    }

    /// Signing secrets, lifetimes and the development bypass guard.
    ///
    /// # Errors
    ///
    /// Fatal at startup: weak or shared secrets, or `dev_auto_login`
    /// outside an explicit development environment.
    pub fn validate(&self, environment: Environment) -> Result<(), SettingsError> {
        self.gate_config(environment).validate()?;
        self.token.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    /// Load from `path` (or `session-server.toml` when present) and the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Unreadable file or values that do not deserialize.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let builder = Config::builder()
            .add_source(file)
            .add_source(environment_source());

        let mut config = Self::from_builder(builder)?;
        config.apply_secret_fallbacks(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// # Errors
    ///
    /// Values that do not deserialize.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Fill unset signing secrets from `JWT_SECRET` / `JWT_REFRESH_SECRET`
    pub fn apply_secret_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let token = &mut self.auth.token;
        if token.access_secret.is_empty() {
            if let Some(secret) = lookup("JWT_SECRET") {
                token.access_secret = secret;
            }
        }
        if token.refresh_secret.is_empty() {
            if let Some(secret) = lookup("JWT_REFRESH_SECRET") {
                token.refresh_secret = secret;
            }
        }
    }

    /// # Errors
    ///
    /// See [`AuthSettings::validate`]; also a postgres backend without a
    /// database URL.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.auth.validate(self.environment)?;

        if self.auth.session.backend == StoreBackend::Postgres && self.database_url.is_none() {
            return Err(SettingsError::MissingDatabaseUrl);
        }
        Ok(())
    }

    pub fn gate_config(&self) -> GateConfig {
        self.auth.gate_config(self.environment)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `SESSION__*` environment variables
pub fn environment_source() -> config::Environment {
    config::Environment::with_prefix("SESSION")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use std::collections::HashMap;

    const ACCESS: &str = "access-secret-access-secret-access-secret";
    const REFRESH: &str = "refresh-secret-refresh-secret-refresh-secret";

    fn load(toml: &str, env: &[(&str, &str)]) -> Result<ServerConfig, SettingsError> {
        let vars: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();

        ServerConfig::from_builder(
            Config::builder()
                .add_source(File::from_str(toml, FileFormat::Toml))
                .add_source(environment_source().source(Some(vars))),
        )
    }

    #[test]
    fn test_defaults() {
        let config = load("", &[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.auth.token.access_token_lifetime, 900);
        assert_eq!(config.auth.token.refresh_token_lifetime, 604_800);
        assert_eq!(config.auth.token.issuer, "session-server");
        assert_eq!(config.auth.session.store_timeout_ms, 2000);
        assert_eq!(config.auth.cookies.refresh_cookie_name, "refreshToken");
        assert_eq!(config.auth.cookies.login_path, "/login");
        assert!(!config.auth.dev_auto_login);
    }

    #[test]
    fn test_environment_overrides_file() {
        let toml = r#"
            port = 3000
            [auth.token]
            access_token_lifetime = 600
        "#;
        let config = load(
            toml,
            &[
                ("SESSION__PORT", "4000"),
                ("SESSION__ENVIRONMENT", "staging"),
                ("SESSION__AUTH__SESSION__BACKEND", "postgres"),
            ],
        )
        .unwrap();

        assert_eq!(config.port, 4000);
        assert_eq!(config.environment, Environment::Staging);
        assert_eq!(config.auth.token.access_token_lifetime, 600);
        assert_eq!(config.auth.session.backend, StoreBackend::Postgres);
    }

    #[test]
    fn test_unknown_environment_is_rejected() {
        assert!(load(r#"environment = "prod""#, &[]).is_err());
    }

    #[test]
    fn test_secret_fallbacks() {
        let mut config = load("", &[]).unwrap();
        config.apply_secret_fallbacks(|key| match key {
            "JWT_SECRET" => Some(ACCESS.to_string()),
            "JWT_REFRESH_SECRET" => Some(REFRESH.to_string()),
            _ => None,
        });
        assert!(config.validate().is_ok());

        // Explicit settings win over the fallbacks
        let mut config = load("", &[]).unwrap();
        config.auth.token.access_secret = "explicit-explicit-explicit-explicit".to_string();
        config.apply_secret_fallbacks(|_| Some(ACCESS.to_string()));
        assert_eq!(config.auth.token.access_secret, "explicit-explicit-explicit-explicit");
    }

    #[test]
    fn test_dev_auto_login_outside_development_is_fatal() {
        let mut config = load("", &[("SESSION__AUTH__DEV_AUTO_LOGIN", "true")]).unwrap();
        config.apply_secret_fallbacks(|key| match key {
            "JWT_SECRET" => Some(ACCESS.to_string()),
            _ => Some(REFRESH.to_string()),
        });

        assert!(matches!(
            config.validate(),
            Err(SettingsError::Gate(GateConfigError::DevBypassOutsideDevelopment(
                Environment::Production
            )))
        ));

        config.environment = Environment::Development;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let mut config = load("", &[("SESSION__AUTH__SESSION__BACKEND", "postgres")]).unwrap();
        config.apply_secret_fallbacks(|key| match key {
            "JWT_SECRET" => Some(ACCESS.to_string()),
            _ => Some(REFRESH.to_string()),
        });
        assert!(matches!(config.validate(), Err(SettingsError::MissingDatabaseUrl)));
    }
}
