use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Deployment environment. Anything not explicitly `development` is
/// treated as production-like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Environment {
    Development,
    Test,
    Staging,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Self::Development
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown names are rejected rather than defaulted, so a typo can never
/// silently select development behavior.
impl FromStr for Environment {
    type Err = GateConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            _ => Err(GateConfigError::UnknownEnvironment(s.to_string())),
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = GateConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Environment> for String {
    fn from(env: Environment) -> Self {
        env.as_str().to_string()
    }
}

/// Cookie names and the login redirect target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieConfig {
    #[serde(default = "default_refresh_cookie")]
    pub refresh_cookie_name: String,

    /// Also accept the access token from this cookie when no bearer token
    /// is present
    #[serde(default)]
    pub access_cookie_name: Option<String>,

    /// Where clients restart interactive login
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Force the `Secure` attribute on or off; by default it is set
    /// everywhere except development
    #[serde(default)]
    pub secure: Option<bool>,
}

fn default_refresh_cookie() -> String { "refreshToken".to_string() }
fn default_login_path() -> String { "/login".to_string() }

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            refresh_cookie_name: default_refresh_cookie(),
            access_cookie_name: None,
            login_path: default_login_path(),
            secure: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default)]
    pub environment: Environment,

    #[serde(default)]
    pub cookies: CookieConfig,

    /// Skip every credential check and act as the standing development
    /// identity. Only allowed in development.
    #[serde(default)]
    pub dev_auto_login: bool,
}

impl GateConfig {
    pub fn secure_cookies(&self) -> bool {
        self.cookies
            .secure
            .unwrap_or(!self.environment.is_development())
    }

    /// # Errors
    ///
    /// Development bypass outside development, or unusable cookie names
    /// or login path.
    pub fn validate(&self) -> Result<(), GateConfigError> {
        if self.dev_auto_login && !self.environment.is_development() {
            return Err(GateConfigError::DevBypassOutsideDevelopment(self.environment));
        }

        check_cookie_name(&self.cookies.refresh_cookie_name)?;
        if let Some(name) = &self.cookies.access_cookie_name {
            check_cookie_name(name)?;
        }

        if !self.cookies.login_path.starts_with('/') {
            return Err(GateConfigError::InvalidLoginPath(self.cookies.login_path.clone()));
        }

        Ok(())
    }
}

fn check_cookie_name(name: &str) -> Result<(), GateConfigError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(GateConfigError::InvalidCookieName(name.to_string()))
    }
}

#[derive(Error, Debug)]
pub enum GateConfigError {
    #[error("unknown environment '{0}' (expected development, test, staging or production)")]
    UnknownEnvironment(String),

    #[error("dev_auto_login is only allowed in development, not {0}")]
    DevBypassOutsideDevelopment(Environment),

    #[error("dev_auto_login is enabled but no development identity was provisioned")]
    DevIdentityMissing,

    #[error("invalid cookie name '{0}'")]
    InvalidCookieName(String),

    #[error("login path must be absolute, got '{0}'")]
    InvalidLoginPath(String),
}
