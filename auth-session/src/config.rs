use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CodecError;

/// Minimum accepted length of an HMAC signing secret, in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Token signing and lifetime configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    /// HMAC secret for access tokens
    #[serde(default, skip_serializing)]
    pub access_secret: String,

    /// HMAC secret for refresh credentials (must differ from `access_secret`)
    #[serde(default, skip_serializing)]
    pub refresh_secret: String,

    /// Access token lifetime in seconds (default: 900 = 15 minutes)
    #[serde(default = "default_access_token_lifetime")]
    pub access_token_lifetime: u64,

    /// Refresh credential lifetime in seconds (default: 7 days)
    #[serde(default = "default_refresh_token_lifetime")]
    pub refresh_token_lifetime: u64,

    /// JWT issuer claim
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Clock skew tolerance applied to access token expiry, in seconds
    #[serde(default = "default_leeway")]
    pub leeway_secs: u64,

    /// Replace the refresh credential on every successful refresh
    #[serde(default = "default_true")]
    pub rotate_refresh_tokens: bool,
}

/// Which session store backs the refresh protocol
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

/// Session store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    /// Upper bound for a single store call, in milliseconds (default: 2000)
    #[serde(default = "default_store_timeout")]
    pub store_timeout_ms: u64,

    /// Interval between expired-session purges, in seconds. 0 disables.
    #[serde(default = "default_purge_interval")]
    pub purge_interval_secs: u64,
}

fn default_access_token_lifetime() -> u64 { 900 } // 15 minutes
fn default_refresh_token_lifetime() -> u64 { 7 * 24 * 3600 } // 7 days
fn default_issuer() -> String { "session-server".to_string() }
fn default_leeway() -> u64 { 30 }
fn default_true() -> bool { true }

fn default_backend() -> StoreBackend { StoreBackend::Memory }
fn default_store_timeout() -> u64 { 2000 }
fn default_purge_interval() -> u64 { 3600 }

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_secret: String::new(),
            refresh_secret: String::new(),
            access_token_lifetime: default_access_token_lifetime(),
            refresh_token_lifetime: default_refresh_token_lifetime(),
            issuer: default_issuer(),
            leeway_secs: default_leeway(),
            rotate_refresh_tokens: true,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            store_timeout_ms: default_store_timeout(),
            purge_interval_secs: default_purge_interval(),
        }
    }
}

impl TokenConfig {
    /// Config with both secrets set and defaults elsewhere
    pub fn with_secrets(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            ..Self::default()
        }
    }

    /// Reject missing, short or shared secrets and zero lifetimes.
    ///
    /// # Errors
    ///
    /// Returns the first misconfiguration found.
    pub fn validate(&self) -> Result<(), CodecError> {
        check_secret("access", &self.access_secret)?;
        check_secret("refresh", &self.refresh_secret)?;
        if self.access_secret == self.refresh_secret {
            return Err(CodecError::SharedSecret);
        }
        if self.access_token_lifetime == 0 || self.refresh_token_lifetime == 0 {
            return Err(CodecError::InvalidLifetime);
        }
        Ok(())
    }

    pub fn access_token_duration(&self) -> Duration {
        Duration::from_secs(self.access_token_lifetime)
    }

    pub fn refresh_token_duration(&self) -> Duration {
        Duration::from_secs(self.refresh_token_lifetime)
    }

    pub fn leeway(&self) -> Duration {
        Duration::from_secs(self.leeway_secs)
    }
}

impl SessionConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn purge_interval(&self) -> Option<Duration> {
        (self.purge_interval_secs > 0).then(|| Duration::from_secs(self.purge_interval_secs))
    }
}

pub(crate) fn check_secret(which: &'static str, secret: &str) -> Result<(), CodecError> {
    if secret.is_empty() {
        return Err(CodecError::MissingSecret(which));
    }
    if secret.len() < MIN_SECRET_LEN {
        return Err(CodecError::WeakSecret(which));
    }
    Ok(())
}
