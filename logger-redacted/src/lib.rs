//! Logging for the session core
//!
//! Installs the process-wide `tracing` subscriber and keeps credentials out
//! of log output. Refresh credentials and access tokens must never appear in
//! a log line; code that needs to correlate them logs
//! [`credential_fingerprint`] instead, and free text that may embed them
//! (store errors, upstream messages) goes through [`redact`] or the
//! `redacted_warn!` / `redacted_error!` macros.
//!
//! # Example
//!
//! ```rust,no_run
//! use logger_redacted::{init_tracing, redacted_warn, LoggerConfig};
//!
//! # fn main() -> Result<(), logger_redacted::LoggerError> {
//! init_tracing(&LoggerConfig::default().resolved(true))?;
//!
//! let header = "Bearer eyJhbGciOiJIUzI1NiJ9.e30.c2ln";
//! redacted_warn!("rejected request with {}", header);
//! // logs: rejected request with Bearer [REDACTED]
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod macros;
pub mod redactor;

pub use config::{LogFormat, LoggerConfig};
pub use redactor::{credential_fingerprint, redact, CredentialRedactor, RedactionConfig};

#[doc(hidden)]
pub use tracing;

use thiserror::Error;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Install the global subscriber. `RUST_LOG` overrides `config.level`.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &LoggerConfig) -> Result<(), LoggerError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "{level},tower_http=info,sqlx=warn,hyper=info",
            level = config.level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(config.with_location)
                    .with_line_number(config.with_location)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(true)
                    .pretty(),
            )
            .try_init(),
        // Auto that was never resolved falls back to machine-readable output
        LogFormat::Json | LogFormat::Auto => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init(),
    };

    result.map_err(|e| LoggerError::Init(e.to_string()))
}
