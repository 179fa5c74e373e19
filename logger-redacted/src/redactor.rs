use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Captures;
use sha2::{Digest, Sha256};

#[allow(clippy::unwrap_used)]
mod patterns {
    use lazy_static::lazy_static;
    use regex::Regex;

    lazy_static! {
        pub static ref BEARER_REGEX: Regex = Regex::new(r"(?i)\bbearer\s+[A-Za-z0-9._~+/=-]+").unwrap();
        pub static ref COOKIE_REGEX: Regex = Regex::new(r"(?i)\b(refresh_?token|access_?token)=([^;\s,]+)").unwrap();
        pub static ref JWT_REGEX: Regex = Regex::new(r"\beyJ[A-Za-z0-9_-]*\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+").unwrap();
        pub static ref EMAIL_REGEX: Regex = Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap();
    }
}

use patterns::{BEARER_REGEX, COOKIE_REGEX, EMAIL_REGEX, JWT_REGEX};

lazy_static! {
    static ref DEFAULT_REDACTOR: CredentialRedactor = CredentialRedactor::default();
}

/// Which kinds of sensitive values get scrubbed
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_bearer_values: bool,
    pub redact_cookie_values: bool,
    pub redact_jwts: bool,
    pub redact_emails: bool,
    /// Replace values with a short hash so occurrences can still be correlated
    pub hash_for_correlation: bool,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_bearer_values: true,
            redact_cookie_values: true,
            redact_jwts: true,
            redact_emails: true,
            hash_for_correlation: true,
        }
    }
}

/// Scrubs credentials and emails out of free-form log text
#[derive(Debug, Clone, Default)]
pub struct CredentialRedactor {
    config: RedactionConfig,
}

impl CredentialRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_bearer_values {
            result = BEARER_REGEX.replace_all(&result, "Bearer [REDACTED]").into_owned();
        }

        if self.config.redact_cookie_values {
            result = COOKIE_REGEX
                .replace_all(&result, |caps: &Captures| {
                    format!("{}={}", &caps[1], self.mask("TOKEN", &caps[2]))
                })
                .into_owned();
        }

        if self.config.redact_jwts {
            result = JWT_REGEX
                .replace_all(&result, |caps: &Captures| self.mask("JWT", &caps[0]))
                .into_owned();
        }

        if self.config.redact_emails {
            result = EMAIL_REGEX
                .replace_all(&result, |caps: &Captures| self.mask("EMAIL", &caps[0]))
                .into_owned();
        }

        result
    }

    fn mask(&self, label: &str, value: &str) -> String {
        if self.config.hash_for_correlation {
            format!("{label}[{}]", credential_fingerprint(value))
        } else {
            "[REDACTED]".to_string()
        }
    }
}

/// Redact with the default configuration
pub fn redact(text: &str) -> String {
    DEFAULT_REDACTOR.redact(text)
}

/// Short, non-reversible fingerprint of a credential for log correlation
/// (first 8 bytes of its SHA-256, base64)
pub fn credential_fingerprint(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let prefix: Vec<u8> = digest.iter().take(8).copied().collect();
    general_purpose::STANDARD.encode(prefix)
}
