/// Signed, time-bound tokens
///
/// Access tokens and refresh credentials are both HS256 JWTs, signed with
/// different secrets and tagged with a `typ` claim so one can never be
/// presented as the other.

use crate::config::{check_secret, TokenConfig};
use crate::error::{CodecError, VerificationError};
use crate::models::{SignedToken, VerifiedToken};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims shared by both token kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,

    /// JWT ID; makes every minted token unique, even within one second
    pub jti: String,

    /// Issued at (seconds since epoch)
    pub iat: i64,

    /// Expiration (seconds since epoch)
    pub exp: i64,

    pub iss: String,

    pub typ: TokenKind,
}

/// Mints and verifies one kind of token with one secret
pub struct TokenCodec {
    kind: TokenKind,
    issuer: String,
    lifetime: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    signature_only: Validation,
}

impl TokenCodec {
    /// # Errors
    ///
    /// Fails when the secret is missing or too short, or the lifetime is zero.
    pub fn new(
        kind: TokenKind,
        secret: &str,
        issuer: impl Into<String>,
        lifetime: std::time::Duration,
        leeway: std::time::Duration,
    ) -> Result<Self, CodecError> {
        let which = match kind {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        };
        check_secret(which, secret)?;

        let lifetime = Duration::from_std(lifetime).map_err(|_| CodecError::InvalidLifetime)?;
        if lifetime <= Duration::zero() {
            return Err(CodecError::InvalidLifetime);
        }

        let issuer = issuer.into();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.leeway = leeway.as_secs();
        validation.validate_exp = true;

        let mut signature_only = validation.clone();
        signature_only.validate_exp = false;

        Ok(Self {
            kind,
            issuer,
            lifetime,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            signature_only,
        })
    }

    /// Access token codec from the token configuration
    ///
    /// # Errors
    ///
    /// See [`TokenCodec::new`].
    pub fn access(config: &TokenConfig) -> Result<Self, CodecError> {
        Self::new(
            TokenKind::Access,
            &config.access_secret,
            config.issuer.clone(),
            config.access_token_duration(),
            config.leeway(),
        )
    }

    /// Refresh credential codec from the token configuration. Refresh
    /// credentials get no expiry leeway.
    ///
    /// # Errors
    ///
    /// See [`TokenCodec::new`].
    pub fn refresh(config: &TokenConfig) -> Result<Self, CodecError> {
        Self::new(
            TokenKind::Refresh,
            &config.refresh_secret,
            config.issuer.clone(),
            config.refresh_token_duration(),
            std::time::Duration::ZERO,
        )
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Mint a token for `subject` valid for the configured lifetime
    ///
    /// # Errors
    ///
    /// Only on signing failure, which means the key is misconfigured.
    pub fn mint(&self, subject: Uuid) -> Result<SignedToken, CodecError> {
        self.mint_at(subject, Utc::now())
    }

    /// Mint a token as if it had been issued at `issued_at`
    ///
    /// # Errors
    ///
    /// Only on signing failure or an unrepresentable timestamp.
    pub fn mint_at(&self, subject: Uuid, issued_at: DateTime<Utc>) -> Result<SignedToken, CodecError> {
        let iat = issued_at.timestamp();
        let exp = iat + self.lifetime.num_seconds();

        let claims = TokenClaims {
            sub: subject.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat,
            exp,
            iss: self.issuer.clone(),
            typ: self.kind,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| CodecError::Signing(e.to_string()))?;

        Ok(SignedToken {
            token,
            subject,
            issued_at: from_timestamp(iat).ok_or_else(|| CodecError::Signing("iat out of range".to_string()))?,
            expires_at: from_timestamp(exp).ok_or_else(|| CodecError::Signing("exp out of range".to_string()))?,
        })
    }

    /// Full verification including expiry
    ///
    /// # Errors
    ///
    /// `Expired` only when the signature and structure are otherwise valid.
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, VerificationError> {
        self.decode_with(token, &self.validation)
    }

    /// Verify signature and structure but accept expired tokens; the caller
    /// receives the embedded expiry and decides.
    ///
    /// # Errors
    ///
    /// `Malformed` or `SignatureInvalid`, never `Expired`.
    pub fn verify_signature(&self, token: &str) -> Result<VerifiedToken, VerificationError> {
        self.decode_with(token, &self.signature_only)
    }

    fn decode_with(&self, token: &str, validation: &Validation) -> Result<VerifiedToken, VerificationError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, validation)
            .map_err(|e| classify(e.kind()))?;
        let claims = data.claims;

        if claims.typ != self.kind {
            return Err(VerificationError::Malformed);
        }

        let subject = Uuid::parse_str(&claims.sub).map_err(|_| VerificationError::Malformed)?;
        let issued_at = from_timestamp(claims.iat).ok_or(VerificationError::Malformed)?;
        let expires_at = from_timestamp(claims.exp).ok_or(VerificationError::Malformed)?;

        Ok(VerifiedToken {
            subject,
            issued_at,
            expires_at,
        })
    }
}

fn classify(kind: &ErrorKind) -> VerificationError {
    match kind {
        ErrorKind::ExpiredSignature => VerificationError::Expired,
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidAudience
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::ImmatureSignature => VerificationError::SignatureInvalid,
        _ => VerificationError::Malformed,
    }
}

fn from_timestamp(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

/// Hash a raw refresh credential for storage (SHA-256, base64)
pub fn hash_credential(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    BASE64.encode(hasher.finalize())
}
