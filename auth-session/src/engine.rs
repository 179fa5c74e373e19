/// Refresh protocol engine
///
/// Decides, for a presented refresh credential, whether to mint a new
/// access token, rotate the credential, or reject, and which kind of
/// rejection the client gets.

use crate::codec::{hash_credential, TokenCodec};
use crate::config::{SessionConfig, TokenConfig};
use crate::error::{CodecError, EngineError, StoreError, VerificationError};
use crate::models::{RefreshCredential, Session, SignedToken, VerifiedToken};
use crate::store::{bounded, SessionStore};
use auth_identity::{Identity, UserDirectory};
use chrono::Utc;
use logger_redacted::{credential_fingerprint, redacted_error};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One refresh attempt as presented by the client
#[derive(Debug, Clone, Default)]
pub struct RefreshRequest {
    pub refresh_credential: Option<String>,

    /// Client is retrying after a previous `SessionMissing`
    pub retry: bool,

    /// Deadline for each store/directory call; engine default when `None`
    pub timeout: Option<Duration>,
}

impl RefreshRequest {
    pub fn new(refresh_credential: Option<String>) -> Self {
        Self {
            refresh_credential,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Result of a successful refresh
#[derive(Debug, Clone)]
pub struct RefreshedSession {
    pub identity: Identity,
    pub access_token: SignedToken,
    pub refresh_credential: RefreshCredential,
    pub session: Session,
}

/// Tokens handed out when a session is first established
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: SignedToken,
    pub refresh_credential: RefreshCredential,
    pub session: Session,
}

#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// Nothing to refresh; caller treats the request as anonymous
    NoCredential,

    /// Credential failed verification or names an unknown user
    Invalid,

    /// Credential is valid but no live session matches it; the client may
    /// retry once with the retry flag
    SessionMissing,

    /// Credential's own expiry has passed; interactive login required
    CredentialExpired,

    /// Retry attempt also found no session
    NoSessionFound,

    /// Store or directory failed or timed out
    StoreUnavailable,

    Refreshed(Box<RefreshedSession>),
}

impl RefreshOutcome {
    /// Only a store outage is worth retrying unchanged
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::StoreUnavailable)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NoCredential => "no_credential",
            Self::Invalid => "invalid",
            Self::SessionMissing => "session_missing",
            Self::CredentialExpired => "credential_expired",
            Self::NoSessionFound => "no_session_found",
            Self::StoreUnavailable => "store_unavailable",
            Self::Refreshed(_) => "refreshed",
        }
    }

    /// Rejection for a verified credential that matched no live session.
    /// The retry flag takes precedence over the credential's own expiry.
    fn no_session(retry: bool, credential_expired: bool) -> Self {
        if retry {
            Self::NoSessionFound
        } else if credential_expired {
            Self::CredentialExpired
        } else {
            Self::SessionMissing
        }
    }
}

pub struct RefreshEngine {
    access_codec: TokenCodec,
    refresh_codec: TokenCodec,
    store: Arc<dyn SessionStore>,
    directory: Arc<dyn UserDirectory>,
    rotate_refresh_tokens: bool,
    store_timeout: Duration,
}

impl RefreshEngine {
    /// # Errors
    ///
    /// Any secret or lifetime misconfiguration in `tokens`.
    pub fn new(
        tokens: &TokenConfig,
        sessions: &SessionConfig,
        store: Arc<dyn SessionStore>,
        directory: Arc<dyn UserDirectory>,
    ) -> Result<Self, CodecError> {
        tokens.validate()?;

        Ok(Self {
            access_codec: TokenCodec::access(tokens)?,
            refresh_codec: TokenCodec::refresh(tokens)?,
            store,
            directory,
            rotate_refresh_tokens: tokens.rotate_refresh_tokens,
            store_timeout: sessions.store_timeout(),
        })
    }

    pub fn access_codec(&self) -> &TokenCodec {
        &self.access_codec
    }

    pub fn directory(&self) -> &Arc<dyn UserDirectory> {
        &self.directory
    }

    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    /// Verify an access token, expiry included
    ///
    /// # Errors
    ///
    /// The reason the token was not accepted.
    pub fn verify_access(&self, token: &str) -> Result<VerifiedToken, VerificationError> {
        self.access_codec.verify(token)
    }

    /// Run the refresh state machine for one request.
    ///
    /// Every rejection is an `Ok` outcome; `Err` is reserved for signing
    /// failures, which mean the server itself is misconfigured.
    ///
    /// # Errors
    ///
    /// `EngineError::Codec` when a new token cannot be signed.
    pub async fn refresh(&self, request: RefreshRequest) -> Result<RefreshOutcome, EngineError> {
        let timeout = request.timeout.unwrap_or(self.store_timeout);

        let Some(raw) = request.refresh_credential.filter(|c| !c.is_empty()) else {
            return Ok(RefreshOutcome::NoCredential);
        };

        let claims = match self.refresh_codec.verify_signature(&raw) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(reason = %e, credential = %credential_fingerprint(&raw), "Rejected refresh credential");
                return Ok(RefreshOutcome::Invalid);
            }
        };

        let identity = match bounded(timeout, self.directory.get_user_by_id(claims.subject)).await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                warn!(user_id = %claims.subject, "Refresh credential names an unknown user");
                return Ok(RefreshOutcome::Invalid);
            }
            Err(e) => return Ok(Self::unavailable(&e)),
        };

        // Its session expired with it, so there is nothing to look up
        if claims.is_expired_at(Utc::now()) {
            let outcome = RefreshOutcome::no_session(request.retry, true);
            warn!(user_id = %identity.id, outcome = outcome.label(), "Refresh credential expired");
            return Ok(outcome);
        }

        let hash = hash_credential(&raw);
        let session = match bounded(timeout, self.store.find_valid(identity.id, &hash)).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                let outcome = RefreshOutcome::no_session(request.retry, false);
                warn!(
                    user_id = %identity.id,
                    credential = %credential_fingerprint(&hash),
                    outcome = outcome.label(),
                    "No live session for refresh credential"
                );
                return Ok(outcome);
            }
            Err(e) => return Ok(Self::unavailable(&e)),
        };

        let (session, refresh_credential) = if self.rotate_refresh_tokens {
            let next = self.refresh_codec.mint(identity.id)?;
            let next_hash = hash_credential(&next.token);

            match bounded(timeout, self.store.rotate(&session, &next_hash, next.expires_at)).await {
                Ok(Some(rotated)) => (rotated, RefreshCredential::from(next)),
                Ok(None) => {
                    // A concurrent request rotated this session first
                    let outcome = RefreshOutcome::no_session(request.retry, false);
                    warn!(
                        user_id = %identity.id,
                        session_id = %session.id,
                        outcome = outcome.label(),
                        "Lost refresh rotation race"
                    );
                    return Ok(outcome);
                }
                Err(e) => return Ok(Self::unavailable(&e)),
            }
        } else {
            let credential = RefreshCredential {
                value: raw,
                expires_at: session.expiration,
            };
            (session, credential)
        };

        let access_token = self.access_codec.mint(identity.id)?;

        debug!(
            user_id = %identity.id,
            session_id = %session.id,
            rotated = self.rotate_refresh_tokens,
            "Session refreshed"
        );

        Ok(RefreshOutcome::Refreshed(Box::new(RefreshedSession {
            identity,
            access_token,
            refresh_credential,
            session,
        })))
    }

    /// Start a session for a user who just authenticated.
    ///
    /// # Errors
    ///
    /// Signing failures, or the store failing or timing out.
    pub async fn establish(&self, user_id: Uuid) -> Result<IssuedTokens, EngineError> {
        let access_token = self.access_codec.mint(user_id)?;
        let refresh = self.refresh_codec.mint(user_id)?;
        let hash = hash_credential(&refresh.token);

        let session = bounded(
            self.store_timeout,
            self.store.create(user_id, &hash, refresh.expires_at),
        )
        .await?;

        info!(user_id = %user_id, session_id = %session.id, "Session established");

        Ok(IssuedTokens {
            access_token,
            refresh_credential: RefreshCredential::from(refresh),
            session,
        })
    }

    /// End the session behind one refresh credential. Unverifiable or
    /// already revoked credentials are a no-op.
    ///
    /// # Errors
    ///
    /// The store failing or timing out.
    pub async fn revoke(&self, refresh_credential: &str) -> Result<bool, EngineError> {
        let Ok(claims) = self.refresh_codec.verify_signature(refresh_credential) else {
            return Ok(false);
        };

        let hash = hash_credential(refresh_credential);
        let removed = bounded(self.store_timeout, self.store.delete(claims.subject, &hash)).await?;

        if removed {
            info!(user_id = %claims.subject, "Session revoked");
        }
        Ok(removed)
    }

    /// Remove every session of a user (logout everywhere, password change).
    ///
    /// # Errors
    ///
    /// The store failing or timing out.
    pub async fn invalidate_all(&self, user_id: Uuid) -> Result<u64, EngineError> {
        let removed = bounded(self.store_timeout, self.store.invalidate_all(user_id)).await?;
        info!(user_id = %user_id, removed, "Invalidated all sessions");
        Ok(removed)
    }

    /// # Errors
    ///
    /// The store failing or timing out.
    pub async fn purge_expired(&self) -> Result<u64, EngineError> {
        let purged = bounded(self.store_timeout, self.store.purge_expired()).await?;
        debug!(purged, "Purged expired sessions");
        Ok(purged)
    }

    fn unavailable(err: &StoreError) -> RefreshOutcome {
        redacted_error!("Session store unavailable during refresh: {}", err);
        RefreshOutcome::StoreUnavailable
    }
}
