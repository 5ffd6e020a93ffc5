use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::{CacheEntry, CacheKey};
use crate::constants::REFRESH_MARGIN_MINUTES;
use crate::error::ResolveError;
use crate::providers::CredentialSource;

/// A complete set of AWS credentials, with or without a session token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "AccessKeyId")]
    pub access_key_id: String,
    #[serde(rename = "SecretAccessKey")]
    pub secret_access_key: String,
    #[serde(
        rename = "SessionToken",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub session_token: Option<String>,
}

// Secrets must never leak through debug logging.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Time-limited credentials as returned by STS, SSO or IMDS.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCredentials {
    pub credentials: Credentials,
    pub expiration: DateTime<Utc>,
}

/// True when `expiration` is at or inside the refresh margin of `now`.
pub fn needs_refresh(expiration: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expiration - now <= Duration::minutes(REFRESH_MARGIN_MINUTES)
}

/// Time-limited credentials that remember the source which issued them,
/// so they can be re-resolved when they get close to expiry.
#[derive(Debug, Clone)]
pub struct RefreshableCredentials {
    credentials: Credentials,
    expiration: DateTime<Utc>,
    fingerprint: Option<CacheKey>,
    source: CredentialSource,
}

impl RefreshableCredentials {
    pub fn new(
        session: SessionCredentials,
        fingerprint: Option<CacheKey>,
        source: CredentialSource,
    ) -> Self {
        Self {
            credentials: session.credentials,
            expiration: session.expiration,
            fingerprint,
            source,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        needs_refresh(self.expiration, now)
    }

    fn cache_entry(&self) -> Option<CacheEntry> {
        self.fingerprint.as_ref().map(|fingerprint| {
            CacheEntry::new(
                fingerprint,
                &SessionCredentials {
                    credentials: self.credentials.clone(),
                    expiration: self.expiration,
                },
            )
        })
    }
}

/// Outcome of a chain resolution: either keys that never expire or a
/// refreshable session.
#[derive(Debug, Clone)]
pub enum ResolvedCredentials {
    Static(Credentials),
    Refreshable(RefreshableCredentials),
}

impl ResolvedCredentials {
    /// Produce a point-in-time snapshot safe to hand to the caller.
    ///
    /// Refreshable credentials at or near expiry are re-resolved through
    /// their owning source first, replacing `self`. Calling this on fresh
    /// credentials is a no-op, so repeated freezes are idempotent.
    pub async fn freeze(&mut self) -> Result<Credentials, ResolveError> {
        let refreshed = match self {
            Self::Refreshable(inner) if inner.needs_refresh(Utc::now()) => {
                info!(
                    "Session credentials at or near expiry, refreshing from source: {}",
                    inner.source.name()
                );
                let previous = inner.cache_entry();
                Some(inner.source.resolve(previous.as_ref()).await?)
            }
            _ => None,
        };

        if let Some(fresh) = refreshed {
            *self = fresh;
        }

        match self {
            Self::Static(credentials) => Ok(credentials.clone()),
            Self::Refreshable(inner) => Ok(inner.credentials.clone()),
        }
    }

    /// Expiration instant, if these credentials are time-limited.
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Static(_) => None,
            Self::Refreshable(inner) => Some(inner.expiration),
        }
    }
}
