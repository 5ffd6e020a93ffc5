use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};

use crate::aws::sso::{FetchRoleCredentials, find_cached_token};
use crate::cache::{CacheEntry, CacheKey, FileCache};
use crate::config::SsoConfig;
use crate::credentials::{RefreshableCredentials, ResolvedCredentials, SessionCredentials};
use crate::error::ResolveError;
use crate::providers::CredentialSource;

/// Role credentials from AWS SSO, exchanged for the access token that
/// `aws sso login` left behind. Sessions are cached like assumed roles.
#[derive(Debug, Clone)]
pub struct SsoSource {
    sso: SsoConfig,
    token_dir: PathBuf,
    cache: FileCache,
    portal: Arc<dyn FetchRoleCredentials>,
}

impl SsoSource {
    pub fn new(
        sso: SsoConfig,
        token_dir: PathBuf,
        cache: FileCache,
        portal: Arc<dyn FetchRoleCredentials>,
    ) -> Self {
        Self {
            sso,
            token_dir,
            cache,
            portal,
        }
    }

    pub fn fingerprint(&self) -> CacheKey {
        CacheKey::from_payload(&json!({
            "type": "sso",
            "start_url": self.sso.start_url,
            "region": self.sso.region,
            "account_id": self.sso.account_id,
            "role_name": self.sso.role_name,
        }))
    }

    pub async fn resolve(
        &self,
        previous: Option<&CacheEntry>,
    ) -> Result<ResolvedCredentials, ResolveError> {
        let key = self.fingerprint();

        if previous.is_none() {
            if let Some(entry) = self.cache.get(&key).await {
                if !entry.is_expired(Utc::now()) {
                    debug!(
                        "Using cached session credentials, valid until {}",
                        entry.expiration
                    );
                    return Ok(self.refreshable(entry.session(), key));
                }
                debug!("Cached session credentials expired at {}", entry.expiration);
            }
        }

        let token = find_cached_token(&self.token_dir, &self.sso.start_url, Utc::now())?;
        let session = self
            .portal
            .fetch_role_credentials(&self.sso, &token.access_token)
            .await?;

        let entry = CacheEntry::new(&key, &session);
        if let Err(err) = self.cache.put(&key, &entry).await {
            warn!("Failed to write session cache entry: {}", err);
        }

        Ok(self.refreshable(session, key))
    }

    fn refreshable(&self, session: SessionCredentials, key: CacheKey) -> ResolvedCredentials {
        ResolvedCredentials::Refreshable(RefreshableCredentials::new(
            session,
            Some(key),
            CredentialSource::Sso(self.clone()),
        ))
    }
}
