use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};

use crate::aws::sts::{AssumeRole, AssumeRoleRequest};
use crate::cache::{CacheEntry, CacheKey, FileCache};
use crate::config::{ProfileConfig, RoleConfig, RoleSource};
use crate::constants::DEFAULT_ROLE_DURATION_SECS;
use crate::credentials::{RefreshableCredentials, ResolvedCredentials, SessionCredentials};
use crate::error::ResolveError;
use crate::providers::CredentialSource;

/// Assumed-role sessions, cached on disk across invocations.
///
/// credential_process runs once per SDK call in the worst case, so
/// without the cache every invocation would mint a fresh STS session.
#[derive(Debug, Clone)]
pub struct AssumeRoleSource {
    request: AssumeRoleRequest,
    cache: FileCache,
    sts: Arc<dyn AssumeRole>,
}

impl AssumeRoleSource {
    pub fn new(request: AssumeRoleRequest, cache: FileCache, sts: Arc<dyn AssumeRole>) -> Self {
        Self {
            request,
            cache,
            sts,
        }
    }

    pub fn from_profile(
        config: &ProfileConfig,
        role: &RoleConfig,
        cache: FileCache,
        sts: Arc<dyn AssumeRole>,
    ) -> Self {
        Self::new(
            AssumeRoleRequest {
                role_arn: role.role_arn.clone(),
                session_name: role.session_name.clone(),
                external_id: role.external_id.clone(),
                duration_seconds: role.duration_seconds.unwrap_or(DEFAULT_ROLE_DURATION_SECS),
                source: role.source.clone(),
                region: config.region.clone(),
            },
            cache,
            sts,
        )
    }

    /// Cache key over the parameters that define the session.
    ///
    /// Auto-generated session names change on every call and would
    /// defeat the cache, so only an explicitly configured
    /// role_session_name is part of the identity.
    pub fn fingerprint(&self) -> CacheKey {
        CacheKey::from_payload(&json!({
            "type": "assume-role",
            "role_arn": self.request.role_arn,
            "session_name": self.request.session_name,
            "external_id": self.request.external_id,
            "duration_seconds": self.request.duration_seconds,
            "source": source_tag(&self.request.source),
        }))
    }

    pub async fn resolve(
        &self,
        previous: Option<&CacheEntry>,
    ) -> Result<ResolvedCredentials, ResolveError> {
        self.request.validate()?;
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

        let session = self.sts.assume_role(&self.request).await?;

        let entry = CacheEntry::new(&key, &session);
        if let Err(err) = self.cache.put(&key, &entry).await {
            // A broken cache slows the next invocation down, nothing more.
            warn!("Failed to write session cache entry: {}", err);
        }

        Ok(self.refreshable(session, key))
    }

    fn refreshable(&self, session: SessionCredentials, key: CacheKey) -> ResolvedCredentials {
        ResolvedCredentials::Refreshable(RefreshableCredentials::new(
            session,
            Some(key),
            CredentialSource::AssumeRole(self.clone()),
        ))
    }
}

fn source_tag(source: &RoleSource) -> String {
    match source {
        RoleSource::Profile(name) => format!("profile:{name}"),
        RoleSource::Environment => "env".to_string(),
        RoleSource::Ec2InstanceMetadata => "imds".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::{DateTime, Duration};

    use super::*;
    use crate::aws::sts::testing::StubAssumeRole;
    use crate::credentials::Credentials;

    fn request() -> AssumeRoleRequest {
        AssumeRoleRequest {
            role_arn: "arn:aws:iam::123456789012:role/deploy".to_string(),
            session_name: None,
            external_id: None,
            duration_seconds: 3600,
            source: RoleSource::Profile("base".to_string()),
            region: Some("us-east-1".to_string()),
        }
    }

    fn session(access_key_id: &str, expiration: DateTime<Utc>) -> SessionCredentials {
        SessionCredentials {
            credentials: Credentials {
                access_key_id: access_key_id.to_string(),
                secret_access_key: "secret".to_string(),
                session_token: Some("token".to_string()),
            },
            expiration,
        }
    }

    fn access_key(resolved: &ResolvedCredentials) -> String {
        match resolved {
            ResolvedCredentials::Refreshable(inner) => inner.credentials().access_key_id.clone(),
            ResolvedCredentials::Static(creds) => creds.access_key_id.clone(),
        }
    }

    #[tokio::test]
    async fn test_fresh_call_fetches_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().to_path_buf());
        let stub = StubAssumeRole::returning(session("AKIAFRESH", Utc::now() + Duration::hours(1)));
        let source = AssumeRoleSource::new(request(), cache.clone(), stub.clone());

        let resolved = source.resolve(None).await.unwrap();
        assert_eq!(access_key(&resolved), "AKIAFRESH");
        assert!(resolved.expiration().is_some());
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);

        let entry = cache.get(&source.fingerprint()).await.unwrap();
        assert_eq!(entry.credentials.access_key_id, "AKIAFRESH");
    }

    #[tokio::test]
    async fn test_cache_hit_skips_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().to_path_buf());

        let first_stub =
            StubAssumeRole::returning(session("AKIACACHED", Utc::now() + Duration::hours(1)));
        let first = AssumeRoleSource::new(request(), cache.clone(), first_stub);
        first.resolve(None).await.unwrap();

        // A separate invocation with the same parameters reuses the entry.
        let second_stub =
            StubAssumeRole::returning(session("AKIAUNSEEN", Utc::now() + Duration::hours(1)));
        let second = AssumeRoleSource::new(request(), cache, second_stub.clone());
        let resolved = second.resolve(None).await.unwrap();

        assert_eq!(access_key(&resolved), "AKIACACHED");
        assert_eq!(second_stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_cache_entry_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().to_path_buf());

        let stale_stub =
            StubAssumeRole::returning(session("AKIASTALE", Utc::now() + Duration::minutes(5)));
        let stale = AssumeRoleSource::new(request(), cache.clone(), stale_stub);
        stale.resolve(None).await.unwrap();

        // Within the refresh margin, so the entry must not be reused.
        let fresh_stub =
            StubAssumeRole::returning(session("AKIAFRESH", Utc::now() + Duration::hours(1)));
        let fresh = AssumeRoleSource::new(request(), cache.clone(), fresh_stub.clone());
        let resolved = fresh.resolve(None).await.unwrap();

        assert_eq!(access_key(&resolved), "AKIAFRESH");
        assert_eq!(fresh_stub.calls.load(Ordering::SeqCst), 1);

        let entry = cache.get(&fresh.fingerprint()).await.unwrap();
        assert_eq!(entry.credentials.access_key_id, "AKIAFRESH");
    }

    #[tokio::test]
    async fn test_refresh_bypasses_the_cache_read() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().to_path_buf());
        let stub = StubAssumeRole::returning(session("AKIANEW", Utc::now() + Duration::hours(1)));
        let source = AssumeRoleSource::new(request(), cache.clone(), stub.clone());

        // Seed the cache with an entry that would still count as fresh.
        let key = source.fingerprint();
        let cached = CacheEntry::new(&key, &session("AKIAOLD", Utc::now() + Duration::hours(1)));
        cache.put(&key, &cached).await.unwrap();

        let resolved = source.resolve(Some(&cached)).await.unwrap();
        assert_eq!(access_key(&resolved), "AKIANEW");
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_request_fails_before_any_call() {
        let dir = tempfile::tempdir().unwrap();
        let stub = StubAssumeRole::returning(session("AKIA", Utc::now() + Duration::hours(1)));
        let mut bad = request();
        bad.role_arn = "not-an-arn".to_string();
        let source =
            AssumeRoleSource::new(bad, FileCache::new(dir.path().to_path_buf()), stub.clone());

        let err = source.resolve(None).await.unwrap_err();
        assert!(matches!(err, ResolveError::Configuration(_)));
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sts_rejection_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let stub = StubAssumeRole::failing(|| {
            ResolveError::external("sts:AssumeRole", "AccessDenied: not authorized")
        });
        let source =
            AssumeRoleSource::new(request(), FileCache::new(dir.path().to_path_buf()), stub);

        let err = source.resolve(None).await.unwrap_err();
        assert!(!err.is_soft());
        assert!(err.to_string().contains("AccessDenied"));
    }

    #[tokio::test]
    async fn test_unwritable_cache_does_not_fail_resolution() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the cache directory should be makes every write fail.
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, b"in the way").unwrap();

        let stub = StubAssumeRole::returning(session("AKIAFRESH", Utc::now() + Duration::hours(1)));
        let source = AssumeRoleSource::new(request(), FileCache::new(blocked), stub);

        let resolved = source.resolve(None).await.unwrap();
        assert_eq!(access_key(&resolved), "AKIAFRESH");
    }

    #[test]
    fn test_fingerprint_covers_the_defining_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().to_path_buf());
        let stub = StubAssumeRole::returning(session("AKIA", Utc::now()));

        let base = AssumeRoleSource::new(request(), cache.clone(), stub.clone());
        let same = AssumeRoleSource::new(request(), cache.clone(), stub.clone());
        assert_eq!(base.fingerprint(), same.fingerprint());

        let mut renamed = request();
        renamed.session_name = Some("audit".to_string());
        let renamed = AssumeRoleSource::new(renamed, cache.clone(), stub.clone());
        assert_ne!(base.fingerprint(), renamed.fingerprint());

        let mut longer = request();
        longer.duration_seconds = 7200;
        let longer = AssumeRoleSource::new(longer, cache.clone(), stub.clone());
        assert_ne!(base.fingerprint(), longer.fingerprint());

        let mut other_source = request();
        other_source.source = RoleSource::Environment;
        let other_source = AssumeRoleSource::new(other_source, cache, stub);
        assert_ne!(base.fingerprint(), other_source.fingerprint());
    }
}
