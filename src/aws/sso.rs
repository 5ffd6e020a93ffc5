use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sso::Client as SsoClient;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use super::{map_sdk_error, with_timeout};
use crate::config::SsoConfig;
use crate::credentials::{Credentials, SessionCredentials};
use crate::error::ResolveError;

/// One token file written by `aws sso login` under ~/.aws/sso/cache.
#[derive(Clone, Deserialize)]
pub struct CachedSsoToken {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
    #[serde(rename = "startUrl", default)]
    pub start_url: Option<String>,
}

impl fmt::Debug for CachedSsoToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedSsoToken")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("start_url", &self.start_url)
            .finish()
    }
}

/// Find a usable SSO access token for `start_url`.
///
/// `aws sso login` names its token files after a hash of the session
/// parameters, so every JSON file in the cache directory has to be opened
/// and matched on its startUrl field. Unparseable files are skipped.
/// Only the user can mint a new token, so a missing or expired one is a
/// hard failure pointing at `aws sso login`.
pub fn find_cached_token(
    dir: &Path,
    start_url: &str,
    now: DateTime<Utc>,
) -> Result<CachedSsoToken, ResolveError> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Err(login_required(start_url));
    };

    let mut found_expired = false;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }
        let Ok(raw) = std::fs::read_to_string(&path) else {
            continue;
        };
        let Ok(token) = serde_json::from_str::<CachedSsoToken>(&raw) else {
            debug!("Skipping unparseable SSO cache file {}", path.display());
            continue;
        };
        if token.start_url.as_deref() != Some(start_url) {
            continue;
        }
        if token.expires_at <= now {
            found_expired = true;
            continue;
        }
        debug!("Found SSO access token in {}", path.display());
        return Ok(token);
    }

    if found_expired {
        Err(ResolveError::external(
            "sso",
            format!("the SSO token for {start_url} has expired; run `aws sso login` and retry"),
        ))
    } else {
        Err(login_required(start_url))
    }
}

fn login_required(start_url: &str) -> ResolveError {
    ResolveError::external(
        "sso",
        format!("no SSO token for {start_url}; run `aws sso login` first"),
    )
}

/// SSO portal GetRoleCredentials behind a trait, same as STS AssumeRole.
#[async_trait]
pub trait FetchRoleCredentials: Send + Sync + fmt::Debug {
    async fn fetch_role_credentials(
        &self,
        sso: &SsoConfig,
        access_token: &str,
    ) -> Result<SessionCredentials, ResolveError>;
}

#[derive(Debug, Default)]
pub struct SsoPortal;

#[async_trait]
impl FetchRoleCredentials for SsoPortal {
    async fn fetch_role_credentials(
        &self,
        sso: &SsoConfig,
        access_token: &str,
    ) -> Result<SessionCredentials, ResolveError> {
        info!("Calling AWS SSO GetRoleCredentials");
        debug!("Account: {}", sso.account_id);
        debug!("Role: {}", sso.role_name);

        // The portal call authenticates with the access token alone.
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(sso.region.clone()))
            .no_credentials()
            .load()
            .await;
        let client = SsoClient::new(&config);

        let call = client
            .get_role_credentials()
            .account_id(sso.account_id.as_str())
            .role_name(sso.role_name.as_str())
            .access_token(access_token);

        let response = with_timeout("sso", call.send())
            .await?
            .map_err(|err| map_sdk_error("sso", "sso:GetRoleCredentials", err))?;

        let role_creds = response.role_credentials().ok_or_else(|| {
            ResolveError::external("sso:GetRoleCredentials", "response contained no credentials")
        })?;

        let access_key_id = role_creds
            .access_key_id()
            .ok_or_else(|| missing_field("AccessKeyId"))?
            .to_string();
        let secret_access_key = role_creds
            .secret_access_key()
            .ok_or_else(|| missing_field("SecretAccessKey"))?
            .to_string();
        let session_token = role_creds.session_token().map(str::to_string);

        let expiration_ms = role_creds.expiration();
        let expiration = DateTime::from_timestamp_millis(expiration_ms)
            .filter(|_| expiration_ms > 0)
            .ok_or_else(|| {
                ResolveError::external(
                    "sso:GetRoleCredentials",
                    "response carried an invalid expiration",
                )
            })?;

        info!(
            "Successfully obtained session credentials, valid until {}",
            expiration
        );
        Ok(SessionCredentials {
            credentials: Credentials {
                access_key_id,
                secret_access_key,
                session_token,
            },
            expiration,
        })
    }
}

fn missing_field(field: &str) -> ResolveError {
    ResolveError::external(
        "sso:GetRoleCredentials",
        format!("response was missing {field}"),
    )
}
