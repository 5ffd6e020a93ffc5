use std::env;
use std::sync::Arc;

use tracing::{debug, info};

use crate::aws::sso::SsoPortal;
use crate::aws::sts::StsAssumeRole;
use crate::cache::FileCache;
use crate::config::ProfileConfig;
use crate::constants;
use crate::credentials::ResolvedCredentials;
use crate::error::ResolveError;
use crate::providers::{
    AssumeRoleSource, ConfigStaticSource, CredentialSource, EnvironmentSource, ImdsSource,
    SharedProfileSource, SourceKind, SsoSource,
};

/// Ordered credential sources for one profile. First success wins.
#[derive(Debug)]
pub struct ProviderChain {
    sources: Vec<CredentialSource>,
}

impl ProviderChain {
    pub fn new(sources: Vec<CredentialSource>) -> Self {
        Self { sources }
    }

    /// Build the chain for a profile.
    ///
    /// An assume-role or SSO declaration leads the chain, followed by
    /// static keys from the config section, the process environment,
    /// the shared credentials file and finally instance metadata. A
    /// profile that declares both a role and SSO resolves the role.
    pub fn for_profile(
        config: &ProfileConfig,
        cache: FileCache,
        only: Option<SourceKind>,
    ) -> Result<Self, ResolveError> {
        let mut sources = Vec::new();

        if let Some(role) = &config.role {
            sources.push(CredentialSource::AssumeRole(AssumeRoleSource::from_profile(
                config,
                role,
                cache.clone(),
                Arc::new(StsAssumeRole),
            )));
        } else if let Some(sso) = &config.sso {
            let token_dir = constants::get_sso_token_cache_dir().ok_or_else(|| {
                ResolveError::configuration("could not determine the SSO token cache directory")
            })?;
            sources.push(CredentialSource::Sso(SsoSource::new(
                sso.clone(),
                token_dir,
                cache.clone(),
                Arc::new(SsoPortal),
            )));
        }

        sources.push(CredentialSource::ConfigStatic(ConfigStaticSource::new(
            config.static_keys.clone(),
        )));
        sources.push(CredentialSource::Environment(EnvironmentSource::new()));
        sources.push(CredentialSource::SharedProfile(SharedProfileSource::new(
            config.profile.clone(),
        )));

        if imds_enabled() {
            sources.push(CredentialSource::Imds(ImdsSource::new()));
        }

        if let Some(only) = only {
            sources.retain(|source| source.kind() == only);
            if sources.is_empty() {
                return Err(ResolveError::configuration(format!(
                    "profile '{}' does not configure a {} source",
                    config.profile,
                    only.name()
                )));
            }
        }

        Ok(Self::new(sources))
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(CredentialSource::name).collect()
    }

    /// Walk the chain in order.
    ///
    /// Soft failures move on to the next source. A hard failure aborts
    /// immediately: a profile that explicitly configured a source must
    /// never silently fall through to a weaker one. An exhausted chain
    /// is its own error.
    pub async fn resolve(&self) -> Result<ResolvedCredentials, ResolveError> {
        for source in &self.sources {
            debug!("Trying credential source: {}", source.name());
            match source.resolve(None).await {
                Ok(resolved) => {
                    info!("Resolved credentials from source: {}", source.name());
                    return Ok(resolved);
                }
                Err(err) if err.is_soft() => {
                    debug!("Source {} unavailable: {}", source.name(), err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(ResolveError::NoCredentials)
    }
}

// AWS_EC2_METADATA_DISABLED=true removes the IMDS source entirely.
fn imds_enabled() -> bool {
    !env::var("AWS_EC2_METADATA_DISABLED").is_ok_and(|value| value.eq_ignore_ascii_case("true"))
}
