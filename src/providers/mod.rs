pub mod assume_role;
pub mod config_static;
pub mod environment;
pub mod imds;
pub mod shared_profile;
pub mod sso;

use clap::ValueEnum;

use crate::cache::CacheEntry;
use crate::credentials::ResolvedCredentials;
use crate::error::ResolveError;

// Re-export the source types (the chain builds them all).
pub use self::assume_role::AssumeRoleSource;
pub use self::config_static::ConfigStaticSource;
pub use self::environment::EnvironmentSource;
pub use self::imds::ImdsSource;
pub use self::shared_profile::SharedProfileSource;
pub use self::sso::SsoSource;

/// Names for the credential sources, used by `--source` and in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    AssumeRole,
    Sso,
    Config,
    Env,
    SharedCredentials,
    Imds,
}

impl SourceKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::AssumeRole => "assume-role",
            Self::Sso => "sso",
            Self::Config => "config",
            Self::Env => "env",
            Self::SharedCredentials => "shared-credentials",
            Self::Imds => "imds",
        }
    }
}

/// Credential source enum using composition pattern
/// Each variant contains a source-specific struct with its own implementation
#[derive(Debug, Clone)]
pub enum CredentialSource {
    AssumeRole(AssumeRoleSource),
    Sso(SsoSource),
    ConfigStatic(ConfigStaticSource),
    Environment(EnvironmentSource),
    SharedProfile(SharedProfileSource),
    Imds(ImdsSource),
}

impl CredentialSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::AssumeRole(_) => SourceKind::AssumeRole,
            Self::Sso(_) => SourceKind::Sso,
            Self::ConfigStatic(_) => SourceKind::Config,
            Self::Environment(_) => SourceKind::Env,
            Self::SharedProfile(_) => SourceKind::SharedCredentials,
            Self::Imds(_) => SourceKind::Imds,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Try to produce credentials from this source.
    ///
    /// `previous` is the cached entry being refreshed, if any. Sources
    /// that cache sessions skip their cache lookup when it is given, so
    /// a refresh always reaches the backing service.
    pub async fn resolve(
        &self,
        previous: Option<&CacheEntry>,
    ) -> Result<ResolvedCredentials, ResolveError> {
        match self {
            Self::AssumeRole(source) => source.resolve(previous).await,
            Self::Sso(source) => source.resolve(previous).await,
            Self::ConfigStatic(source) => source.resolve(),
            Self::Environment(source) => source.resolve(),
            Self::SharedProfile(source) => source.resolve(),
            Self::Imds(source) => source.resolve().await,
        }
    }
}
