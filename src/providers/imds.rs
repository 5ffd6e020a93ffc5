use crate::aws::imds::fetch_instance_credentials;
use crate::credentials::{RefreshableCredentials, ResolvedCredentials};
use crate::error::ResolveError;
use crate::providers::CredentialSource;

/// Instance-role credentials from the EC2 metadata service. Last in the
/// chain, and never cached on disk: the metadata service is local and
/// already caches for the instance.
#[derive(Debug, Clone, Default)]
pub struct ImdsSource;

impl ImdsSource {
    pub fn new() -> Self {
        Self
    }

    pub async fn resolve(&self) -> Result<ResolvedCredentials, ResolveError> {
        let session = fetch_instance_credentials().await?;
        Ok(ResolvedCredentials::Refreshable(RefreshableCredentials::new(
            session,
            None,
            CredentialSource::Imds(self.clone()),
        )))
    }
}
