use tracing::debug;

use crate::credentials::{Credentials, ResolvedCredentials};
use crate::error::ResolveError;

/// Static credentials declared inline in the profile's config section.
///
/// Partial key pairs are already rejected while the profile is parsed,
/// so by the time this source runs the keys are either complete or
/// absent.
#[derive(Debug, Clone)]
pub struct ConfigStaticSource {
    keys: Option<Credentials>,
}

impl ConfigStaticSource {
    pub fn new(keys: Option<Credentials>) -> Self {
        Self { keys }
    }

    pub fn resolve(&self) -> Result<ResolvedCredentials, ResolveError> {
        match &self.keys {
            Some(credentials) => {
                debug!("Using static credentials from the profile config section");
                Ok(ResolvedCredentials::Static(credentials.clone()))
            }
            None => Err(ResolveError::transient(
                "config",
                "profile declares no static access keys",
            )),
        }
    }
}
