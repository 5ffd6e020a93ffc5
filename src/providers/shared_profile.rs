use ini::Ini;
use tracing::debug;

use crate::constants;
use crate::credentials::{Credentials, ResolvedCredentials};
use crate::error::ResolveError;

/// Static credentials from the profile's section of the shared
/// credentials file (~/.aws/credentials unless overridden).
#[derive(Debug, Clone)]
pub struct SharedProfileSource {
    profile: String,
}

impl SharedProfileSource {
    pub fn new(profile: String) -> Self {
        Self { profile }
    }

    pub fn resolve(&self) -> Result<ResolvedCredentials, ResolveError> {
        let Some(path) = constants::get_aws_credentials_path() else {
            return Err(ResolveError::transient(
                "shared-credentials",
                "could not determine the credentials file location",
            ));
        };
        if !path.exists() {
            return Err(ResolveError::transient(
                "shared-credentials",
                format!("no credentials file at {}", path.display()),
            ));
        }

        // The file exists, so from here on broken means broken.
        let ini = Ini::load_from_file(&path).map_err(|err| {
            ResolveError::configuration(format!("failed to parse {}: {err}", path.display()))
        })?;

        let Some(section) = ini.section(Some(self.profile.as_str())) else {
            return Err(ResolveError::transient(
                "shared-credentials",
                format!(
                    "profile '{}' not found in {}",
                    self.profile,
                    path.display()
                ),
            ));
        };

        let get = |key: &str| section.get(key).filter(|value| !value.is_empty());
        match (get("aws_access_key_id"), get("aws_secret_access_key")) {
            (Some(access_key_id), Some(secret_access_key)) => {
                debug!("Using credentials from {}", path.display());
                Ok(ResolvedCredentials::Static(Credentials {
                    access_key_id: access_key_id.to_string(),
                    secret_access_key: secret_access_key.to_string(),
                    session_token: get("aws_session_token").map(str::to_string),
                }))
            }
            (None, None) => Err(ResolveError::transient(
                "shared-credentials",
                format!("profile '{}' declares no access keys", self.profile),
            )),
            _ => Err(ResolveError::configuration(format!(
                "profile '{}' in {} has an incomplete key pair",
                self.profile,
                path.display()
            ))),
        }
    }
}
