use std::env;

use tracing::debug;

use crate::credentials::{Credentials, ResolvedCredentials};
use crate::error::ResolveError;

/// Static credentials from AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentSource;

impl EnvironmentSource {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self) -> Result<ResolvedCredentials, ResolveError> {
        let access_key_id = non_empty_var("AWS_ACCESS_KEY_ID");
        let secret_access_key = non_empty_var("AWS_SECRET_ACCESS_KEY");

        match (access_key_id, secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => {
                debug!("Using credentials from environment variables");
                Ok(ResolvedCredentials::Static(Credentials {
                    access_key_id,
                    secret_access_key,
                    session_token: non_empty_var("AWS_SESSION_TOKEN"),
                }))
            }
            (None, None) => Err(ResolveError::transient(
                "env",
                "AWS_ACCESS_KEY_ID is not set",
            )),
            // One half of a key pair is a mistake, not an absence.
            (Some(_), None) => Err(ResolveError::configuration(
                "AWS_ACCESS_KEY_ID is set but AWS_SECRET_ACCESS_KEY is missing",
            )),
            (None, Some(_)) => Err(ResolveError::configuration(
                "AWS_SECRET_ACCESS_KEY is set but AWS_ACCESS_KEY_ID is missing",
            )),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}
