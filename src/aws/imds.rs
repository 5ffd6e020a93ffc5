use aws_config::imds::credentials::ImdsCredentialsProvider;
use aws_credential_types::provider::ProvideCredentials;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::with_timeout;
use crate::credentials::{Credentials, SessionCredentials};
use crate::error::ResolveError;

/// Fetch instance-role credentials from the EC2 instance metadata service.
///
/// Off EC2 there is nothing to answer, so every failure here is soft:
/// connect errors, timeouts and a disabled endpoint all just mean "not
/// this source".
pub async fn fetch_instance_credentials() -> Result<SessionCredentials, ResolveError> {
    debug!("Querying EC2 instance metadata for role credentials");

    let provider = ImdsCredentialsProvider::builder().build();
    let creds = with_timeout("imds", provider.provide_credentials())
        .await?
        .map_err(|err| ResolveError::transient("imds", err.to_string()))?;

    let expiration = match creds.expiry() {
        Some(expiry) => DateTime::<Utc>::from(expiry),
        None => {
            return Err(ResolveError::transient(
                "imds",
                "metadata response carried no expiration",
            ));
        }
    };

    info!(
        "Successfully obtained instance credentials, valid until {}",
        expiration
    );
    Ok(SessionCredentials {
        credentials: Credentials {
            access_key_id: creds.access_key_id().to_string(),
            secret_access_key: creds.secret_access_key().to_string(),
            session_token: creds.session_token().map(str::to_string),
        },
        expiration,
    })
}
