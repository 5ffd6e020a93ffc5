use async_trait::async_trait;
use aws_config::environment::EnvironmentVariableCredentialsProvider;
use aws_config::imds::credentials::ImdsCredentialsProvider;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sts::Client as StsClient;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{map_sdk_error, with_timeout};
use crate::config::RoleSource;
use crate::constants::{DEFAULT_AWS_REGION, MAX_ROLE_DURATION_SECS, MIN_ROLE_DURATION_SECS};
use crate::credentials::{Credentials, SessionCredentials};
use crate::error::ResolveError;

/// Parameters for one STS AssumeRole call.
#[derive(Debug, Clone, PartialEq)]
pub struct AssumeRoleRequest {
    pub role_arn: String,
    pub session_name: Option<String>,
    pub external_id: Option<String>,
    pub duration_seconds: i32,
    pub source: RoleSource,
    pub region: Option<String>,
}

impl AssumeRoleRequest {
    /// Reject obviously invalid parameters before any network call.
    pub fn validate(&self) -> Result<(), ResolveError> {
        if !self.role_arn.starts_with("arn:") || self.role_arn.split(':').count() < 6 {
            return Err(ResolveError::configuration(format!(
                "'{}' is not a valid role ARN",
                self.role_arn
            )));
        }
        if !(MIN_ROLE_DURATION_SECS..=MAX_ROLE_DURATION_SECS).contains(&self.duration_seconds) {
            return Err(ResolveError::configuration(format!(
                "duration_seconds must be between {MIN_ROLE_DURATION_SECS} and \
                 {MAX_ROLE_DURATION_SECS}, got {}",
                self.duration_seconds
            )));
        }
        Ok(())
    }
}

/// STS AssumeRole behind a trait so resolution logic can be exercised
/// without the network.
#[async_trait]
pub trait AssumeRole: Send + Sync + std::fmt::Debug {
    async fn assume_role(
        &self,
        request: &AssumeRoleRequest,
    ) -> Result<SessionCredentials, ResolveError>;
}

#[derive(Debug, Default)]
pub struct StsAssumeRole;

#[async_trait]
impl AssumeRole for StsAssumeRole {
    async fn assume_role(
        &self,
        request: &AssumeRoleRequest,
    ) -> Result<SessionCredentials, ResolveError> {
        info!("Calling AWS STS AssumeRole");
        debug!("Role ARN: {}", request.role_arn);
        debug!("Source: {:?}", request.source);
        debug!("Duration: {} seconds", request.duration_seconds);

        // Load AWS config with automatic region fallback
        // Priority: profile region -> environment/config chain -> DEFAULT_AWS_REGION
        let config = {
            let loaded = sdk_defaults(request).load().await;

            match loaded.region() {
                Some(region) => {
                    info!("Using region: {}", region);
                    loaded
                }
                None => {
                    info!(
                        "No region configured, using default {} for STS",
                        DEFAULT_AWS_REGION
                    );
                    sdk_defaults(request)
                        .region(Region::new(DEFAULT_AWS_REGION))
                        .load()
                        .await
                }
            }
        };

        let client = StsClient::new(&config);

        let session_name = request
            .session_name
            .clone()
            .unwrap_or_else(default_session_name);

        let call = client
            .assume_role()
            .role_arn(request.role_arn.as_str())
            .role_session_name(session_name)
            .duration_seconds(request.duration_seconds)
            .set_external_id(request.external_id.clone());

        let response = with_timeout("assume-role", call.send())
            .await?
            .map_err(|err| map_sdk_error("assume-role", "sts:AssumeRole", err))?;

        let sts_creds = response.credentials().ok_or_else(|| {
            ResolveError::external("sts:AssumeRole", "response contained no credentials")
        })?;

        let expiration = to_chrono(sts_creds.expiration()).ok_or_else(|| {
            ResolveError::external("sts:AssumeRole", "response carried an invalid expiration")
        })?;

        info!(
            "Successfully obtained session credentials, valid until {}",
            expiration
        );
        Ok(SessionCredentials {
            credentials: Credentials {
                access_key_id: sts_creds.access_key_id().to_string(),
                secret_access_key: sts_creds.secret_access_key().to_string(),
                session_token: Some(sts_creds.session_token().to_string()),
            },
            expiration,
        })
    }
}

// The AssumeRole call authenticates with the configured source
// credentials, never with anything this process resolved earlier.
fn sdk_defaults(request: &AssumeRoleRequest) -> aws_config::ConfigLoader {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &request.region {
        loader = loader.region(Region::new(region.clone()));
    }
    match &request.source {
        RoleSource::Profile(name) => loader = loader.profile_name(name.as_str()),
        RoleSource::Environment => {
            loader = loader.credentials_provider(EnvironmentVariableCredentialsProvider::new());
        }
        RoleSource::Ec2InstanceMetadata => {
            loader = loader.credentials_provider(ImdsCredentialsProvider::builder().build());
        }
    }
    loader
}

fn default_session_name() -> String {
    format!("chai-session-{}", Utc::now().timestamp())
}

pub(crate) fn to_chrono(expiration: &aws_smithy_types::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(expiration.secs(), expiration.subsec_nanos())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::fmt;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Scripted AssumeRole for cache and chain tests.
    pub(crate) struct StubAssumeRole {
        make: Box<dyn Fn() -> Result<SessionCredentials, ResolveError> + Send + Sync>,
        pub calls: AtomicUsize,
    }

    impl fmt::Debug for StubAssumeRole {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("StubAssumeRole")
        }
    }

    impl StubAssumeRole {
        pub fn returning(session: SessionCredentials) -> Arc<Self> {
            Arc::new(Self {
                make: Box::new(move || Ok(session.clone())),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn failing(make: impl Fn() -> ResolveError + Send + Sync + 'static) -> Arc<Self> {
            Arc::new(Self {
                make: Box::new(move || Err(make())),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl AssumeRole for StubAssumeRole {
        async fn assume_role(
            &self,
            _request: &AssumeRoleRequest,
        ) -> Result<SessionCredentials, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.make)()
        }
    }
}
