use std::fmt;
use std::future::Future;

use aws_sdk_sts::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use tokio::time::timeout;

pub mod imds;
pub mod sso;
pub mod sts;

use crate::constants::EXTERNAL_CALL_TIMEOUT;
use crate::error::ResolveError;

/// Classify an SDK failure. A service error reached AWS and was
/// rejected, which makes it a hard failure; dispatch failures (connect,
/// DNS, TLS) never reached the service and stay soft so the chain can
/// try the next source.
pub(crate) fn map_sdk_error<E, R>(
    source: &'static str,
    operation: &'static str,
    err: SdkError<E, R>,
) -> ResolveError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: fmt::Debug,
{
    match err.as_service_error() {
        Some(service) => {
            let code = service.code().unwrap_or("Error");
            let message = service.message().unwrap_or("no detail from the service");
            ResolveError::external(operation, format!("{code}: {message}"))
        }
        None => ResolveError::transient(source, DisplayErrorContext(&err).to_string()),
    }
}

/// Bound every external call so a wedged endpoint cannot hang the
/// resolution. Timeouts are soft.
pub(crate) async fn with_timeout<T>(
    source: &'static str,
    future: impl Future<Output = T>,
) -> Result<T, ResolveError> {
    timeout(EXTERNAL_CALL_TIMEOUT, future).await.map_err(|_| {
        ResolveError::transient(
            source,
            format!("no response within {}s", EXTERNAL_CALL_TIMEOUT.as_secs()),
        )
    })
}
