use thiserror::Error;

/// Failure taxonomy for credential resolution.
///
/// Soft failures mean "this source has nothing for you, ask the next one";
/// everything else aborts the chain immediately so a broken explicit
/// configuration never silently falls through to a weaker source.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Invalid or contradictory configuration, including unknown profiles
    /// and malformed config files.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A credential source is unavailable here. The chain skips it.
    ///
    /// The field is not named `source` because thiserror would infer it as
    /// the std::error::Error source, which a plain str cannot be.
    #[error("{source_name} source unavailable: {reason}")]
    Transient {
        source_name: &'static str,
        reason: String,
    },

    /// Every source in the chain was exhausted without producing credentials.
    #[error("Unable to locate AWS credentials")]
    NoCredentials,

    /// An AWS service rejected a call this profile explicitly asked for.
    #[error("{operation} failed: {message}")]
    ExternalCall {
        operation: &'static str,
        message: String,
    },

    /// The user hit Ctrl-C while a resolution was in flight.
    #[error("interrupted")]
    Interrupted,
}

impl ResolveError {
    /// Soft failures let the provider chain continue with the next source.
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn transient(source: &'static str, reason: impl Into<String>) -> Self {
        Self::Transient {
            source_name: source,
            reason: reason.into(),
        }
    }

    pub fn external(operation: &'static str, message: impl Into<String>) -> Self {
        Self::ExternalCall {
            operation,
            message: message.into(),
        }
    }
}
