use thiserror::Error;

/// Failures of token acquisition and authenticated dispatch.
///
/// Produced per call. The retry protocol consumes them internally and
/// [`AuthenticatingClient::execute`](crate::client::authenticating::AuthenticatingClient::execute)
/// turns whatever is left into a synthesized response, so none of these ever
/// reaches the caller as a raised failure.
///
/// `Clone` because every waiter of a single-flight fetch receives the same outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The identity provider rejected the client credentials, returned
    /// something unusable, or the protected resource kept refusing the token.
    #[error("credentials rejected")]
    NotAuthorized,

    /// The identity provider could not be reached.
    /// Carries the transport's description of the failure.
    #[error("identity provider unreachable: {0}")]
    ProviderUnavailable(String),

    /// The authenticated request itself failed in transport.
    #[error("request to protected resource failed: {0}")]
    ResourceUnavailable(String),
}

impl Error {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotAuthorized => "not_authorized",
            Error::ProviderUnavailable(_) => "provider_unavailable",
            Error::ResourceUnavailable(_) => "resource_unavailable",
        }
    }
}
