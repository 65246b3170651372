use std::future::Future;

use bytes::Bytes;
use http::{Request, Response};
use thiserror::Error;

/// Failures reported by an [`HttpExecutor`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The remote side could not be reached: connect failure, reset, timeout.
    #[error("{0}")]
    Connectivity(String),

    /// The request could not be built or the response could not be read.
    #[error("{0}")]
    Other(String),
}

/// Capability to send HTTP requests.
///
/// Injected into both the token source and the authenticating client; nothing
/// else in the crate opens connections.
pub trait HttpExecutor: Send + Sync + 'static {
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<Bytes>, TransportError>> + Send;

    /// Release whatever a response still holds.
    ///
    /// Called on every response that is discarded instead of handed back to a
    /// caller (rejected token requests, 401/404 answers before a retry).
    fn dispose(&self, response: Response<Bytes>) {
        drop(response);
    }
}
