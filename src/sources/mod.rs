//! Token sources
//!
//! A source performs exactly one attempt per call; retrying is the caller's job.

use std::future::Future;

use crate::cache::token::Token;
use crate::error::Error;

pub mod provider;

pub use provider::ProviderTokenSource;

pub trait FetchToken: Send + Sync + 'static {
    /// Obtain a fresh token.
    ///
    /// `ProviderUnavailable` when the provider cannot be reached,
    /// `NotAuthorized` for every other failure.
    fn fetch(&self) -> impl Future<Output = Result<Token, Error>> + Send;
}
