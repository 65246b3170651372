//! # Auth Agent Library
//!
//! Attaches OAuth2 bearer tokens to outgoing HTTP requests. Tokens are
//! fetched from the identity provider on demand, shared by all concurrent
//! callers, and refreshed once when a protected resource rejects them.
//!
//! Modules:
//! - `cache`: token value and single-flight token cache
//! - `sources`: identity provider token source
//! - `client`: authenticating client, retry protocol, error responses
//! - `transport`: injected HTTP executor and its reqwest implementation
//! - `config`: YAML configuration, defaults and validation
//! - `server`: sidecar proxy forwarding requests through the client

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod observability;
pub mod resilience;
pub mod server;
pub mod sources;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::cache::token::Token;
pub use crate::cache::token_cache::TokenCache;
pub use crate::client::authenticating::AuthenticatingClient;
pub use crate::config::provider::{ProviderConfig, ServiceConfig};
pub use crate::error::Error;
pub use crate::sources::{FetchToken, ProviderTokenSource};
pub use crate::transport::executor::{HttpExecutor, TransportError};
pub use crate::transport::reqwest_executor::ReqwestExecutor;
