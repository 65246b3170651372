use std::error::Error as StdError;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use http::{Request, Response};
use reqwest::Client;
use tracing::debug;

use crate::config::settings::TransportConfig;
use crate::transport::executor::{HttpExecutor, TransportError};

/// [`HttpExecutor`] backed by a shared `reqwest::Client`.
///
/// Response bodies are read in full before returning, so a response handed
/// out holds no connection.
#[derive(Debug, Clone)]
pub struct ReqwestExecutor {
    client: Client,
}

impl ReqwestExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build the underlying client with the configured timeouts.
    pub fn from_config(cfg: &TransportConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(cfg.connect_timeout_ms))
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self::new(client))
    }
}

impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        let request = reqwest::Request::try_from(request)
            .map_err(|err| TransportError::Other(describe(&err)))?;
        debug!("sending {} {}", request.method(), request.url());

        let response = self.client.execute(request).await.map_err(classify)?;

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(classify)?;

        let mut out = Response::new(body);
        *out.status_mut() = status;
        *out.version_mut() = version;
        *out.headers_mut() = headers;
        Ok(out)
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        TransportError::Connectivity(describe(&err))
    } else {
        TransportError::Other(describe(&err))
    }
}

/// Flatten an error and its sources into one line; reqwest keeps the useful
/// part ("Connection refused") a few levels down.
fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
