use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{Method, Request, Uri};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::token::Token;
use crate::config::provider::ProviderConfig;
use crate::error::Error;
use crate::observability::metrics::get_metrics;
use crate::sources::FetchToken;
use crate::transport::executor::{HttpExecutor, TransportError};
use crate::utils::constants::{JSON_CONTENT_TYPE, TOKEN_ENDPOINT_PATH};

static SUCCESS_MSG: &str = "success";

#[derive(Serialize)]
struct TokenRequest<'a> {
    audience: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
}

/// Only `access_token` is read; everything else the provider sends is ignored.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client-credentials exchange against `<base_uri>/oauth/token`.
pub struct ProviderTokenSource<E> {
    executor: Arc<E>,
    endpoint: Uri,
    /// JSON body, serialized once; holds the client secret.
    body: Bytes,
}

impl<E> std::fmt::Debug for ProviderTokenSource<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderTokenSource")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl<E: HttpExecutor> ProviderTokenSource<E> {
    pub fn new(executor: Arc<E>, cfg: &ProviderConfig) -> Result<Self> {
        let endpoint = token_endpoint(&cfg.base_uri)?;
        let body = serde_json::to_vec(&TokenRequest {
            audience: &cfg.audience,
            client_id: &cfg.client_id,
            client_secret: &cfg.client_secret,
        })
        .context("failed to serialize token request")?;

        Ok(Self {
            executor,
            endpoint,
            body: Bytes::from(body),
        })
    }

    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    async fn request_token(&self) -> Result<Token, Error> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(ACCEPT, JSON_CONTENT_TYPE)
            .body(self.body.clone())
            .map_err(|err| {
                warn!("token request could not be built: {}", err);
                Error::NotAuthorized
            })?;

        let response = match self.executor.execute(request).await {
            Ok(response) => response,
            Err(TransportError::Connectivity(cause)) => {
                warn!("identity provider {} unreachable: {}", self.endpoint, cause);
                return Err(Error::ProviderUnavailable(cause));
            }
            Err(TransportError::Other(cause)) => {
                warn!("token request to {} failed: {}", self.endpoint, cause);
                return Err(Error::NotAuthorized);
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("identity provider rejected token request: {}", status);
            self.executor.dispose(response);
            return Err(Error::NotAuthorized);
        }

        let parsed: TokenResponse = serde_json::from_slice(response.body()).map_err(|err| {
            warn!("invalid token response: {}", err);
            Error::NotAuthorized
        })?;

        if parsed.access_token.trim().is_empty() {
            warn!("identity provider returned an empty access token");
            return Err(Error::NotAuthorized);
        }

        Token::new(parsed.access_token).map_err(|_| {
            warn!("identity provider returned a token that cannot be sent in a header");
            Error::NotAuthorized
        })
    }
}

impl<E: HttpExecutor> FetchToken for ProviderTokenSource<E> {
    async fn fetch(&self) -> Result<Token, Error> {
        let metrics = get_metrics();
        let start = Instant::now();
        debug!("requesting token from {}", self.endpoint);

        let result = self.request_token().await;

        metrics
            .token_fetch_duration
            .observe(start.elapsed().as_secs_f64());
        let outcome = match &result {
            Ok(_) => {
                info!("token issued by {}", self.endpoint);
                SUCCESS_MSG
            }
            Err(err) => err.kind(),
        };
        metrics.token_fetch_total.with_label_values(&[outcome]).inc();
        result
    }
}

/// `<base_uri>/oauth/token`, tolerating a trailing slash on the base.
pub fn token_endpoint(base_uri: &str) -> Result<Uri> {
    let joined = format!("{}{}", base_uri.trim_end_matches('/'), TOKEN_ENDPOINT_PATH);
    let uri: Uri = joined
        .parse()
        .with_context(|| format!("invalid provider base uri '{}'", base_uri))?;
    match uri.scheme_str() {
        Some("http") | Some("https") if uri.authority().is_some() => Ok(uri),
        _ => Err(anyhow!(
            "provider base uri '{}' must be an absolute http(s) uri",
            base_uri
        )),
    }
}
