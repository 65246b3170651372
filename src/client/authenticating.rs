use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;
use http::header::AUTHORIZATION;
use http::{Request, Response, StatusCode};
use tracing::{debug, info, warn};

use crate::cache::token::Token;
use crate::cache::token_cache::TokenCache;
use crate::client::synthesize;
use crate::config::provider::ProviderConfig;
use crate::error::Error;
use crate::observability::metrics::get_metrics;
use crate::resilience::retry::RetryBudget;
use crate::sources::provider::ProviderTokenSource;
use crate::sources::FetchToken;
use crate::transport::executor::HttpExecutor;

/// HTTP client that signs every request with the cached bearer token.
///
/// A 401 or 404 answer drops the token and the request is sent once more
/// with a freshly fetched one. Share one instance (it is `Clone`) between all
/// callers so they share the token.
pub struct AuthenticatingClient<E, S = ProviderTokenSource<E>> {
    executor: Arc<E>,
    cache: TokenCache<S>,
}

impl<E, S> Clone for AuthenticatingClient<E, S> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            cache: self.cache.clone(),
        }
    }
}

impl<E: HttpExecutor> AuthenticatingClient<E> {
    /// Client whose tokens come from the configured identity provider over
    /// the same executor.
    pub fn from_config(executor: Arc<E>, provider: &ProviderConfig) -> Result<Self> {
        let source = ProviderTokenSource::new(Arc::clone(&executor), provider)?;
        info!("token endpoint: {}", source.endpoint());
        Ok(Self::new(executor, TokenCache::new(source)))
    }
}

impl<E: HttpExecutor, S: FetchToken> AuthenticatingClient<E, S> {
    pub fn new(executor: Arc<E>, cache: TokenCache<S>) -> Self {
        Self { executor, cache }
    }

    pub fn cache(&self) -> &TokenCache<S> {
        &self.cache
    }

    /// Send `request` with authentication. Never fails: token or transport
    /// failures come back as a synthesized 401 or 408 response.
    pub async fn execute(&self, request: Request<Bytes>) -> Response<Bytes> {
        match self.try_execute(request).await {
            Ok((response, _)) => response,
            Err(err) => synthesize::error_response(&err),
        }
    }

    /// Same protocol as [`execute`](Self::execute), returning the response
    /// together with the token that produced it, or the failure as is.
    pub async fn try_execute(&self, request: Request<Bytes>) -> Result<(Response<Bytes>, Token), Error> {
        let result = self.run(&request).await;
        if let Err(err) = &result {
            warn!("{} {} failed: {}", request.method(), request.uri(), err);
        }
        result
    }

    async fn run(&self, request: &Request<Bytes>) -> Result<(Response<Bytes>, Token), Error> {
        let mut budget = RetryBudget::default();
        loop {
            // a failed fetch already leaves the cache empty
            let token = self.cache.get().await?;
            let response = match self.dispatch(request, &token).await {
                Ok(response) => response,
                Err(err) => {
                    self.cache.invalidate_if(&token);
                    return Err(err);
                }
            };

            let status = response.status();
            if !is_auth_failure(status) {
                debug!("{} {} -> {}", request.method(), request.uri(), status);
                return Ok((response, token));
            }

            warn!("{} {} rejected with {}", request.method(), request.uri(), status);
            self.executor.dispose(response);
            self.cache.invalidate_if(&token);

            if !budget.try_consume() {
                return Err(Error::NotAuthorized);
            }
            get_metrics().auth_retries.inc();
            info!("retrying {} {} with a refreshed token", request.method(), request.uri());
        }
    }

    async fn dispatch(&self, request: &Request<Bytes>, token: &Token) -> Result<Response<Bytes>, Error> {
        self.executor
            .execute(authorize(request, token))
            .await
            .map_err(|err| Error::ResourceUnavailable(err.to_string()))
    }
}

/// 401 and 404 both mean the token was refused: protected resources answer
/// 404 rather than reveal that something exists but belongs to someone else.
pub fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::NOT_FOUND
}

/// Copy of `request` carrying `Authorization: Bearer <token>`.
/// Everything else is kept as is; extensions are not copied.
fn authorize(request: &Request<Bytes>, token: &Token) -> Request<Bytes> {
    let mut out = Request::new(request.body().clone());
    *out.method_mut() = request.method().clone();
    *out.uri_mut() = request.uri().clone();
    *out.version_mut() = request.version();
    *out.headers_mut() = request.headers().clone();
    out.headers_mut().insert(AUTHORIZATION, token.bearer_header());
    out
}
