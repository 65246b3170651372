use anyhow::{anyhow, Context, Result};
use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use axum::Router;
use bytes::Bytes;
use http::header::{CONNECTION, HOST, TRANSFER_ENCODING};
use http::{HeaderMap, StatusCode, Uri};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::client::authenticating::AuthenticatingClient;
use crate::config::settings::{MetricsConfig, ServerConfig, SettingsConfig};
use crate::observability::metrics::get_metrics;
use crate::observability::routes::MetricsState;
use crate::transport::reqwest_executor::ReqwestExecutor;

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
    pub proxy_state: ProxyState,
}

#[derive(Clone)]
pub struct ProxyState {
    client: AuthenticatingClient<ReqwestExecutor>,
    /// upstream base without trailing slash
    upstream: String,
    max_body_bytes: usize,
}

impl AppState {
    pub fn new(client: AuthenticatingClient<ReqwestExecutor>, server: &ServerConfig) -> Self {
        Self {
            metrics_state: MetricsState::new(get_metrics().registry.clone()),
            proxy_state: ProxyState {
                client,
                upstream: server.upstream.trim_end_matches('/').to_owned(),
                max_body_bytes: server.max_body_bytes,
            },
        }
    }
}

/// Metrics route (when enabled) plus a catch-all that forwards to upstream.
pub fn router(state: AppState, metrics_config: &MetricsConfig) -> Router {
    Router::new()
        .merge(state.metrics_state.router(metrics_config))
        .fallback(forward)
        .with_state(state)
}

/// Serve the sidecar proxy until ctrl-c.
pub async fn start(
    settings_config: &SettingsConfig,
    client: AuthenticatingClient<ReqwestExecutor>,
) -> Result<()> {
    let server_config = settings_config
        .server
        .as_ref()
        .ok_or_else(|| anyhow!("settings.server is required to run the proxy"))?;

    let state = AppState::new(client, server_config);
    let app = router(state, &settings_config.metrics);

    let bind_addr = (server_config.host.as_str(), server_config.port);
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}:{}", server_config.host, server_config.port))?;
    info!(
        "proxy listening on {}, upstream {}",
        listener.local_addr()?,
        server_config.upstream
    );

    let metrics = get_metrics();
    metrics.up.set(1);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("proxy server failed")?;
    metrics.up.set(0);

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {}", err);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

async fn forward(State(state): State<AppState>, req: Request) -> Response {
    let proxy = &state.proxy_state;
    let (parts, body) = req.into_parts();

    let body = match axum::body::to_bytes(body, proxy.max_body_bytes).await {
        Ok(body) => body,
        Err(err) => {
            warn!("rejecting {} {}: {}", parts.method, parts.uri, err);
            return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
        }
    };

    let uri = match upstream_uri(&proxy.upstream, &parts.uri) {
        Ok(uri) => uri,
        Err(err) => {
            warn!("cannot map {} onto upstream: {}", parts.uri, err);
            return (StatusCode::BAD_REQUEST, "invalid request uri").into_response();
        }
    };

    let mut request = http::Request::new(body);
    *request.method_mut() = parts.method;
    *request.uri_mut() = uri;
    *request.headers_mut() = parts.headers;
    strip_hop_headers(request.headers_mut());
    request.headers_mut().remove(HOST);

    let response = proxy.client.execute(request).await;

    let (mut parts, body): (_, Bytes) = response.into_parts();
    strip_hop_headers(&mut parts.headers);
    Response::from_parts(parts, Body::from(body))
}

/// `<upstream><path>?<query>` for an incoming request uri.
pub fn upstream_uri(upstream: &str, incoming: &Uri) -> Result<Uri, http::uri::InvalidUri> {
    let path_and_query = incoming
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    format!("{}{}", upstream, path_and_query).parse()
}

// Bodies are fully buffered on both legs, framing is recomputed.
fn strip_hop_headers(headers: &mut HeaderMap) {
    headers.remove(CONNECTION);
    headers.remove(TRANSFER_ENCODING);
}
