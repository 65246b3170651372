//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks identity fields, absolute http(s) URIs, logging and metrics
//!   invariants, and the proxy server block when present

use http::Uri;
use tracing::{error, info};

use crate::config::provider::{ProviderConfig, ServiceConfig};
use crate::config::settings::{LoggingConfig, MetricsConfig, ServerConfig, TransportConfig};
use crate::utils::constants::LOG_LEVELS;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_provider(&cfg.provider, &mut errors);
    if let Some(logging) = &cfg.settings.logging {
        validate_logging(logging, &mut errors);
    }
    validate_metrics(&cfg.settings.metrics, &mut errors);
    validate_transport(&cfg.settings.transport, &mut errors);
    if let Some(server) = &cfg.settings.server {
        validate_server(server, &mut errors);
    }

    if errors.is_empty() {
        info!("config is valid");
        Ok(())
    } else {
        for e in &errors {
            error!("config error: {}", e);
        }
        Err(errors)
    }
}

fn validate_provider(provider: &ProviderConfig, errors: &mut Vec<String>) {
    if !is_absolute_http_uri(&provider.base_uri) {
        errors.push(format!(
            "provider.base_uri '{}' must be an absolute http(s) uri",
            provider.base_uri
        ));
    }
    for (field, value) in [
        ("audience", &provider.audience),
        ("client_id", &provider.client_id),
        ("client_secret", &provider.client_secret),
    ] {
        if value.trim().is_empty() {
            errors.push(format!("provider.{} must not be empty", field));
        }
    }
}

fn validate_logging(logging: &LoggingConfig, errors: &mut Vec<String>) {
    if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
        errors.push(format!(
            "settings.logging.level '{}' is unknown; allowed: {}",
            logging.level,
            LOG_LEVELS.join(", ")
        ));
    }
}

fn validate_metrics(metrics: &MetricsConfig, errors: &mut Vec<String>) {
    if !metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            metrics.path
        ));
    }
}

fn validate_transport(transport: &TransportConfig, errors: &mut Vec<String>) {
    if transport.connect_timeout_ms == 0 {
        errors.push("settings.transport.connect_timeout_ms must be > 0".to_string());
    }
    if transport.request_timeout_ms == 0 {
        errors.push("settings.transport.request_timeout_ms must be > 0".to_string());
    }
}

fn validate_server(server: &ServerConfig, errors: &mut Vec<String>) {
    if server.host.trim().is_empty() {
        errors.push("settings.server.host must not be empty".to_string());
    }
    if server.port == 0 {
        errors.push("settings.server.port must be > 0".to_string());
    }
    if !is_absolute_http_uri(&server.upstream) {
        errors.push(format!(
            "settings.server.upstream '{}' must be an absolute http(s) uri",
            server.upstream
        ));
    }
    if server.max_body_bytes == 0 {
        errors.push("settings.server.max_body_bytes must be > 0".to_string());
    }
}

fn is_absolute_http_uri(value: &str) -> bool {
    value
        .parse::<Uri>()
        .map(|uri| {
            matches!(uri.scheme_str(), Some("http") | Some("https")) && uri.authority().is_some()
        })
        .unwrap_or(false)
}
