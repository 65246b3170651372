use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response, StatusCode};
use serde_json::json;

use crate::error::Error;
use crate::observability::metrics::get_metrics;
use crate::utils::constants::JSON_CONTENT_TYPE;

/// Status a failure is reported with.
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::NotAuthorized => StatusCode::UNAUTHORIZED,
        Error::ProviderUnavailable(_) | Error::ResourceUnavailable(_) => StatusCode::REQUEST_TIMEOUT,
    }
}

/// Turn a failure into an ordinary response: `{"message": "<error>"}`.
///
/// The body is plain bytes; there is nothing to dispose.
pub fn error_response(err: &Error) -> Response<Bytes> {
    let status = status_for(err);
    let body = json!({ "message": err.to_string() }).to_string();

    let mut response = Response::new(Bytes::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

    get_metrics()
        .synthesized_responses
        .with_label_values(&[status.as_str()])
        .inc();
    response
}
