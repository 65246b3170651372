use std::fmt;
use std::sync::Arc;

use http::header::InvalidHeaderValue;
use http::HeaderValue;

/// Opaque bearer credential issued by the identity provider.
///
/// Immutable and cheap to clone. No expiry is tracked: a token is good until
/// a protected resource says otherwise.
#[derive(Clone)]
pub struct Token {
    value: Arc<str>,
    /// `Bearer <value>`, built once and marked sensitive.
    header: HeaderValue,
}

impl Token {
    /// Wrap a raw access token.
    ///
    /// Fails when the value cannot travel in an HTTP header
    /// (control characters, line breaks).
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidHeaderValue> {
        let value: String = value.into();
        let mut header = HeaderValue::from_str(&format!("Bearer {value}"))?;
        header.set_sensitive(true);
        Ok(Self {
            value: value.into(),
            header,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Value for the `Authorization` header.
    pub fn bearer_header(&self) -> HeaderValue {
        self.header.clone()
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Token {}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token").finish_non_exhaustive()
    }
}
