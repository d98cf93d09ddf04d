//! Request headers which authenticate a client to the Breadboard API.

use crate::types::ApiKey;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};

const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

/// Holds a Breadboard API key.
///
/// The key is not validated: a wrong or missing key only surfaces when the
/// API responds with 401 or 403.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyAuth {
    api_key: Option<ApiKey>,
}

impl ApiKeyAuth {
    pub fn new(api_key: Option<ApiKey>) -> Self {
        Self { api_key }
    }

    /// Headers to send with every request.
    pub fn headers(&self) -> Result<HeaderMap, reqwest::header::InvalidHeaderValue> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key {
            let mut value = HeaderValue::from_str(key.as_str())?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}
