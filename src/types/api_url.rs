//! NewType for the base address of a Breadboard deployment.

use crate::errors::InvalidApiUrl;
use aliri_braid::braid;

/// An [ApiUrl] is the base URL of a Breadboard API, e.g.
/// `http://breadboard-215702.appspot.com`
///
/// Endpoints such as `/runs/` are appended to it verbatim, so trailing
/// slashes are removed by [ApiUrl::normalized].
#[braid(validator, serde)]
pub struct ApiUrl(String);

impl aliri_braid::Validator for ApiUrl {
    type Error = InvalidApiUrl;

    fn validate(s: &str) -> Result<(), Self::Error> {
        if !(s.starts_with("http://") || s.starts_with("https://")) {
            Err(InvalidApiUrl::Protocol(s.to_string()))
        } else {
            Ok(())
        }
    }
}

impl ApiUrl {
    /// Validate `url` after stripping its trailing slashes.
    pub fn normalized(url: impl AsRef<str>) -> Result<Self, InvalidApiUrl> {
        Self::try_from(url.as_ref().trim_end_matches('/').to_string())
    }

    /// Full URL of an endpoint path starting with `/`.
    pub fn join(&self, endpoint: &str) -> String {
        format!("{}{}", self.as_str(), endpoint)
    }
}
