//! Errors for this crate.
//! About anyhow: see https://github.com/TrueLayer/reqwest-middleware/issues/119

use crate::types::RunId;
use reqwest::StatusCode;

/// Errors which might occur while resolving a [crate::Configuration].
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Please enter a lab name (not given and not found in the configuration file)")]
    MissingLabName,

    #[error(transparent)]
    InvalidUrl(#[from] InvalidApiUrl),

    #[error("API key contains characters which cannot be sent in a header")]
    InvalidApiKey(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Could not create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Malformed configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum InvalidApiUrl {
    #[error("Given URL does not start with \"http://\" or \"https://\": {0}")]
    Protocol(String),
}

aliri_braid::from_infallible!(InvalidApiUrl);

/// A number which cannot be an image ID.
#[derive(thiserror::Error, Debug)]
#[error("{0} is not a valid image ID")]
pub struct InvalidImageId(pub f64);

/// Errors representing failed interactions with the Breadboard API.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// Error response with an explanation from Breadboard.
    #[error("({status:?} {reason:?}): {text}")]
    Error {
        status: StatusCode,
        reason: &'static str,
        text: String,
        source: reqwest::Error,
    },

    /// Connection failure, timeout, or undecodable response.
    #[error(transparent)]
    Raw(#[from] reqwest::Error),

    /// Error from reqwest middleware function.
    #[error(transparent)]
    Middleware(anyhow::Error),

    /// A request body could not be serialized.
    #[error("Could not encode request body: {0}")]
    Encode(serde_json::Error),
}

/// Errors from querying the run collection.
#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response did not contain any `results`. `detail` is the explanation
    /// given by the server, if any.
    #[error("Query returned no results ({status}): {detail}")]
    Remote { status: StatusCode, detail: String },

    #[error("Malformed run list: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors from the read-modify-write operations on a run's parameters.
#[derive(thiserror::Error, Debug)]
pub enum RunUpdateError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Run {run_id} is already associated with measurement \"{existing}\"")]
    DuplicateMeasurementName { run_id: RunId, existing: String },

    #[error("{0} is not in format instrname_in_unitname (e.g. wavemeter_in_THz). Add units properly.")]
    InvalidInstrumentKey(String),
}

pub(crate) async fn check(res: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    match res.error_for_status_ref() {
        Ok(_) => Ok(res),
        Err(source) => {
            let status = res.status();
            let reason = status.canonical_reason().unwrap_or("unknown reason");
            let text = res.text().await.map_err(TransportError::Raw)?;
            Err(TransportError::Error {
                status,
                reason,
                text,
                source,
            })
        }
    }
}

impl From<reqwest_middleware::Error> for TransportError {
    fn from(error: reqwest_middleware::Error) -> Self {
        match error {
            reqwest_middleware::Error::Middleware(e) => TransportError::Middleware(e),
            reqwest_middleware::Error::Reqwest(e) => TransportError::Raw(e),
        }
    }
}

impl From<reqwest_middleware::Error> for QueryError {
    fn from(error: reqwest_middleware::Error) -> Self {
        TransportError::from(error).into()
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(error: reqwest::Error) -> Self {
        TransportError::from(error).into()
    }
}

impl From<reqwest::Error> for RunUpdateError {
    fn from(error: reqwest::Error) -> Self {
        TransportError::from(error).into()
    }
}
