//! HTTP session shared by every request of a [crate::BreadboardClient].

use crate::auth::ApiKeyAuth;
use crate::constants::REQUEST_TIMEOUT;
use crate::errors::{check, ConfigError, TransportError};
use crate::types::ApiUrl;
use reqwest::{Method, Response};
use reqwest_middleware::ClientWithMiddleware;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Sends requests to the Breadboard API over one persistent connection pool.
///
/// Requests time out after 30 seconds and are never retried here. Retries
/// can be added as middleware, see [TransportBuilder::with].
#[derive(Debug, Clone)]
pub struct Transport {
    client: ClientWithMiddleware,
    url: ApiUrl,
}

pub struct TransportBuilder {
    url: ApiUrl,
    builder: reqwest_middleware::ClientBuilder,
}

impl TransportBuilder {
    pub(crate) fn new(url: ApiUrl, auth: &ApiKeyAuth) -> Result<Self, ConfigError> {
        let client = reqwest::ClientBuilder::new()
            .default_headers(auth.headers()?)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let builder = reqwest_middleware::ClientBuilder::new(client);
        Ok(Self { url, builder })
    }

    /// Add middleware to the HTTP client.
    pub fn with<M: reqwest_middleware::Middleware>(self, middleware: M) -> Self {
        Self {
            url: self.url,
            builder: self.builder.with(middleware),
        }
    }

    pub fn build(self) -> Transport {
        Transport {
            client: self.builder.build(),
            url: self.url,
        }
    }
}

impl Transport {
    /// Get the API URL.
    pub fn url(&self) -> &ApiUrl {
        &self.url
    }

    /// Send a request to `endpoint`, e.g. `/runs/`. `query` is encoded into the
    /// query string and `body` is sent as JSON.
    ///
    /// The response is returned whatever its status.
    pub async fn send<Q, B>(
        &self,
        method: Method,
        endpoint: &str,
        query: Option<&Q>,
        body: Option<&B>,
    ) -> Result<Response, TransportError>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let mut req = self.client.request(method, self.url.join(endpoint));
        if let Some(query) = query {
            req = req.query(query);
        }
        if let Some(body) = body {
            let data = serde_json::to_vec(body).map_err(TransportError::Encode)?;
            req = req.body(data);
        }
        Ok(req.send().await?)
    }

    /// GET `endpoint` and deserialize a successful response.
    pub(crate) async fn get<Q, T>(&self, endpoint: &str, query: Option<&Q>) -> Result<T, TransportError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let res = self.send(Method::GET, endpoint, query, None::<&()>).await?;
        Ok(check(res).await?.json().await?)
    }

    /// GET an absolute URL, such as the `next` link of a paginated response.
    pub(crate) async fn get_url<T: DeserializeOwned>(&self, url: &str) -> Result<T, TransportError> {
        let res = self.client.get(url).send().await?;
        Ok(check(res).await?.json().await?)
    }

    /// Send `body` as JSON to `endpoint` and return the successful response.
    ///
    /// The response body is left unread, as it may be empty.
    pub(crate) async fn send_checked<B>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
    ) -> Result<Response, TransportError>
    where
        B: Serialize + ?Sized,
    {
        let res = self.send(method, endpoint, None::<&()>, Some(body)).await?;
        check(res).await
    }
}
