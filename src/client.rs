use crate::auth::ApiKeyAuth;
use crate::config::Configuration;
use crate::errors::ConfigError;
use crate::transport::{Transport, TransportBuilder};
use crate::types::{ApiUrl, LabName};

/// Breadboard client. Queries are scoped to a single lab.
///
/// The image and run operations are implemented in [crate::images] and
/// [crate::runs].
#[derive(Debug, Clone)]
pub struct BreadboardClient {
    pub(crate) transport: Transport,
    pub(crate) lab_name: LabName,
}

pub struct BreadboardClientBuilder {
    transport: TransportBuilder,
    lab_name: LabName,
}

impl BreadboardClientBuilder {
    /// Add middleware to the HTTP client, e.g. a retry policy.
    pub fn with<M: reqwest_middleware::Middleware>(self, middleware: M) -> Self {
        Self {
            transport: self.transport.with(middleware),
            lab_name: self.lab_name,
        }
    }

    pub fn build(self) -> BreadboardClient {
        BreadboardClient {
            transport: self.transport.build(),
            lab_name: self.lab_name,
        }
    }
}

impl BreadboardClient {
    /// Create a client.
    pub fn new(config: &Configuration) -> Result<Self, ConfigError> {
        Self::builder(config).map(BreadboardClientBuilder::build)
    }

    /// Create a client builder.
    pub fn builder(config: &Configuration) -> Result<BreadboardClientBuilder, ConfigError> {
        let auth = ApiKeyAuth::new(config.api_key().cloned());
        let transport = TransportBuilder::new(config.api_url().clone(), &auth)?;
        Ok(BreadboardClientBuilder {
            transport,
            lab_name: config.lab_name().clone(),
        })
    }

    /// Get the API URL.
    pub fn url(&self) -> &ApiUrl {
        self.transport.url()
    }

    pub fn lab_name(&self) -> &LabName {
        &self.lab_name
    }

    /// Get the underlying HTTP session, for requests this client has no method for.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }
}
