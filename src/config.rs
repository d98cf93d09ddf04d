//! Client configuration: where the API is, which lab to query, and the API key.
//!
//! A configuration file is a JSON object such as
//!
//! ```json
//! {"api_key": "...", "api_url": "http://localhost:8000/", "lab_name": "fermi1"}
//! ```
//!
//! where every field is optional. Values given explicitly by the caller
//! take precedence over the file, which takes precedence over the default
//! (there is a default only for `api_url`).

use crate::constants::DEFAULT_API_URL;
use crate::errors::ConfigError;
use crate::types::{ApiKey, ApiUrl, LabName};
use serde::Deserialize;
use std::path::Path;

/// Contents of a configuration file.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub api_key: Option<ApiKey>,
    pub api_url: Option<String>,
    pub lab_name: Option<LabName>,
}

impl ConfigFile {
    /// Read a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = fs_err::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// Values given explicitly by the caller.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub api_key: Option<ApiKey>,
    pub api_url: Option<String>,
    pub lab_name: Option<LabName>,
}

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    api_key: Option<ApiKey>,
    api_url: ApiUrl,
    lab_name: LabName,
}

impl Configuration {
    /// Resolve a configuration from explicit values and a configuration file.
    pub fn resolve(overrides: ConfigOverrides, file: ConfigFile) -> Result<Self, ConfigError> {
        let lab_name = overrides
            .lab_name
            .or(file.lab_name)
            .ok_or(ConfigError::MissingLabName)?;
        let api_url = overrides
            .api_url
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Ok(Self {
            api_key: overrides.api_key.or(file.api_key),
            api_url: ApiUrl::normalized(api_url)?,
            lab_name,
        })
    }

    /// Read the configuration file at `path`, then apply `overrides`.
    pub fn from_file(
        path: impl AsRef<Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        Self::resolve(overrides, ConfigFile::load(path)?)
    }

    pub fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref()
    }

    pub fn api_url(&self) -> &ApiUrl {
        &self.api_url
    }

    pub fn lab_name(&self) -> &LabName {
        &self.lab_name
    }
}
