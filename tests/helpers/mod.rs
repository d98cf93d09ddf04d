#![allow(dead_code)]

use breadboard::types::{ApiKey, LabName};
use breadboard::{BreadboardClient, ConfigOverrides, Configuration};
use serde_json::{json, Value};

pub type AnyResult = Result<(), Box<dyn std::error::Error>>;

pub const LAB: &str = "fermi1";
pub const API_KEY: &str = "test-key";

/// A client for the mock API served by `server`.
pub fn client_for(server: &mockito::ServerGuard) -> BreadboardClient {
    let overrides = ConfigOverrides {
        api_key: Some(ApiKey::new(API_KEY.to_string())),
        api_url: Some(server.url()),
        lab_name: Some(LabName::new(LAB.to_string())),
    };
    let config = Configuration::resolve(overrides, Default::default()).unwrap();
    BreadboardClient::new(&config).unwrap()
}

/// A run record like the ones returned by `/runs/{id}/`.
pub fn run_json(id: u32, runtime: &str, parameters: Value) -> Value {
    json!({
        "id": id,
        "runtime": runtime,
        "notes": "",
        "url": format!("http://localhost/runs/{}/", id),
        "lab": LAB,
        "parameters": parameters
    })
}

/// A page of the run collection.
pub fn page_json(results: Vec<Value>, next: Option<String>) -> Value {
    json!({
        "count": results.len(),
        "next": next,
        "previous": null,
        "results": results
    })
}
