//! Definitions of structs describing response data from the Breadboard API.
//!
//! Records keep every field they were given, including ones not modeled
//! here, so that a record can be sent back unchanged apart from edits.

use crate::constants::keys;
use crate::types::{ImageId, RunId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A run's free-form parameters.
pub type Parameters = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: RunId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub parameters: Parameters,
    /// Fields such as `url` or `lab`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RunRecord {
    /// Names of the swept variables of this run.
    pub fn list_bound_variables(&self) -> Vec<&str> {
        string_list(self.parameters.get(keys::LIST_BOUND_VARIABLES))
    }

    /// Whether this run was flagged as bad. Runs are good unless flagged.
    pub fn badshot(&self) -> Value {
        self.parameters
            .get(keys::BADSHOT)
            .cloned()
            .unwrap_or(Value::Bool(false))
    }

    /// Names of the top-level fields of this record.
    pub fn top_level_keys(&self) -> impl Iterator<Item = &str> + '_ {
        let runtime = self.runtime.as_ref().map(|_| keys::RUNTIME);
        let notes = self.notes.as_ref().map(|_| "notes");
        ["id", "parameters"]
            .into_iter()
            .chain(runtime)
            .chain(notes)
            .chain(self.extra.keys().map(|k| k.as_str()))
    }

    /// Value of a top-level field.
    pub fn top_level(&self, key: &str) -> Option<Value> {
        match key {
            "id" => Some(Value::from(self.id.0)),
            "parameters" => Some(Value::Object(self.parameters.clone())),
            keys::RUNTIME => self.runtime.clone().map(Value::String),
            "notes" => self.notes.clone().map(Value::String),
            _ => self.extra.get(key).cloned(),
        }
    }
}

/// A page of the run collection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunPage {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<RunRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ImageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<ImageRun>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The run an image belongs to, as embedded in an image record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRun {
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ImageRecord {
    /// Parameters of the run which produced this image.
    pub fn run_parameters(&self) -> Option<&Parameters> {
        self.run.as_ref().map(|r| &r.parameters)
    }

    pub fn top_level_keys(&self) -> impl Iterator<Item = &str> + '_ {
        let id = self.id.map(|_| "id");
        let name = self.name.as_ref().map(|_| "name");
        let run = self.run.as_ref().map(|_| "run");
        id.into_iter()
            .chain(name)
            .chain(run)
            .chain(self.extra.keys().map(|k| k.as_str()))
    }

    pub fn top_level(&self, key: &str) -> Option<Value> {
        match key {
            "id" => self.id.map(|id| Value::from(id.0)),
            "name" => self.name.clone().map(Value::String),
            "run" => self
                .run
                .as_ref()
                .and_then(|r| serde_json::to_value(r).ok()),
            _ => self.extra.get(key).cloned(),
        }
    }
}

/// Interpret a JSON value as a list of strings. A lone string is a list of one.
pub(crate) fn string_list(value: Option<&Value>) -> Vec<&str> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(s)) => vec![s.as_str()],
        _ => Vec::new(),
    }
}
