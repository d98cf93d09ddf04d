//! Edits of a run's parameters.
//!
//! Every edit is a read-modify-write: the run is fetched, its parameters are
//! changed locally, and the whole record is sent back. Nothing guards against
//! a concurrent edit of the same run between the GET and the PUT, in which
//! case one of the edits is lost. If the PUT fails, the edit must be redone.
//!
//! On success, the locally edited run is returned.

use crate::client::BreadboardClient;
use crate::constants::keys;
use crate::errors::{RunUpdateError, TransportError};
use crate::models::{string_list, Parameters, RunRecord};
use crate::types::RunId;
use reqwest::{Method, Response};
use serde_json::{Map, Value};

impl BreadboardClient {
    /// Overwrite a run. The response may have an empty body.
    pub async fn put_run(&self, run: &RunRecord) -> Result<Response, TransportError> {
        let endpoint = format!("/runs/{}/", run.id);
        self.transport.send_checked(Method::PUT, &endpoint, run).await
    }

    /// Name the measurement a run belongs to. A run's measurement name can
    /// only be set once.
    pub async fn attach_measurement_name(
        &self,
        run_id: RunId,
        measurement_name: &str,
    ) -> Result<RunRecord, RunUpdateError> {
        let mut run = self.get_run(run_id).await?;
        if let Some(existing) = run.parameters.get(keys::MEASUREMENT_NAME) {
            let existing = match existing {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Err(RunUpdateError::DuplicateMeasurementName { run_id, existing });
        }
        run.parameters.insert(
            keys::MEASUREMENT_NAME.to_string(),
            Value::String(measurement_name.to_string()),
        );
        self.put_run(&run).await?;
        log::info!("run_id {} is part of measurement {}", run_id, measurement_name);
        Ok(run)
    }

    /// Associate image files with a run, keeping any images it already has.
    /// If `measurement_name` is given, it is then set like
    /// [Self::attach_measurement_name] does.
    pub async fn attach_images(
        &self,
        run_id: RunId,
        filenames: impl IntoIterator<Item = impl AsRef<str>>,
        measurement_name: Option<&str>,
    ) -> Result<RunRecord, RunUpdateError> {
        let filenames: Vec<String> = filenames
            .into_iter()
            .map(|f| f.as_ref().to_string())
            .collect();
        let mut run = self.get_run(run_id).await?;
        let overlap: Vec<&str> = string_list(run.parameters.get(keys::IMAGE_FILENAMES))
            .into_iter()
            .filter(|f| filenames.iter().any(|n| n == f))
            .collect();
        if !overlap.is_empty() {
            log::warn!(
                "Images {:?} were already associated with run_id {}",
                overlap,
                run_id
            );
        }
        union_names(&mut run.parameters, keys::IMAGE_FILENAMES, &filenames);
        self.put_run(&run).await?;
        log::info!("run_id {} associated with {:?}", run_id, filenames);
        log_bound_variables(&run);
        match measurement_name {
            Some(name) => self.attach_measurement_name(run_id, name).await,
            None => Ok(run),
        }
    }

    /// Record the results of analyzing a run. The names of `analysis` are
    /// added to the run's `analyzed_variables`.
    pub async fn attach_analysis(
        &self,
        run_id: RunId,
        analysis: &Map<String, Value>,
    ) -> Result<RunRecord, RunUpdateError> {
        let mut run = self.get_run(run_id).await?;
        let names: Vec<String> = analysis.keys().cloned().collect();
        union_names(&mut run.parameters, keys::ANALYZED_VARIABLES, &names);
        extend_parameters(&mut run.parameters, analysis);
        self.put_run(&run).await?;
        log::info!("run_id {} analyzed: {:?}", run_id, analysis);
        log_bound_variables(&run);
        Ok(run)
    }

    /// Record instrument readings taken during a run. Every name of
    /// `readings` must look like `<instrument>_in_<unit>`, e.g.
    /// `wavemeter_in_THz`. Nothing is sent if any name does not.
    pub async fn attach_instrument_readout(
        &self,
        run_id: RunId,
        readings: &Map<String, Value>,
    ) -> Result<RunRecord, RunUpdateError> {
        if let Some(bad) = readings.keys().find(|k| !is_instrument_key(k)) {
            return Err(RunUpdateError::InvalidInstrumentKey(bad.clone()));
        }
        let mut run = self.get_run(run_id).await?;
        let names: Vec<String> = readings.keys().cloned().collect();
        union_names(&mut run.parameters, keys::INSTRUMENT_NAMES, &names);
        extend_parameters(&mut run.parameters, readings);
        self.put_run(&run).await?;
        log::info!("run_id {} associated with: {:?}", run_id, readings);
        log_bound_variables(&run);
        Ok(run)
    }
}

/// Whether `key` names an instrument and a unit, e.g. `wavemeter_in_THz`.
pub fn is_instrument_key(key: &str) -> bool {
    key.split_once("_in_")
        .map_or(false, |(instrument, unit)| !instrument.is_empty() && !unit.is_empty())
}

/// Add `names` to the list at `parameters[key]`, skipping names already there.
fn union_names(parameters: &mut Parameters, key: &str, names: &[String]) {
    let mut merged: Vec<String> = string_list(parameters.get(key))
        .into_iter()
        .map(str::to_string)
        .collect();
    for name in names {
        if !merged.contains(name) {
            merged.push(name.clone());
        }
    }
    let merged = merged.into_iter().map(Value::String).collect();
    parameters.insert(key.to_string(), Value::Array(merged));
}

fn extend_parameters(parameters: &mut Parameters, values: &Map<String, Value>) {
    parameters.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
}

fn log_bound_variables(run: &RunRecord) {
    for var in run.list_bound_variables() {
        let value = run.parameters.get(var).unwrap_or(&Value::Null);
        log::info!("{}: {}", var, value);
    }
}
