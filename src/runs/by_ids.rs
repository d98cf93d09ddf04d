use super::RunQuery;
use crate::client::BreadboardClient;
use crate::constants::{keys, MAX_BRUTEFORCE_SECONDS, SECONDS_PER_REQUEST};
use crate::errors::{QueryError, TransportError};
use crate::models::{string_list, RunRecord};
use crate::table::FlatTable;
use crate::types::RunId;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::HashMap;

/// How [BreadboardClient::get_runs_by_ids] fetches runs.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FetchStrategy {
    /// One request for one run.
    Single,
    /// One request per run, when that takes less than a second in total.
    PerId,
    /// Look up the first and last runs, then get everything in between with
    /// a single range query.
    Range,
}

impl FetchStrategy {
    /// Choose a strategy for fetching `count` runs.
    pub fn for_count(count: usize) -> Self {
        if count == 1 {
            Self::Single
        } else if (count as f64) * SECONDS_PER_REQUEST < MAX_BRUTEFORCE_SECONDS {
            Self::PerId
        } else {
            Self::Range
        }
    }
}

/// Flatten a run into the columns relevant for plotting or analysis.
///
/// Unlike [BreadboardClient::build_run_table], parameters which are absent
/// are left out rather than set to null.
pub fn flatten_run(run: &RunRecord, optional_columns: &[&str]) -> Vec<(String, Value)> {
    let params = &run.parameters;
    let mut row = vec![
        ("run_id".to_string(), Value::from(run.id.0)),
        (keys::BADSHOT.to_string(), run.badshot()),
        (
            "notes".to_string(),
            run.notes.clone().map(Value::String).unwrap_or(Value::Null),
        ),
    ];
    let mut push = |key: &str| {
        if let Some(value) = params.get(key) {
            match row.iter_mut().find(|(k, _)| k == key) {
                Some(existing) => existing.1 = value.clone(),
                None => row.push((key.to_string(), value.clone())),
            }
        }
    };
    params
        .keys()
        .filter(|k| k.starts_with(keys::MANUAL_PREFIX))
        .for_each(|k| push(k));
    optional_columns.iter().for_each(|k| push(k));
    string_list(params.get(keys::ANALYZED_VARIABLES))
        .into_iter()
        .for_each(&mut push);
    string_list(params.get(keys::INSTRUMENT_NAMES))
        .into_iter()
        .for_each(&mut push);
    run.list_bound_variables().into_iter().for_each(&mut push);
    if let Some(runtime) = &run.runtime {
        row.push((keys::RUNTIME.to_string(), Value::String(runtime.clone())));
    }
    row
}

impl BreadboardClient {
    /// Get a run.
    pub async fn get_run(&self, id: RunId) -> Result<RunRecord, TransportError> {
        self.transport
            .get(&format!("/runs/{}/", id), None::<&()>)
            .await
    }

    /// Get a run, or `None` if there is no run with this ID.
    pub async fn find_run(&self, id: RunId) -> Result<Option<RunRecord>, TransportError> {
        match self.get_run(id).await {
            Ok(run) => Ok(Some(run)),
            Err(TransportError::Error { status, .. }) if status == StatusCode::NOT_FOUND => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Get a table of the given runs with the columns described in
    /// [flatten_run].
    ///
    /// There is one row per element of `ids`, in the same order, whichever
    /// [FetchStrategy] is used. An ID without a run gets a row with only
    /// `run_id`, and a warning is logged.
    pub async fn get_runs_by_ids(
        &self,
        ids: &[RunId],
        optional_columns: &[&str],
    ) -> Result<FlatTable, QueryError> {
        if ids.is_empty() {
            return Ok(FlatTable::default());
        }
        let found = match FetchStrategy::for_count(ids.len()) {
            FetchStrategy::Single | FetchStrategy::PerId => {
                self.get_runs_individually(ids).await?
            }
            FetchStrategy::Range => self.get_runs_in_range(ids).await?,
        };
        let rows = ids
            .iter()
            .map(|id| match found.get(id) {
                Some(run) => flatten_run(run, optional_columns),
                None => missing_run_row(*id),
            })
            .collect();
        Ok(FlatTable::from_rows(rows))
    }

    /// Fetch runs concurrently, one request each.
    pub(crate) async fn get_runs_individually(
        &self,
        ids: &[RunId],
    ) -> Result<HashMap<RunId, RunRecord>, TransportError> {
        let wanted = unique(ids);
        let runs =
            futures::future::try_join_all(wanted.iter().map(|id| self.find_run(*id))).await?;
        Ok(runs.into_iter().flatten().map(|run| (run.id, run)).collect())
    }

    /// Fetch all runs from the smallest to the largest ID in one range query,
    /// keeping only the requested ones.
    ///
    /// The range is bounded by the runtimes of the first and last runs,
    /// sent as the server gave them.
    pub(crate) async fn get_runs_in_range(
        &self,
        ids: &[RunId],
    ) -> Result<HashMap<RunId, RunRecord>, QueryError> {
        let wanted = unique(ids);
        let (Some(&min), Some(&max)) = (wanted.first(), wanted.last()) else {
            return Ok(HashMap::new());
        };
        let (first, last) = futures::try_join!(self.find_run(min), self.find_run(max))?;
        let start = first.as_ref().and_then(|r| r.runtime.as_deref());
        let end = last.as_ref().and_then(|r| r.runtime.as_deref());
        let query = RunQuery::new()
            .range_raw(start, end)
            .limit(max.0 - min.0 + 1);
        let page = self.query_runs(&query).await?;
        Ok(page
            .results
            .into_iter()
            .filter(|run| wanted.binary_search(&run.id).is_ok())
            .map(|run| (run.id, run))
            .collect())
    }
}

/// Sorted IDs without duplicates.
fn unique(ids: &[RunId]) -> Vec<RunId> {
    let mut sorted = ids.to_vec();
    sorted.sort();
    sorted.dedup();
    sorted
}

fn missing_run_row(id: RunId) -> Vec<(String, Value)> {
    log::warn!("No run found for ID {}", id);
    vec![("run_id".to_string(), Value::from(id.0))]
}
