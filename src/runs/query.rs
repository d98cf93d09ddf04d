use crate::client::BreadboardClient;
use crate::datetime::format_api_datetime;
use crate::errors::QueryError;
use crate::models::{RunPage, RunRecord};
use async_stream::try_stream;
use futures::Stream;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use time::OffsetDateTime;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum QueryValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// A query of the run collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunQuery {
    start: Option<String>,
    end: Option<String>,
    page: String,
    filters: BTreeMap<String, QueryValue>,
}

impl RunQuery {
    /// A query for the first page of runs, most recent first.
    pub fn new() -> Self {
        Default::default()
    }

    /// Only runs between `start` and `end`. A bound which is `None` is left out.
    pub fn range(self, start: Option<OffsetDateTime>, end: Option<OffsetDateTime>) -> Self {
        Self {
            start: start.map(format_api_datetime),
            end: end.map(format_api_datetime),
            ..self
        }
    }

    /// Like [Self::range], with bounds sent exactly as given, e.g. the
    /// `runtime` of a run including its fraction of a second.
    pub fn range_raw(self, start: Option<&str>, end: Option<&str>) -> Self {
        Self {
            start: start.map(str::to_string),
            end: end.map(str::to_string),
            ..self
        }
    }

    /// Suffix of the `/runs/` endpoint, e.g. `"?page=2"`.
    pub fn page(self, page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            ..self
        }
    }

    /// Maximum number of runs in a page.
    pub fn limit(self, limit: u32) -> Self {
        self.filter("limit", limit)
    }

    /// Any other query parameter understood by the API.
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    pub(crate) fn endpoint(&self) -> String {
        format!("/runs/{}", self.page)
    }

    /// Query string parameters, with the datetime bounds in the format the
    /// API expects.
    pub(crate) fn params(&self, lab: &str) -> Vec<(String, QueryValue)> {
        let bounds = [("start_datetime", &self.start), ("end_datetime", &self.end)]
            .into_iter()
            .filter_map(|(key, bound)| {
                bound
                    .as_ref()
                    .map(|b| (key.to_string(), QueryValue::String(b.clone())))
            });
        std::iter::once(("lab".to_string(), QueryValue::from(lab)))
            .chain(bounds)
            .chain(self.filters.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect()
    }
}

impl BreadboardClient {
    /// Get one page of runs.
    ///
    /// Fails with [QueryError::Remote] when the response has no `results`,
    /// e.g. because of an invalid filter or missing authorization.
    pub async fn query_runs(&self, query: &RunQuery) -> Result<RunPage, QueryError> {
        let params = query.params(self.lab_name.as_str());
        log::debug!("GET {} {:?}", query.endpoint(), params);
        let res = self
            .transport
            .send(Method::GET, &query.endpoint(), Some(&params), None::<&()>)
            .await?;
        let status = res.status();
        let text = res.text().await?;
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        let has_results = body
            .get("results")
            .and_then(Value::as_array)
            .map_or(false, |results| !results.is_empty());
        if !has_results {
            let detail = body
                .get("detail")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(text);
            return Err(QueryError::Remote { status, detail });
        }
        Ok(serde_json::from_value(body)?)
    }

    /// Produce every run matching `query`, following the pagination of the
    /// run collection. HTTP GET requests are sent as-needed.
    pub fn stream_runs(
        &self,
        query: RunQuery,
    ) -> impl Stream<Item = Result<RunRecord, QueryError>> + '_ {
        try_stream! {
            let page = self.query_runs(&query).await?;
            for run in page.results {
                yield run;
            }
            let mut next_url = page.next;
            while let Some(url) = next_url {
                let page: RunPage = self.transport.get_url(&url).await?;
                for run in page.results {
                    yield run;
                }
                next_url = page.next;
            }
        }
    }
}
