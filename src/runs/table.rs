use super::RunQuery;
use crate::client::BreadboardClient;
use crate::constants::{keys, EPOCH_RUNTIME};
use crate::datetime::runtime_to_unixtime;
use crate::errors::QueryError;
use crate::models::RunRecord;
use crate::table::{FallbackChain, FlatTable, ParamSelector, Row};
use serde_json::Value;
use std::collections::BTreeSet;

/// Name of the column copied from [RunTableOptions::x_var].
pub const X_COLUMN: &str = "x";

/// How to build a run table.
#[derive(Debug, Clone, PartialEq)]
pub struct RunTableOptions {
    pub params: ParamSelector,
    /// Column to copy into the `x` column.
    pub x_var: String,
    /// Also include top-level fields of the runs, like `id` and `url`.
    pub extended: bool,
}

impl Default for RunTableOptions {
    fn default() -> Self {
        Self {
            params: ParamSelector::ListBoundOnly,
            x_var: keys::UNIXTIME.to_string(),
            extended: false,
        }
    }
}

/// A run as seen while filling in its row.
pub struct RunRow<'a> {
    pub record: &'a RunRecord,
    /// The run's runtime, or the start of the epoch if it has none.
    pub runtime: &'a str,
}

/// Where to look for a run parameter: the runtime, the runtime as seconds
/// since the epoch, the run's parameters, then the run record itself.
pub fn run_fallback_chain<'a>() -> FallbackChain<RunRow<'a>> {
    FallbackChain::<RunRow<'a>>::new()
        .then("runtime", |row, param| {
            (param == keys::RUNTIME).then(|| Value::String(row.runtime.to_string()))
        })
        .then("unixtime", |row, param| {
            if param == keys::UNIXTIME {
                runtime_to_unixtime(row.runtime).map(Value::from)
            } else {
                None
            }
        })
        .then("parameters", |row, param| {
            row.record.parameters.get(param).cloned()
        })
        .then("run field", |row, param| row.record.top_level(param))
}

impl BreadboardClient {
    /// Get a table of one page of runs, sorted by runtime.
    ///
    /// Besides a column per selected parameter, the table always has the
    /// columns `runtime`, `unixtime`, and `x`.
    pub async fn build_run_table(
        &self,
        query: &RunQuery,
        options: &RunTableOptions,
    ) -> Result<FlatTable, QueryError> {
        let page = self.query_runs(query).await?;
        Ok(run_table(&page.results, options))
    }
}

/// Parameter columns of a run table.
pub(crate) fn run_params(runs: &[RunRecord], options: &RunTableOptions) -> BTreeSet<String> {
    let mut params = BTreeSet::new();
    if options.extended {
        params.extend(runs.iter().flat_map(|r| r.top_level_keys().map(str::to_string)));
    }
    match &options.params {
        ParamSelector::All => {
            params.extend(runs.iter().flat_map(|r| r.parameters.keys().cloned()));
        }
        ParamSelector::ListBoundOnly => {
            let bound = runs
                .iter()
                .flat_map(|r| r.list_bound_variables().into_iter().map(str::to_string));
            params.extend(bound);
        }
        ParamSelector::Explicit(given) => params.extend(given.iter().cloned()),
    }
    params.remove(keys::LIST_BOUND_VARIABLES);
    params.insert(keys::UNIXTIME.to_string());
    params
}

pub(crate) fn run_table(runs: &[RunRecord], options: &RunTableOptions) -> FlatTable {
    let params = run_params(runs, options);
    let chain = run_fallback_chain();
    let header = [keys::RUNTIME, X_COLUMN]
        .into_iter()
        .map(str::to_string)
        .chain(
            params
                .iter()
                .filter(|p| p.as_str() != keys::RUNTIME && p.as_str() != X_COLUMN)
                .cloned(),
        );
    let mut table = FlatTable::new(header);

    for record in runs {
        let runtime = record.runtime.as_deref().unwrap_or_else(|| {
            log::warn!("Run {} has no runtime, using {}", record.id, EPOCH_RUNTIME);
            EPOCH_RUNTIME
        });
        let context = RunRow { record, runtime };
        let mut row = Row::new();
        row.insert(keys::RUNTIME.to_string(), Value::String(runtime.to_string()));
        row.insert(X_COLUMN.to_string(), Value::from(0));
        for param in &params {
            let value = chain.resolve_or_null(&context, param);
            if value.is_null() {
                log::debug!("Run {} has no value for \"{}\"", record.id, param);
            }
            row.insert(param.clone(), value);
        }
        table.push_row(row);
    }

    if table.has_column(&options.x_var) {
        let x_var = options.x_var.as_str();
        table.fill_column(X_COLUMN, |row| row.get(x_var).cloned().unwrap_or(Value::Null));
    } else {
        log::warn!("Invalid x_var \"{}\", x is left as 0", options.x_var);
    }
    table.sort_by_str(keys::RUNTIME);
    table
}
