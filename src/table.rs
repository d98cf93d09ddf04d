//! Flat, row-oriented tables built from nested JSON records.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::str::FromStr;

/// One row of a [FlatTable].
pub type Row = BTreeMap<String, Value>;

/// A table of JSON values. Rows are indexed by position.
///
/// `Value::Null` marks a cell which could not be resolved. Tables made by
/// [crate::BreadboardClient::get_runs_by_ids] may also have rows without
/// some columns, see [FlatTable::get].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlatTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl FlatTable {
    /// Create an empty table with the given columns.
    pub fn new(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Concatenate rows. The columns are the union of every row's keys, in
    /// order of first appearance.
    pub fn from_rows(rows: Vec<Vec<(String, Value)>>) -> Self {
        let mut table = Self::default();
        for row in rows {
            for (column, _) in &row {
                if !table.has_column(column) {
                    table.columns.push(column.clone());
                }
            }
            table.rows.push(row.into_iter().collect());
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at `row` and `column`. `None` if the row does not have the column
    /// at all, as opposed to `Some(Value::Null)` for an unresolved cell.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Every cell of a column, top to bottom.
    pub fn column<'a>(&'a self, column: &'a str) -> impl Iterator<Item = Option<&'a Value>> + 'a {
        self.rows.iter().map(move |r| r.get(column))
    }

    pub(crate) fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Set `column` of every row using `f`, appending the column if new.
    pub(crate) fn fill_column(&mut self, column: &str, mut f: impl FnMut(&Row) -> Value) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
        for row in self.rows.iter_mut() {
            let value = f(row);
            row.insert(column.to_string(), value);
        }
    }

    /// Stable sort of the rows by the string values of `column`.
    pub(crate) fn sort_by_str(&mut self, column: &str) {
        self.rows
            .sort_by(|a, b| cell_str(a.get(column)).cmp(cell_str(b.get(column))));
    }
}

fn cell_str(value: Option<&Value>) -> &str {
    value.and_then(Value::as_str).unwrap_or_default()
}

/// Tries to find the value of a parameter in a record.
pub type Resolver<C> = fn(&C, &str) -> Option<Value>;

/// An ordered list of [Resolver]s. The first one to find a non-null value wins.
pub struct FallbackChain<C> {
    resolvers: Vec<(&'static str, Resolver<C>)>,
}

impl<C> FallbackChain<C> {
    pub fn new() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }

    /// Append a resolver to the end of the chain.
    pub fn then(mut self, name: &'static str, resolver: Resolver<C>) -> Self {
        self.resolvers.push((name, resolver));
        self
    }

    /// Names of the resolvers, in the order they are tried.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resolvers.iter().map(|(name, _)| *name)
    }

    pub fn resolve(&self, context: &C, param: &str) -> Option<Value> {
        self.resolvers
            .iter()
            .find_map(|(_, resolver)| resolver(context, param).filter(|v| !v.is_null()))
    }

    /// Like [Self::resolve], but gives `Value::Null` when nothing resolves.
    pub fn resolve_or_null(&self, context: &C, param: &str) -> Value {
        self.resolve(context, param).unwrap_or(Value::Null)
    }
}

impl<C> Default for FallbackChain<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Which parameters become columns of a table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParamSelector {
    /// Every parameter of every record (`"*"`).
    All,
    /// Only the swept variables named in each record's `ListBoundVariables`
    /// (`"list_bound_only"`).
    #[default]
    ListBoundOnly,
    /// Exactly these parameters.
    Explicit(Vec<String>),
}

impl FromStr for ParamSelector {
    type Err = Infallible;

    /// `"*"` and `"list_bound_only"` are keywords, any other string names
    /// a single parameter.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "*" => Self::All,
            "list_bound_only" => Self::ListBoundOnly,
            param => Self::Explicit(vec![param.to_string()]),
        })
    }
}

impl From<&str> for ParamSelector {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(selector) => selector,
            Err(never) => match never {},
        }
    }
}

impl<S: Into<String>> From<Vec<S>> for ParamSelector {
    fn from(params: Vec<S>) -> Self {
        Self::Explicit(params.into_iter().map(Into::into).collect())
    }
}
