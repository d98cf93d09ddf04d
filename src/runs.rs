//! Run queries, run tables, and edits of a run's parameters.

mod by_ids;
mod mutate;
mod query;
mod table;

pub use by_ids::*;
pub use mutate::*;
pub use query::*;
pub use table::*;
