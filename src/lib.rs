pub mod auth;
mod client;
pub mod config;
mod constants;
pub mod datetime;
pub mod errors;
pub mod images;
pub mod models;
pub mod runs;
pub mod table;
mod transport;
pub mod types;

pub use client::{BreadboardClient, BreadboardClientBuilder};
pub use config::{ConfigOverrides, Configuration};
pub use constants::keys;
pub use runs::{FetchStrategy, RunQuery, RunTableOptions};
pub use table::{FlatTable, ParamSelector};
pub use transport::{Transport, TransportBuilder};

// re-export
pub use reqwest;
