#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

pub mod client;
pub mod config;
pub mod contracts;
pub mod error;
pub mod query;

pub use client::{connect_data_source, RpcDataSource};
pub use config::{Config, QueryConfig};
pub use error::{EthereumError, Result};
pub use query::{Callback, QueryBuilder, QueryOptions, SendQuery, SendQueryArgs};
