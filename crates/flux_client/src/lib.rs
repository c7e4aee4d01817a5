//! Client for the time-series query endpoint.
//!
//! Issues Flux queries over HTTP and decodes the delimited tabular
//! responses into typed rows. Grouping and pivoting of the parsed rows
//! is left to pure helpers so the parser stays shape-agnostic.

pub mod client;
pub mod parser;
pub mod query;

pub use client::FluxClient;
pub use parser::{flat_points, group_by, parse, pivot, ParseOptions};
pub use query::FluxQuery;
