//! Shared types for the energy-monitor workspace.

pub mod config;
pub mod error;
pub mod types;

pub use error::Error;
pub use types::{
    ExtremesSample, PowerSample, RealtimeSample, TableRow, TimeSeriesPoint, Value,
};
