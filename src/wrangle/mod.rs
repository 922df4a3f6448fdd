//! Wrangle module - Offline preparation of the dashboard input files

mod events;
mod rainfall;

use crate::data::LoaderError;
use polars::prelude::PolarsError;
use thiserror::Error;

pub use events::{prepare_events, PreparedEventsSummary};
pub use rainfall::{merge_rainfall, MergedRainfallSummary};

#[derive(Error, Debug)]
pub enum WrangleError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Raw flood export is missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("No rainfall files given")]
    NoInputs,
}
