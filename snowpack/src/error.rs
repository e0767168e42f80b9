use chrono::NaiveDate;
use modis::ModisError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnowpackError {
    #[error("invalid range, end {end} is not after start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("no granules in {0}")]
    NoGranules(PathBuf),

    #[error("{0}")]
    Modis(#[from] ModisError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("granule source failed: {0}")]
    Source(String),

    #[error("cannot reduce an empty collection")]
    EmptyCollection,
}
