use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModisError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid granule name {0}")]
    GranuleName(PathBuf),

    #[error("invalid granule file len {0} for {1}")]
    GranuleLen(u64, PathBuf),

    #[error("raster dimensions mismatch, expected {expected:?} got {actual:?}")]
    Dimensions {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("raster dimensions {0:?} overflow")]
    TooLarge((usize, usize)),

    #[error("expected {expected} samples, got {actual}")]
    SampleCount { expected: usize, actual: usize },
}
