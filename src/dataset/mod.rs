//! Paired (data, target) samples resolved from a CSV index, loaded from
//! `.npy` files and batched for training.

mod arrays;
mod batch;
mod index;
mod paired;

use std::path::PathBuf;

use crate::features::NormalizeError;

pub use arrays::{ArrayError, load_array, save_array};
pub use batch::{Batcher, PairBatch};
pub use index::{IndexTable, SamplePair};
pub use paired::{PairedDataset, PairedSample, transform_source, transform_target};

/// Errors raised while resolving, loading or batching samples.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Failed to read index {path}: {source}")]
    ReadIndex {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed index row at {path}:{line}")]
    IndexRow { path: PathBuf, line: usize },
    #[error("Failed to load array {path}: {source}")]
    Array { path: PathBuf, source: ArrayError },
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error("Sample {index} has shape {actual:?}, batch expects {expected:?}")]
    BatchShape {
        index: usize,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("Sample index {index} out of range for {len} samples")]
    OutOfRange { index: usize, len: usize },
}
