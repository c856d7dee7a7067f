use std::path::{Path, PathBuf};

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use ndarray::Array2;

use super::FeatureTensor;
use crate::dataset::{ArrayError, load_array};

/// Errors raised while building or applying a [`Normalizer`].
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// A statistics file could not be read.
    #[error("Failed to load normalization stats from {path}: {source}")]
    Load {
        path: PathBuf,
        source: ArrayError,
    },
    /// Mean and std arrays disagree in shape.
    #[error("Mean shape {mean:?} does not match std shape {std:?}")]
    StatsShape {
        mean: (usize, usize),
        std: (usize, usize),
    },
    /// The sample cannot be broadcast against the stored statistics.
    #[error("Sample shape {sample:?} is incompatible with stats shape {stats:?}")]
    SampleShape {
        sample: (usize, usize),
        stats: (usize, usize),
    },
}

/// Per-coefficient standardization with stats computed offline.
///
/// Stats are `[n_coeff × 1]` (one value per coefficient, broadcast over
/// frames) or `[n_coeff × frames]` (elementwise). 1-D stat files load as a
/// single column.
#[derive(Debug, Clone)]
pub struct Normalizer {
    mean: Array2<f32>,
    std: Array2<f32>,
}

impl Normalizer {
    pub fn new(mean: Array2<f32>, std: Array2<f32>) -> Result<Self, NormalizeError> {
        if mean.dim() != std.dim() {
            return Err(NormalizeError::StatsShape {
                mean: mean.dim(),
                std: std.dim(),
            });
        }
        Ok(Self { mean, std })
    }

    /// Load `mean_file` and `std_file` from `dir`.
    pub fn from_files(dir: &Path, mean_file: &str, std_file: &str) -> Result<Self, NormalizeError> {
        let mean_path = dir.join(mean_file);
        let std_path = dir.join(std_file);
        let mean = load_array(&mean_path).map_err(|source| NormalizeError::Load {
            path: mean_path.clone(),
            source,
        })?;
        let std = load_array(&std_path).map_err(|source| NormalizeError::Load {
            path: std_path.clone(),
            source,
        })?;
        Self::new(mean, std)
    }

    pub fn coefficients(&self) -> usize {
        self.mean.nrows()
    }

    /// `(sample - mean) / std`, with every non-finite result replaced by 0.
    pub fn normalize(&self, sample: &FeatureTensor) -> Result<FeatureTensor, NormalizeError> {
        let values = sample.values();
        let stats = self.mean.dim();
        let rows_match = values.nrows() == stats.0;
        let cols_match = stats.1 == 1 || values.ncols() == stats.1;
        if !rows_match || !cols_match {
            return Err(NormalizeError::SampleShape {
                sample: values.dim(),
                stats,
            });
        }
        let normalized = (values - &self.mean) / &self.std;
        Ok(FeatureTensor::new(
            normalized.mapv(|v| if v.is_finite() { v } else { 0.0 }),
        ))
    }
}

/// Convert a feature array to a `[n_coeff × frames]` float tensor, unchanged.
pub fn to_tensor<B: Backend>(sample: &FeatureTensor, device: &B::Device) -> Tensor<B, 2> {
    let values = sample.values();
    let data = TensorData::new(values.iter().copied().collect::<Vec<f32>>(), [
        values.nrows(),
        values.ncols(),
    ]);
    Tensor::from_data(data, device)
}
