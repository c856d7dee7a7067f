use ndarray::Array2;

use super::{DatasetError, IndexTable, load_array};
use crate::features::{FeatureTensor, Normalizer};

/// One loaded and transformed (source, target) pair.
#[derive(Debug, Clone)]
pub struct PairedSample {
    /// Extractor input: `-ln(data)`, then normalized when stats are configured.
    pub source: FeatureTensor,
    /// Autoencoder input / reference: target scaled by its maximum.
    pub target: Array2<f32>,
}

/// Index-backed dataset that re-reads both arrays on every access.
#[derive(Debug, Clone)]
pub struct PairedDataset {
    index: IndexTable,
    normalizer: Option<Normalizer>,
}

impl PairedDataset {
    pub fn new(index: IndexTable, normalizer: Option<Normalizer>) -> Self {
        Self { index, normalizer }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<PairedSample, DatasetError> {
        let pair = self.index.get(index).ok_or(DatasetError::OutOfRange {
            index,
            len: self.index.len(),
        })?;
        let data = load_array(&pair.data_path).map_err(|source| DatasetError::Array {
            path: pair.data_path.clone(),
            source,
        })?;
        let target = load_array(&pair.target_path).map_err(|source| DatasetError::Array {
            path: pair.target_path.clone(),
            source,
        })?;

        let source = transform_source(data);
        let source = match &self.normalizer {
            Some(normalizer) => normalizer.normalize(&source)?,
            None => source,
        };
        Ok(PairedSample {
            source,
            target: transform_target(target),
        })
    }
}

/// `-ln(x)`; non-finite results (from `x <= 0`) become 0.
pub fn transform_source(data: Array2<f32>) -> FeatureTensor {
    FeatureTensor::new(data.mapv(|v| {
        let out = -v.ln();
        if out.is_finite() { out } else { 0.0 }
    }))
}

/// Scale by the maximum value; a zero or non-finite maximum leaves the target unscaled.
pub fn transform_target(target: Array2<f32>) -> Array2<f32> {
    let max = target.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max.is_finite() && max != 0.0 {
        target / max
    } else {
        target
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn source_transform_is_negative_log() {
        let out = transform_source(array![[1.0_f32, std::f32::consts::E], [0.0, -1.0]]);
        let values = out.values();
        assert!((values[[0, 0]] - 0.0).abs() < 1e-6);
        assert!((values[[0, 1]] + 1.0).abs() < 1e-6);
        assert_eq!(values[[1, 0]], 0.0);
        assert_eq!(values[[1, 1]], 0.0);
    }

    #[test]
    fn target_is_scaled_by_its_maximum() {
        let out = transform_target(array![[1.0_f32, 4.0], [2.0, -2.0]]);
        assert_eq!(out, array![[0.25, 1.0], [0.5, -0.5]]);
    }

    #[test]
    fn all_zero_target_is_left_untouched() {
        let out = transform_target(Array2::zeros((2, 2)));
        assert!(out.iter().all(|&v| v == 0.0));
    }
}
