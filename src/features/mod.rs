//! Feature tensors and their per-coefficient normalization.

mod normalize;

use ndarray::Array2;

pub use normalize::{NormalizeError, Normalizer, to_tensor};

/// A 2-D spectral feature array in **coefficient-major** layout.
///
/// Row `i` is coefficient (MFCC index or mel band) `i`; column `t` is frame
/// `t`. Every producer and consumer in the crate relies on this layout, so
/// time-major data must enter through [`FeatureTensor::from_frame_major`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTensor {
    values: Array2<f32>,
}

impl FeatureTensor {
    /// Wrap a `[n_coeff × frames]` array.
    pub fn new(values: Array2<f32>) -> Self {
        Self { values }
    }

    /// Wrap a `[frames × n_coeff]` array by transposing it.
    pub fn from_frame_major(values: Array2<f32>) -> Self {
        Self {
            values: values.reversed_axes().as_standard_layout().into_owned(),
        }
    }

    pub fn coefficients(&self) -> usize {
        self.values.nrows()
    }

    pub fn frames(&self) -> usize {
        self.values.ncols()
    }

    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    pub fn into_values(self) -> Array2<f32> {
        self.values
    }
}

impl From<Array2<f32>> for FeatureTensor {
    fn from(values: Array2<f32>) -> Self {
        Self::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_major_input_is_transposed() {
        let time_major = Array2::from_shape_vec((3, 2), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let tensor = FeatureTensor::from_frame_major(time_major);
        assert_eq!(tensor.coefficients(), 2);
        assert_eq!(tensor.frames(), 3);
        assert_eq!(tensor.values()[[0, 1]], 3.0);
        assert!(tensor.values().is_standard_layout());
    }
}
