use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use ndarray::{Array2, Array3, Axis};
use rand::rngs::StdRng;
use rand::{SeedableRng, seq::SliceRandom};

use super::{DatasetError, PairedDataset};

/// A stacked batch of `[batch × rows × cols]` sources and targets.
#[derive(Debug, Clone)]
pub struct PairBatch {
    pub source: Array3<f32>,
    pub target: Array3<f32>,
}

impl PairBatch {
    pub fn len(&self) -> usize {
        self.source.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn source_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 3> {
        array3_to_tensor(&self.source, device)
    }

    pub fn target_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 3> {
        array3_to_tensor(&self.target, device)
    }
}

/// Shuffles sample indices each epoch and collates them into batches.
#[derive(Debug)]
pub struct Batcher {
    batch_size: usize,
    rng: StdRng,
}

impl Batcher {
    pub fn new(batch_size: usize, seed: u64) -> Self {
        Self {
            batch_size: batch_size.max(1),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// A fresh shuffled ordering of `0..len`, grouped into batches. The last
    /// batch may be short.
    pub fn epoch_order(&mut self, len: usize) -> Vec<Vec<usize>> {
        let mut indices: Vec<usize> = (0..len).collect();
        indices.shuffle(&mut self.rng);
        indices
            .chunks(self.batch_size)
            .map(|chunk| chunk.to_vec())
            .collect()
    }

    /// Load `indices` from `dataset` and stack them.
    pub fn collate(dataset: &PairedDataset, indices: &[usize]) -> Result<PairBatch, DatasetError> {
        let mut sources = Vec::with_capacity(indices.len());
        let mut targets = Vec::with_capacity(indices.len());
        for &index in indices {
            let sample = dataset.get(index)?;
            sources.push(sample.source.into_values());
            targets.push(sample.target);
        }
        Ok(PairBatch {
            source: stack(&sources, indices)?,
            target: stack(&targets, indices)?,
        })
    }
}

fn stack(items: &[Array2<f32>], indices: &[usize]) -> Result<Array3<f32>, DatasetError> {
    let Some(first) = items.first() else {
        return Ok(Array3::zeros((0, 0, 0)));
    };
    let (rows, cols) = first.dim();
    let mut out = Array3::zeros((items.len(), rows, cols));
    for (slot, (item, &index)) in items.iter().zip(indices).enumerate() {
        if item.dim() != (rows, cols) {
            return Err(DatasetError::BatchShape {
                index,
                expected: (rows, cols),
                actual: item.dim(),
            });
        }
        out.index_axis_mut(Axis(0), slot).assign(item);
    }
    Ok(out)
}

fn array3_to_tensor<B: Backend>(values: &Array3<f32>, device: &B::Device) -> Tensor<B, 3> {
    let (batch, rows, cols) = values.dim();
    let data = TensorData::new(values.iter().copied().collect::<Vec<f32>>(), [batch, rows, cols]);
    Tensor::from_data(data, device)
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn epoch_order_covers_every_index_once() {
        let mut batcher = Batcher::new(3, 11);
        let batches = batcher.epoch_order(8);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].len(), 2);
        let mut seen: Vec<usize> = batches.into_iter().flatten().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn same_seed_gives_same_order() {
        let a = Batcher::new(4, 5).epoch_order(20);
        let b = Batcher::new(4, 5).epoch_order(20);
        assert_eq!(a, b);
    }

    #[test]
    fn stacking_rejects_mismatched_shapes() {
        let items = vec![array![[1.0_f32, 2.0]], array![[1.0_f32], [2.0]]];
        assert!(matches!(
            stack(&items, &[4, 9]),
            Err(DatasetError::BatchShape { index: 9, .. })
        ));
    }

    #[test]
    fn stacked_batch_converts_to_tensor() {
        let items = vec![array![[1.0_f32, 2.0]], array![[3.0_f32, 4.0]]];
        let source = stack(&items, &[0, 1]).unwrap();
        let batch = PairBatch {
            target: source.clone(),
            source,
        };
        let tensor = batch.source_tensor::<burn::backend::NdArray>(&Default::default());
        assert_eq!(tensor.dims(), [2, 1, 2]);
        assert_eq!(tensor.into_data().to_vec::<f32>().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }
}
