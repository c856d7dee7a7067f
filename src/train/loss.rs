use burn::prelude::*;

/// Scale applied to the Chamfer distance.
pub const CHAMFER_SCALE: f32 = 10.0;

/// Latent regression objectives selectable by name in the config.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LatentLoss {
    Mse,
    L1,
    SmoothL1,
}

impl LatentLoss {
    pub const ALL: [LatentLoss; 3] = [LatentLoss::Mse, LatentLoss::L1, LatentLoss::SmoothL1];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|loss| loss.name() == name.trim())
    }

    pub fn name(self) -> &'static str {
        match self {
            LatentLoss::Mse => "mse_loss",
            LatentLoss::L1 => "l1_loss",
            LatentLoss::SmoothL1 => "smooth_l1_loss",
        }
    }

    pub fn compute<B: Backend, const D: usize>(
        self,
        prediction: Tensor<B, D>,
        target: Tensor<B, D>,
        weight: f32,
    ) -> Tensor<B, 1> {
        match self {
            LatentLoss::Mse => weighted_mse(prediction, target, weight),
            LatentLoss::L1 => weighted_l1(prediction, target, weight),
            LatentLoss::SmoothL1 => weighted_smooth_l1(prediction, target, weight),
        }
    }
}

/// `sum(weight * (a - b)^2) / numel`.
pub fn weighted_mse<B: Backend, const D: usize>(
    a: Tensor<B, D>,
    b: Tensor<B, D>,
    weight: f32,
) -> Tensor<B, 1> {
    let diff = a - b;
    (diff.clone() * diff).mul_scalar(weight).mean()
}

/// `sum(weight * |a - b|) / numel`.
pub fn weighted_l1<B: Backend, const D: usize>(
    a: Tensor<B, D>,
    b: Tensor<B, D>,
    weight: f32,
) -> Tensor<B, 1> {
    (a - b).abs().mul_scalar(weight).mean()
}

/// Weighted Huber loss with a threshold of 1.
pub fn weighted_smooth_l1<B: Backend, const D: usize>(
    a: Tensor<B, D>,
    b: Tensor<B, D>,
    weight: f32,
) -> Tensor<B, 1> {
    let abs = (a - b).abs();
    let quadratic = abs.clone().clamp_max(1.0);
    let linear = abs - quadratic.clone();
    ((quadratic.clone() * quadratic).mul_scalar(0.5) + linear)
        .mul_scalar(weight)
        .mean()
}

/// Symmetric nearest-neighbour distance between two point sets.
///
/// Inputs are `[batch × D × N]`: `N` points of dimension `D` per batch
/// element. Returns `10 * (mean_j min_i P + mean_i min_j P)` where `P[i, j]`
/// is the squared distance between output point `i` and target point `j`,
/// averaged over the batch.
pub fn chamfer<B: Backend>(output: Tensor<B, 3>, target: Tensor<B, 3>) -> Tensor<B, 1> {
    let x = output.swap_dims(1, 2);
    let y = target.swap_dims(1, 2);
    let rx = (x.clone() * x.clone()).sum_dim(2);
    let ry = (y.clone() * y.clone()).sum_dim(2).swap_dims(1, 2);
    let zz = x.matmul(y.swap_dims(1, 2));
    let distances = (rx + ry - zz.mul_scalar(2.0)).clamp_min(0.0);
    let to_output = distances.clone().min_dim(1).mean();
    let to_target = distances.min_dim(2).mean();
    (to_output + to_target).mul_scalar(CHAMFER_SCALE)
}

/// Mean after removing the single largest value. Sequences of one or fewer
/// values fall back to the plain mean (0 for an empty one).
pub fn mean_without_worst(values: &[f32]) -> f32 {
    if values.len() <= 1 {
        return values.first().copied().unwrap_or(0.0);
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted.pop();
    sorted.iter().sum::<f32>() / sorted.len() as f32
}
