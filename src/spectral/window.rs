use std::f32::consts::PI;

/// Symmetric Hann window (`0.5 - 0.5 cos(2πn / (N - 1))`), zero at both edges.
pub(crate) fn hann_window(length: usize) -> Vec<f32> {
    if length <= 1 {
        return vec![1.0_f32; length.max(1)];
    }
    let denom = (length - 1) as f32;
    (0..length)
        .map(|n| 0.5_f32 * (1.0 - (2.0 * PI * n as f32 / denom).cos()))
        .collect()
}

/// Periodic Hann window used for STFT analysis/synthesis.
///
/// Identical to the first `N` points of a symmetric window of length `N + 1`,
/// which gives constant overlap-add at 75% overlap.
pub(crate) fn periodic_hann_window(length: usize) -> Vec<f32> {
    if length <= 1 {
        return vec![1.0_f32; length.max(1)];
    }
    let denom = length as f32;
    (0..length)
        .map(|n| 0.5_f32 * (1.0 - (2.0 * PI * n as f32 / denom).cos()))
        .collect()
}
