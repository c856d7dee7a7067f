use rustfft::FftPlanner;
use rustfft::num_complex::Complex32;

use super::AudioError;

/// Scale so the largest magnitude is 1. Silent or non-finite input is returned unchanged.
pub fn normalize_peak(samples: &[f32]) -> Vec<f32> {
    let peak = samples.iter().fold(0.0_f32, |acc, v| acc.max(v.abs()));
    if !peak.is_finite() || peak <= 0.0 {
        return samples.to_vec();
    }
    samples.iter().map(|v| v / peak).collect()
}

/// Smallest power of two `>= n`; 0 maps to 1.
pub fn next_power_of_two(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// Right-pad with `value` up to `len` samples.
pub fn pad_to(samples: &[f32], len: usize, value: f32) -> Result<Vec<f32>, AudioError> {
    if samples.len() > len {
        return Err(AudioError::PadTooShort {
            len: samples.len(),
            target: len,
        });
    }
    let mut out = Vec::with_capacity(len);
    out.extend_from_slice(samples);
    out.resize(len, value);
    Ok(out)
}

/// Full linear convolution via FFT, `x.len() + h.len() - 1` samples long.
pub fn convolve(x: &[f32], h: &[f32]) -> Vec<f32> {
    if x.is_empty() || h.is_empty() {
        return Vec::new();
    }
    let out_len = x.len() + h.len() - 1;
    let fft_len = next_power_of_two(out_len);
    let mut planner = FftPlanner::<f32>::new();
    let forward = planner.plan_fft_forward(fft_len);
    let backward = planner.plan_fft_inverse(fft_len);

    let mut a = to_complex(x, fft_len);
    let mut b = to_complex(h, fft_len);
    forward.process(&mut a);
    forward.process(&mut b);
    for (lhs, rhs) in a.iter_mut().zip(&b) {
        *lhs *= *rhs;
    }
    backward.process(&mut a);

    let scale = 1.0 / fft_len as f32;
    a.iter().take(out_len).map(|c| c.re * scale).collect()
}

fn to_complex(samples: &[f32], len: usize) -> Vec<Complex32> {
    let mut buffer = vec![Complex32::new(0.0, 0.0); len];
    for (slot, &value) in buffer.iter_mut().zip(samples) {
        slot.re = value;
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_peak_scales_to_unit_magnitude() {
        let out = normalize_peak(&[0.5, -2.0, 1.0]);
        assert_eq!(out, vec![0.25, -1.0, 0.5]);
        assert_eq!(normalize_peak(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn next_power_of_two_handles_edges() {
        assert_eq!(next_power_of_two(0), 1);
        assert_eq!(next_power_of_two(1), 1);
        assert_eq!(next_power_of_two(5), 8);
        assert_eq!(next_power_of_two(1024), 1024);
    }

    #[test]
    fn pad_to_extends_with_value() {
        assert_eq!(pad_to(&[1.0, 2.0], 4, -1.0).unwrap(), vec![1.0, 2.0, -1.0, -1.0]);
        assert!(pad_to(&[1.0, 2.0, 3.0], 2, 0.0).is_err());
    }

    #[test]
    fn convolve_matches_direct_sum() {
        let x = [1.0_f32, 2.0, 3.0];
        let h = [0.0_f32, 1.0, 0.5];
        let out = convolve(&x, &h);
        let expected = [0.0_f32, 1.0, 2.5, 4.0, 1.5];
        assert_eq!(out.len(), expected.len());
        for (a, b) in out.iter().zip(expected) {
            assert!((a - b).abs() < 1e-5);
        }
    }
}
