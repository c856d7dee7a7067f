use ndarray::Array2;

use super::SpectralError;

/// Regression window width, in frames.
pub const DELTA_WIDTH: usize = 9;

/// Savitzky–Golay derivative along the time axis (columns) of a
/// `[n_coeff × frames]` array.
///
/// `order` 1 fits a line over the window, `order` 2 a parabola. Edge frames
/// take the derivative of the fit over the first/last full window; both fits
/// have constant derivative of the requested order, so edges repeat the
/// nearest fully-windowed value.
pub fn delta(data: &Array2<f32>, order: usize) -> Result<Array2<f32>, SpectralError> {
    let frames = data.ncols();
    if frames < DELTA_WIDTH {
        return Err(SpectralError::TooFewFrames {
            frames,
            width: DELTA_WIDTH,
        });
    }
    let coeffs = match order {
        1 => first_order_coefficients(),
        2 => second_order_coefficients(),
        other => {
            return Err(SpectralError::InvalidParameter(format!(
                "delta order must be 1 or 2, got {other}"
            )));
        }
    };
    let half = DELTA_WIDTH / 2;
    let mut out = Array2::<f32>::zeros(data.dim());
    for (row_in, mut row_out) in data.rows().into_iter().zip(out.rows_mut()) {
        for t in half..frames - half {
            let mut sum = 0.0_f64;
            for (k, &c) in coeffs.iter().enumerate() {
                sum += c * row_in[t + k - half] as f64;
            }
            row_out[t] = sum as f32;
        }
        let head = row_out[half];
        let tail = row_out[frames - half - 1];
        for t in 0..half {
            row_out[t] = head;
            row_out[frames - 1 - t] = tail;
        }
    }
    Ok(out)
}

/// First- and second-order deltas for each tensor in `data`.
pub fn delta_features(
    data: &[Array2<f32>],
) -> Result<(Vec<Array2<f32>>, Vec<Array2<f32>>), SpectralError> {
    let mut first = Vec::with_capacity(data.len());
    let mut second = Vec::with_capacity(data.len());
    for item in data {
        first.push(delta(item, 1)?);
        second.push(delta(item, 2)?);
    }
    Ok((first, second))
}

fn offsets() -> impl Iterator<Item = f64> {
    let half = (DELTA_WIDTH / 2) as i64;
    (-half..=half).map(|n| n as f64)
}

fn first_order_coefficients() -> Vec<f64> {
    let denom: f64 = offsets().map(|n| n * n).sum();
    offsets().map(|n| n / denom).collect()
}

fn second_order_coefficients() -> Vec<f64> {
    let mean_sq: f64 = offsets().map(|n| n * n).sum::<f64>() / DELTA_WIDTH as f64;
    let denom: f64 = offsets().map(|n| (n * n - mean_sq).powi(2)).sum();
    offsets().map(|n| 2.0 * (n * n - mean_sq) / denom).collect()
}
