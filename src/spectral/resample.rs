use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::SpectralError;

const SINC_LEN: usize = 256;

/// Band-limited sinc resampling of a mono signal.
///
/// The output is aligned with the input (resampler delay removed) and has
/// `round(len * dst_rate / src_rate)` samples.
pub fn resample(samples: &[f32], src_rate: u32, dst_rate: u32) -> Result<Vec<f32>, SpectralError> {
    if src_rate == 0 || dst_rate == 0 {
        return Err(SpectralError::InvalidParameter(format!(
            "sample rates must be positive, got {src_rate} -> {dst_rate}"
        )));
    }
    if samples.is_empty() || src_rate == dst_rate {
        return Ok(samples.to_vec());
    }
    let ratio = dst_rate as f64 / src_rate as f64;
    let expected = (samples.len() as f64 * ratio).round().max(1.0) as usize;

    let params = SincInterpolationParameters {
        sinc_len: SINC_LEN,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    // Zero tail so the delayed output still covers the whole input.
    let mut input = samples.to_vec();
    input.resize(samples.len() + 2 * SINC_LEN, 0.0);
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, input.len(), 1)
        .map_err(|err| SpectralError::Resample(err.to_string()))?;
    let delay = resampler.output_delay();
    let output = resampler
        .process(&[input], None)
        .map_err(|err| SpectralError::Resample(err.to_string()))?;
    let channel = output.into_iter().next().unwrap_or_default();
    let mut aligned: Vec<f32> = channel.into_iter().skip(delay).take(expected).collect();
    aligned.resize(expected, 0.0);
    Ok(aligned)
}
