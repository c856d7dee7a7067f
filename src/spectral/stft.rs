use ndarray::Array2;
use rustfft::FftPlanner;
use rustfft::num_complex::Complex32;

use super::SpectralError;
use super::window::periodic_hann_window;

/// Number of frames produced by a centred STFT over `len` samples.
pub fn frame_count(len: usize, n_fft: usize, hop: usize) -> usize {
    let pad = n_fft / 2;
    let padded = len + 2 * pad;
    if padded < n_fft || hop == 0 {
        return 0;
    }
    1 + (padded - n_fft) / hop
}

/// Number of samples produced by [`istft`] for `frames` frames.
pub fn istft_length(frames: usize, hop: usize) -> usize {
    hop * frames.saturating_sub(1)
}

/// Centred short-time Fourier transform, `[n_fft / 2 + 1 × frames]`.
///
/// The signal is reflect-padded by `n_fft / 2` on both sides so frame `t` is
/// centred on sample `t * hop`.
pub(crate) fn stft(
    samples: &[f32],
    n_fft: usize,
    hop: usize,
) -> Result<Array2<Complex32>, SpectralError> {
    validate_frame(n_fft, hop)?;
    if samples.len() < n_fft {
        return Err(SpectralError::SignalTooShort {
            len: samples.len(),
            n_fft,
        });
    }
    let padded = reflect_pad(samples, n_fft / 2);
    let frames = 1 + (padded.len() - n_fft) / hop;
    let bins = n_fft / 2 + 1;
    let window = periodic_hann_window(n_fft);
    let fft = FftPlanner::<f32>::new().plan_fft_forward(n_fft);
    let mut buffer = vec![Complex32::default(); n_fft];
    let mut out = Array2::from_elem((bins, frames), Complex32::default());
    for frame in 0..frames {
        let start = frame * hop;
        for (i, cell) in buffer.iter_mut().enumerate() {
            *cell = Complex32::new(sanitize(padded[start + i]) * window[i], 0.0);
        }
        fft.process(&mut buffer);
        for bin in 0..bins {
            out[[bin, frame]] = buffer[bin];
        }
    }
    Ok(out)
}

/// Inverse of [`stft`]: windowed overlap-add normalized by the summed squared
/// window, with the centre padding removed.
pub(crate) fn istft(spectrum: &Array2<Complex32>, hop: usize) -> Result<Vec<f32>, SpectralError> {
    let (bins, frames) = spectrum.dim();
    if bins < 2 {
        return Err(SpectralError::InvalidParameter(format!(
            "inverse STFT needs at least 2 frequency bins, got {bins}"
        )));
    }
    let n_fft = 2 * (bins - 1);
    validate_frame(n_fft, hop)?;
    if frames == 0 {
        return Ok(Vec::new());
    }
    let window = periodic_hann_window(n_fft);
    let ifft = FftPlanner::<f32>::new().plan_fft_inverse(n_fft);
    let total = n_fft + hop * (frames - 1);
    let mut signal = vec![0.0_f32; total];
    let mut window_sum = vec![0.0_f32; total];
    let mut buffer = vec![Complex32::default(); n_fft];
    let scale = 1.0 / n_fft as f32;
    for frame in 0..frames {
        fill_hermitian(&mut buffer, spectrum, frame);
        ifft.process(&mut buffer);
        let start = frame * hop;
        for i in 0..n_fft {
            signal[start + i] += buffer[i].re * scale * window[i];
            window_sum[start + i] += window[i] * window[i];
        }
    }
    for (sample, &norm) in signal.iter_mut().zip(window_sum.iter()) {
        if norm > f32::MIN_POSITIVE {
            *sample /= norm;
        }
    }
    let pad = n_fft / 2;
    Ok(signal[pad..total - pad].to_vec())
}

fn fill_hermitian(buffer: &mut [Complex32], spectrum: &Array2<Complex32>, frame: usize) {
    let n_fft = buffer.len();
    let last = spectrum.dim().0 - 1;
    buffer[0] = Complex32::new(sanitize(spectrum[[0, frame]].re), 0.0);
    for bin in 1..last {
        let value = sanitize_complex(spectrum[[bin, frame]]);
        buffer[bin] = value;
        buffer[n_fft - bin] = value.conj();
    }
    buffer[last] = Complex32::new(sanitize(spectrum[[last, frame]].re), 0.0);
}

fn reflect_pad(samples: &[f32], pad: usize) -> Vec<f32> {
    let n = samples.len();
    let mut out = Vec::with_capacity(n + 2 * pad);
    for i in 0..pad {
        out.push(samples[(pad - i).min(n - 1)]);
    }
    out.extend_from_slice(samples);
    for i in 0..pad {
        out.push(samples[n.saturating_sub(2 + i)]);
    }
    out
}

fn validate_frame(n_fft: usize, hop: usize) -> Result<(), SpectralError> {
    if n_fft < 2 {
        return Err(SpectralError::InvalidParameter(format!(
            "n_fft must be at least 2, got {n_fft}"
        )));
    }
    if hop == 0 {
        return Err(SpectralError::InvalidParameter(
            "hop length must be positive".to_string(),
        ));
    }
    Ok(())
}

fn sanitize(sample: f32) -> f32 {
    if sample.is_finite() { sample } else { 0.0 }
}

fn sanitize_complex(value: Complex32) -> Complex32 {
    if value.re.is_finite() && value.im.is_finite() {
        value
    } else {
        Complex32::default()
    }
}
