//! Spectral feature codec: waveform to mel power / MFCC / phase and back.
//!
//! All arrays are frequency- or coefficient-major (`[rows × frames]`). The
//! inverse path goes through the transpose of the mel filterbank, which is a
//! lossy pseudo-inverse, so round trips are approximate by construction.

mod dct;
mod delta;
mod mel;
mod resample;
mod stft;
mod window;

use std::f32::consts::PI;

use ndarray::Array2;
use rand::Rng;
use rustfft::num_complex::Complex32;

use crate::features::FeatureTensor;

pub use dct::dct_basis;
pub use delta::{DELTA_WIDTH, delta, delta_features};
pub use mel::MelBank;
pub use resample::resample;
pub use stft::{frame_count, istft_length};
pub(crate) use window::hann_window;

/// FFT size used by the MFCC path.
pub const N_FFT: usize = 2048;
/// Hop between STFT frames used by the MFCC path.
pub const HOP_LENGTH: usize = 512;
/// Mel bands in the default filterbank.
pub const N_MELS: usize = 128;
/// Power floor applied before the decibel conversion.
pub const AMIN: f32 = 1e-10;
/// Dynamic range kept below the loudest bin, in dB.
pub const TOP_DB: f32 = 80.0;

/// Errors raised by the spectral codec.
#[derive(Debug, thiserror::Error)]
pub enum SpectralError {
    /// The waveform is shorter than one analysis frame.
    #[error("Signal of {len} samples is shorter than n_fft {n_fft}")]
    SignalTooShort { len: usize, n_fft: usize },
    /// Sample rate must be positive.
    #[error("Sample rate must be positive")]
    ZeroSampleRate,
    /// A size parameter is out of range.
    #[error("Invalid spectral parameter: {0}")]
    InvalidParameter(String),
    /// Delta features need at least one full regression window.
    #[error("Delta features need at least {width} frames, got {frames}")]
    TooFewFrames { frames: usize, width: usize },
    /// Two arrays that must line up do not.
    #[error("Shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// The resampler rejected its configuration or input.
    #[error("Resampling failed: {0}")]
    Resample(String),
}

/// Spectrogram plus the STFT phase it was derived from.
#[derive(Debug, Clone)]
pub struct SpectralFrame {
    /// Power (or mel power) spectrogram, `[bands × frames]`.
    pub power: Array2<f32>,
    /// STFT phase in radians, `[n_fft / 2 + 1 × frames]`.
    pub phase: Array2<f32>,
}

/// STFT power projected onto the mel filterbank, with the STFT phase.
pub fn forward(
    waveform: &[f32],
    rate: u32,
    n_fft: usize,
    hop_length: usize,
) -> Result<SpectralFrame, SpectralError> {
    if rate == 0 {
        return Err(SpectralError::ZeroSampleRate);
    }
    let spectrum = stft::stft(waveform, n_fft, hop_length)?;
    let power = spectrum.mapv(|c| c.norm_sqr());
    let phase = spectrum.mapv(|c| c.arg());
    let bank = MelBank::with_defaults(rate, n_fft);
    Ok(SpectralFrame {
        power: bank.project(&power),
        phase,
    })
}

/// Log-mel spectrogram in dB with the STFT phase.
pub fn to_log_mel(waveform: &[f32], rate: u32) -> Result<(Array2<f32>, FeatureTensor), SpectralError> {
    let frame = forward(waveform, rate, N_FFT, HOP_LENGTH)?;
    Ok((frame.phase, FeatureTensor::new(power_to_db(&frame.power))))
}

/// First `n_mfcc` orthonormal DCT-II coefficients of the log-mel spectrogram.
pub fn to_mfcc(
    waveform: &[f32],
    rate: u32,
    n_mfcc: usize,
) -> Result<(Array2<f32>, FeatureTensor), SpectralError> {
    if n_mfcc == 0 || n_mfcc > N_MELS {
        return Err(SpectralError::InvalidParameter(format!(
            "n_mfcc must be within 1..={N_MELS}, got {n_mfcc}"
        )));
    }
    let (phase, log_mel) = to_log_mel(waveform, rate)?;
    let basis = dct_basis(n_mfcc, N_MELS);
    Ok((phase, FeatureTensor::new(basis.dot(log_mel.values()))))
}

/// Synthesize a waveform from MFCCs, drawing random phase when none is given.
pub fn inverse(
    mfcc: &FeatureTensor,
    rate: u32,
    phase: Option<&Array2<f32>>,
) -> Result<Vec<f32>, SpectralError> {
    inverse_with_rng(mfcc, rate, phase, &mut rand::rng())
}

/// [`inverse`] with an explicit RNG for the fallback phase.
pub fn inverse_with_rng<R: Rng>(
    mfcc: &FeatureTensor,
    rate: u32,
    phase: Option<&Array2<f32>>,
    rng: &mut R,
) -> Result<Vec<f32>, SpectralError> {
    let n_mfcc = mfcc.coefficients();
    if n_mfcc == 0 || n_mfcc > N_MELS {
        return Err(SpectralError::InvalidParameter(format!(
            "MFCC input must have 1..={N_MELS} coefficients, got {n_mfcc}"
        )));
    }
    let basis = dct_basis(n_mfcc, N_MELS);
    let log_mel = FeatureTensor::new(basis.t().dot(mfcc.values()));
    inverse_log_mel_with_rng(&log_mel, rate, phase, rng)
}

/// Synthesize a waveform from a `[N_MELS × frames]` log-mel (dB) spectrogram.
pub fn inverse_log_mel(
    log_mel: &FeatureTensor,
    rate: u32,
    phase: Option<&Array2<f32>>,
) -> Result<Vec<f32>, SpectralError> {
    inverse_log_mel_with_rng(log_mel, rate, phase, &mut rand::rng())
}

fn inverse_log_mel_with_rng<R: Rng>(
    log_mel: &FeatureTensor,
    rate: u32,
    phase: Option<&Array2<f32>>,
    rng: &mut R,
) -> Result<Vec<f32>, SpectralError> {
    if rate == 0 {
        return Err(SpectralError::ZeroSampleRate);
    }
    let bank = MelBank::with_defaults(rate, N_FFT);
    if log_mel.coefficients() != bank.n_mels() {
        return Err(SpectralError::ShapeMismatch {
            what: "log-mel bands",
            expected: (bank.n_mels(), log_mel.frames()),
            actual: log_mel.values().dim(),
        });
    }
    let mel_power = log_mel.values().mapv(db_to_power);
    let amplitude = bank.project_back(&mel_power).mapv(power_to_amplitude);
    let dim = amplitude.dim();
    let spectrum = match phase {
        Some(phase) => {
            if phase.dim() != dim {
                return Err(SpectralError::ShapeMismatch {
                    what: "phase",
                    expected: dim,
                    actual: phase.dim(),
                });
            }
            Array2::from_shape_fn(dim, |idx| Complex32::from_polar(amplitude[idx], phase[idx]))
        }
        None => Array2::from_shape_fn(dim, |idx| {
            Complex32::from_polar(amplitude[idx], rng.random_range(-PI..PI))
        }),
    };
    stft::istft(&spectrum, HOP_LENGTH)
}

/// `10 log10(max(power, AMIN))`, floored at `TOP_DB` below the maximum.
pub fn power_to_db(power: &Array2<f32>) -> Array2<f32> {
    let db = power.mapv(|p| {
        let p = if p.is_finite() { p.max(AMIN) } else { AMIN };
        10.0 * p.log10()
    });
    let peak = db.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !peak.is_finite() {
        return db;
    }
    let floor = peak - TOP_DB;
    db.mapv(|v| v.max(floor))
}

fn db_to_power(db: f32) -> f32 {
    let power = 10.0_f32.powf(db / 10.0);
    if power.is_finite() { power } else { 0.0 }
}

fn power_to_amplitude(power: f32) -> f32 {
    if power.is_finite() {
        power.max(0.0).sqrt()
    } else {
        0.0
    }
}
