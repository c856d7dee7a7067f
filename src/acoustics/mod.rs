//! Audio helpers around the codec: WAV I/O, normalization, convolution and
//! onset-based segmentation of long recordings.

mod segment;
mod signal;
mod wav;

use std::path::PathBuf;

use crate::spectral::SpectralError;

pub use segment::{PeakPickParams, SplitOptions, onset_envelope, onset_frames, peak_pick, split_signal};
pub use signal::{convolve, next_power_of_two, normalize_peak, pad_to};
pub use wav::{WavAudio, read_wav, save_wav};

/// Errors raised by the audio helpers.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("Failed to read WAV {path}: {source}")]
    Read {
        path: PathBuf,
        source: hound::Error,
    },
    #[error("Failed to write WAV {path}: {source}")]
    Write {
        path: PathBuf,
        source: hound::Error,
    },
    #[error("WAV {path} has zero channels or sample rate")]
    InvalidFormat { path: PathBuf },
    #[error("Cannot pad {len} samples down to {target}")]
    PadTooShort { len: usize, target: usize },
    #[error(transparent)]
    Spectral(#[from] SpectralError),
}
