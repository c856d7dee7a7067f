//! Impulse-response synthesis from a sparse peak encoding.
//!
//! Each peak is placed at a fractional sample offset with an 81-tap
//! Hann-windowed sinc kernel; overlapping kernels add.

use std::f64::consts::PI;

use ndarray::Array2;

use tracing::warn;

use crate::spectral::hann_window;

/// Fractional-delay kernel length in taps.
pub const KERNEL_TAPS: usize = 81;
/// Taps on each side of the kernel centre.
pub const KERNEL_HALF_WIDTH: usize = (KERNEL_TAPS - 1) / 2;
/// Samples per unit of raw time.
pub const TIME_SCALE: f64 = 1024.0;
/// Samples dropped from the end of every reconstruction.
pub const TAIL_GUARD: usize = 3000;
/// Peaks placed beyond this sample index are ignored.
pub const MAX_PEAK_SAMPLES: f64 = (1u64 << 25) as f64;
const BUFFER_HEADROOM: f64 = 1.05;

/// Errors raised while building a peak encoding from an array.
#[derive(Debug, thiserror::Error)]
pub enum PeakShapeError {
    #[error("Peak array must have 2 columns (rows form) or 2 rows (columns form), got {0:?}")]
    Shape((usize, usize)),
}

/// One raw network output row: time in roughly `[-1, 1]`, amplitude as `-ln(a)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub time: f32,
    pub log_amplitude: f32,
}

impl Peak {
    pub fn time_samples(&self) -> f64 {
        (f64::from(self.time) + 1.0) * TIME_SCALE
    }

    pub fn amplitude(&self) -> f64 {
        (-f64::from(self.log_amplitude)).exp()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeakEncoding {
    peaks: Vec<Peak>,
}

impl PeakEncoding {
    pub fn new(peaks: Vec<Peak>) -> Self {
        Self { peaks }
    }

    /// `[n × 2]`, one `(time, log_amplitude)` row per peak.
    pub fn from_rows(values: &Array2<f32>) -> Result<Self, PeakShapeError> {
        if values.ncols() != 2 {
            return Err(PeakShapeError::Shape(values.dim()));
        }
        Ok(Self::new(
            values
                .rows()
                .into_iter()
                .map(|row| Peak {
                    time: row[0],
                    log_amplitude: row[1],
                })
                .collect(),
        ))
    }

    /// `[2 × n]`, the layout the autoencoder decodes to.
    pub fn from_columns(values: &Array2<f32>) -> Result<Self, PeakShapeError> {
        if values.nrows() != 2 {
            return Err(PeakShapeError::Shape(values.dim()));
        }
        Self::from_rows(&values.t().to_owned())
    }

    /// Accept either layout; a `[2 × 2]` array is read as rows.
    pub fn from_array(values: &Array2<f32>) -> Result<Self, PeakShapeError> {
        if values.ncols() == 2 {
            Self::from_rows(values)
        } else {
            Self::from_columns(values)
        }
    }

    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }
}

/// Hann-windowed sinc evaluated at a fractional offset in `[-0.5, 0.5]`.
pub fn fractional_delay(offset: f64) -> [f64; KERNEL_TAPS] {
    let window = hann_window(KERNEL_TAPS);
    let mut kernel = [0.0; KERNEL_TAPS];
    for (tap, (out, w)) in kernel.iter_mut().zip(window).enumerate() {
        let x = tap as f64 - KERNEL_HALF_WIDTH as f64 - offset;
        *out = f64::from(w) * sinc(x);
    }
    kernel
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else if x.fract() == 0.0 {
        0.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

/// Synthesize the impulse response described by `encoding`.
///
/// Leading zeros and the last [`TAIL_GUARD`] samples are removed. An empty or
/// degenerate encoding yields an empty waveform. Peaks past
/// [`MAX_PEAK_SAMPLES`] are dropped with a warning.
pub fn reconstruct(encoding: &PeakEncoding) -> Vec<f32> {
    let finite = encoding
        .peaks()
        .iter()
        .map(|peak| (peak.time_samples(), peak.amplitude()))
        .filter(|(time, amplitude)| time.is_finite() && amplitude.is_finite());
    let (placed, too_late): (Vec<(f64, f64)>, Vec<_>) =
        finite.partition(|(time, _)| *time <= MAX_PEAK_SAMPLES);
    if !too_late.is_empty() {
        warn!(
            "Ignoring {} peaks beyond {} samples",
            too_late.len(),
            MAX_PEAK_SAMPLES
        );
    }
    let Some(max_time) = placed.iter().map(|(time, _)| *time).reduce(f64::max) else {
        return Vec::new();
    };
    let len = (BUFFER_HEADROOM * max_time + KERNEL_TAPS as f64).ceil();
    if len <= 0.0 {
        return Vec::new();
    }
    let mut buffer = vec![0.0_f64; len as usize];

    for (time, amplitude) in placed {
        let centre = time.round();
        let kernel = fractional_delay(time - centre);
        let first = centre as i64 - KERNEL_HALF_WIDTH as i64;
        for (tap, value) in kernel.iter().enumerate() {
            let index = first + tap as i64;
            if index < 0 {
                continue;
            }
            if let Some(slot) = buffer.get_mut(index as usize) {
                *slot += amplitude * value;
            }
        }
    }

    let Some(start) = buffer.iter().position(|&v| v != 0.0) else {
        return Vec::new();
    };
    let end = buffer.len().saturating_sub(TAIL_GUARD);
    if start >= end {
        return Vec::new();
    }
    buffer[start..end].iter().map(|&v| v as f32).collect()
}
