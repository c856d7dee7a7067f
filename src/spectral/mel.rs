use ndarray::{Array1, Array2};

/// Triangular mel filterbank on the Slaney mel scale, area-normalized.
///
/// Weights are stored dense as `[n_mels × (n_fft / 2 + 1)]` so projection and
/// its transpose are plain matrix products.
#[derive(Debug, Clone)]
pub struct MelBank {
    weights: Array2<f32>,
}

impl MelBank {
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize, f_min: f32, f_max: f32) -> Self {
        let bins = n_fft / 2 + 1;
        let sr = sample_rate.max(1) as f64;
        let nyquist = sr * 0.5;
        let f_max = (f_max as f64).min(nyquist).max(f_min as f64);
        let f_min = (f_min as f64).clamp(0.0, f_max);
        let fft_freqs: Vec<f64> = (0..bins)
            .map(|bin| bin as f64 * nyquist / (bins - 1).max(1) as f64)
            .collect();
        let mel_freqs = mel_frequencies(n_mels + 2, f_min, f_max);

        let mut weights = Array2::<f32>::zeros((n_mels, bins));
        for m in 0..n_mels {
            let lower_width = mel_freqs[m + 1] - mel_freqs[m];
            let upper_width = mel_freqs[m + 2] - mel_freqs[m + 1];
            let norm = 2.0 / (mel_freqs[m + 2] - mel_freqs[m]);
            for (bin, &freq) in fft_freqs.iter().enumerate() {
                let lower = if lower_width > 0.0 {
                    (freq - mel_freqs[m]) / lower_width
                } else {
                    0.0
                };
                let upper = if upper_width > 0.0 {
                    (mel_freqs[m + 2] - freq) / upper_width
                } else {
                    0.0
                };
                let w = lower.min(upper).max(0.0);
                if w > 0.0 && norm.is_finite() {
                    weights[[m, bin]] = (w * norm) as f32;
                }
            }
        }
        Self { weights }
    }

    /// Filterbank with the conventional defaults: 128 bands spanning `0..=rate/2`.
    pub fn with_defaults(sample_rate: u32, n_fft: usize) -> Self {
        Self::new(
            sample_rate,
            n_fft,
            super::N_MELS,
            0.0,
            sample_rate as f32 * 0.5,
        )
    }

    pub fn n_mels(&self) -> usize {
        self.weights.nrows()
    }

    pub fn n_bins(&self) -> usize {
        self.weights.ncols()
    }

    pub fn weights(&self) -> &Array2<f32> {
        &self.weights
    }

    /// Project a `[bins × frames]` power spectrogram onto the mel bands.
    pub fn project(&self, power: &Array2<f32>) -> Array2<f32> {
        self.weights.dot(power)
    }

    /// Map `[n_mels × frames]` energies back to linear bins via the filterbank
    /// transpose. This is a lossy pseudo-inverse; values can dip below zero.
    pub fn project_back(&self, mel: &Array2<f32>) -> Array2<f32> {
        self.weights.t().dot(mel)
    }
}

fn mel_frequencies(count: usize, f_min: f64, f_max: f64) -> Array1<f64> {
    let mel_min = hz_to_mel(f_min);
    let mel_max = hz_to_mel(f_max);
    Array1::linspace(mel_min, mel_max, count).mapv(mel_to_hz)
}

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4_f64.ln() / 27.0
}

pub(crate) fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

pub(crate) fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}
