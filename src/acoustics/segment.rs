use crate::spectral::{self, N_FFT, power_to_db};

use super::AudioError;

/// Samples subtracted from each onset position to catch the attack.
const ONSET_PREROLL: usize = 256;
/// Length of the energy windows checked before a segment's start and end.
const ENERGY_WINDOW: usize = 1000;

/// Parameters of [`split_signal`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitOptions {
    pub rate: u32,
    pub segment_length: usize,
    pub min_energy: f32,
    pub max_energy: f32,
    pub hop_length: usize,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            rate: 44_100,
            segment_length: 44_100 / 4,
            min_energy: 100.0,
            max_energy: 2.0,
            hop_length: 512,
        }
    }
}

/// Peak-picking windows, in frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakPickParams {
    pub pre_max: usize,
    pub post_max: usize,
    pub pre_avg: usize,
    pub post_avg: usize,
    pub delta: f32,
    pub wait: usize,
}

impl PeakPickParams {
    /// Windows of 30 ms (max), 100 ms (average) and a 30 ms refractory wait.
    pub fn for_rate(rate: u32, hop_length: usize) -> Self {
        let frames = |seconds: f32| (seconds * rate as f32) as usize / hop_length.max(1);
        Self {
            pre_max: frames(0.03),
            post_max: frames(0.0) + 1,
            pre_avg: frames(0.10),
            post_avg: frames(0.10) + 1,
            delta: 0.07,
            wait: frames(0.03),
        }
    }
}

/// Spectral-flux onset strength: mean positive first difference of the
/// log-mel spectrogram, one value per STFT frame.
pub fn onset_envelope(signal: &[f32], rate: u32, hop_length: usize) -> Result<Vec<f32>, AudioError> {
    let frame = spectral::forward(signal, rate, N_FFT, hop_length)?;
    let db = power_to_db(&frame.power);
    let (bands, frames) = db.dim();
    // Centred frames lag the signal by n_fft / 2 samples plus the difference lag.
    let pad = 1 + N_FFT / (2 * hop_length.max(1));
    let mut envelope = vec![0.0_f32; frames];
    for t in 1..frames {
        let flux: f32 = (0..bands)
            .map(|b| (db[[b, t]] - db[[b, t - 1]]).max(0.0))
            .sum();
        let slot = t - 1 + pad;
        if slot < frames {
            envelope[slot] = flux / bands as f32;
        }
    }
    Ok(envelope)
}

/// Indices of local maxima that clear the local average by `delta`, at
/// least `wait` frames apart.
pub fn peak_pick(envelope: &[f32], params: &PeakPickParams) -> Vec<usize> {
    let mut peaks = Vec::new();
    let mut last: Option<usize> = None;
    for (n, &value) in envelope.iter().enumerate() {
        let max_lo = n.saturating_sub(params.pre_max);
        let max_hi = (n + params.post_max).min(envelope.len());
        let local_max = envelope[max_lo..max_hi]
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        if value < local_max {
            continue;
        }
        let avg_lo = n.saturating_sub(params.pre_avg);
        let avg_hi = (n + params.post_avg).min(envelope.len());
        let window = &envelope[avg_lo..avg_hi];
        let local_avg = window.iter().sum::<f32>() / window.len() as f32;
        if value < local_avg + params.delta {
            continue;
        }
        if last.is_some_and(|prev| n - prev <= params.wait) {
            continue;
        }
        peaks.push(n);
        last = Some(n);
    }
    peaks
}

/// Onset frame indices of `signal`, from its min-max normalized envelope.
pub fn onset_frames(signal: &[f32], rate: u32, hop_length: usize) -> Result<Vec<usize>, AudioError> {
    let mut envelope = onset_envelope(signal, rate, hop_length)?;
    let min = envelope.iter().copied().fold(f32::INFINITY, f32::min);
    let max = envelope.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if !range.is_finite() || range <= 0.0 {
        return Ok(Vec::new());
    }
    for value in &mut envelope {
        *value = (*value - min) / range;
    }
    Ok(peak_pick(&envelope, &PeakPickParams::for_rate(rate, hop_length)))
}

/// Cut a long recording into isolated events of `segment_length` samples.
///
/// A segment starts `ONSET_PREROLL` samples before each detected onset and is
/// kept when the recording is quiet just before its start and just before its
/// end (`max_energy`) and the segment itself is loud enough (`min_energy`).
/// The final `segment_length` samples are excluded from onset detection.
pub fn split_signal(signal: &[f32], options: &SplitOptions) -> Result<Vec<Vec<f32>>, AudioError> {
    let searchable = signal.len().saturating_sub(options.segment_length);
    if searchable < N_FFT {
        return Ok(Vec::new());
    }
    let onsets = onset_frames(&signal[..searchable], options.rate, options.hop_length)?;
    let mut segments = Vec::new();
    for onset in onsets {
        let start = (onset * options.hop_length).saturating_sub(ONSET_PREROLL);
        let stop = start + options.segment_length;
        if stop > signal.len() {
            continue;
        }
        let before = energy_before(signal, start);
        let after = energy_before(signal, stop);
        let energy = abs_energy(signal, start, stop);
        if before < options.max_energy && after < options.max_energy && energy > options.min_energy {
            segments.push(signal[start..stop].to_vec());
        }
    }
    Ok(segments)
}

/// Energy of the `ENERGY_WINDOW` samples ending at `end`. A window that would
/// begin before sample 0 is empty.
fn energy_before(signal: &[f32], end: usize) -> f32 {
    match end.checked_sub(ENERGY_WINDOW) {
        Some(start) => abs_energy(signal, start, end),
        None => 0.0,
    }
}

fn abs_energy(signal: &[f32], start: usize, stop: usize) -> f32 {
    signal[start..stop].iter().map(|v| v.abs()).sum()
}
