use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::{AudioError, normalize_peak};
use crate::spectral::resample;

/// Mono samples plus the rate they are expressed at.
#[derive(Debug, Clone)]
pub struct WavAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Read a WAV file as peak-normalized mono, optionally resampled to `rate`.
pub fn read_wav(path: &Path, rate: Option<u32>) -> Result<WavAudio, AudioError> {
    let reader = WavReader::open(path).map_err(|source| AudioError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(AudioError::InvalidFormat {
            path: path.to_path_buf(),
        });
    }
    let interleaved = read_samples(reader, spec).map_err(|source| AudioError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mono = downmix(&interleaved, spec.channels as usize);
    let samples = normalize_peak(&mono);
    match rate {
        Some(target) if target != spec.sample_rate => Ok(WavAudio {
            samples: resample(&samples, spec.sample_rate, target)?,
            sample_rate: target,
        }),
        _ => Ok(WavAudio {
            samples,
            sample_rate: spec.sample_rate,
        }),
    }
}

/// Write mono 32-bit float samples, peak-normalizing first when `normalize` is set.
pub fn save_wav(path: &Path, samples: &[f32], rate: u32, normalize: bool) -> Result<(), AudioError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let write_err = |source| AudioError::Write {
        path: path.to_path_buf(),
        source,
    };
    let data = if normalize {
        normalize_peak(samples)
    } else {
        samples.to_vec()
    };
    let mut writer = WavWriter::create(path, spec).map_err(write_err)?;
    for sample in data {
        writer.write_sample(sample).map_err(write_err)?;
    }
    writer.finalize().map_err(write_err)
}

fn read_samples<R: std::io::Read>(reader: WavReader<R>, spec: WavSpec) -> Result<Vec<f32>, hound::Error> {
    match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect(),
        SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|sample| sample.map(|v| v as f32 * scale))
                .collect()
        }
    }
}

fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
