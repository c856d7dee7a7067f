mod support;

use ndarray::Array2;
use rirnet::acoustics::{read_wav, save_wav};
use rirnet::dataset::{load_array, save_array};
use rirnet::features::Normalizer;
use rirnet::reconstruct::{PeakEncoding, reconstruct};
use rirnet::spectral::{self, HOP_LENGTH, N_MELS, frame_count};
use tempfile::tempdir;

use support::wav::{sine, write_test_wav};

const RATE: u32 = 16_000;

#[test]
fn wav_file_to_mfcc_and_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    write_test_wav(&path, &sine(440.0, RATE, 8_192, 0.25), RATE);

    let audio = read_wav(&path, None).unwrap();
    assert_eq!(audio.sample_rate, RATE);
    let peak = audio.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    assert!((peak - 1.0).abs() < 1e-4);

    let (phase, mfcc) = spectral::to_mfcc(&audio.samples, RATE, 20).unwrap();
    assert_eq!(mfcc.coefficients(), 20);
    assert_eq!(mfcc.frames(), frame_count(audio.samples.len(), spectral::N_FFT, HOP_LENGTH));
    assert!(mfcc.values().iter().all(|v| v.is_finite()));

    let rebuilt = spectral::inverse(&mfcc, RATE, Some(&phase)).unwrap();
    assert_eq!(rebuilt.len(), (mfcc.frames() - 1) * HOP_LENGTH);
    assert!(rebuilt.iter().all(|v| v.is_finite()));
    assert!(rebuilt.iter().any(|v| v.abs() > 0.0));
}

#[test]
fn log_mel_matches_mel_band_count() {
    let samples = sine(1_000.0, RATE, 4_096, 0.5);
    let (_, log_mel) = spectral::to_log_mel(&samples, RATE).unwrap();
    assert_eq!(log_mel.coefficients(), N_MELS);
    let max = log_mel.values().iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let min = log_mel.values().iter().copied().fold(f32::INFINITY, f32::min);
    assert!(max - min <= spectral::TOP_DB + 1e-3);
}

#[test]
fn normalizer_stats_apply_to_extracted_features() {
    let dir = tempdir().unwrap();
    let (_, mfcc) = spectral::to_mfcc(&sine(220.0, RATE, 4_096, 0.5), RATE, 8).unwrap();
    let mean = Array2::from_elem((8, 1), 1.0f32);
    let std = Array2::from_elem((8, 1), 2.0f32);
    save_array(&dir.path().join("mean.npy"), &mean).unwrap();
    save_array(&dir.path().join("std.npy"), &std).unwrap();

    let normalizer = Normalizer::from_files(dir.path(), "mean.npy", "std.npy").unwrap();
    let normalized = normalizer.normalize(&mfcc).unwrap();
    let expected = (mfcc.values()[[3, 2]] - 1.0) / 2.0;
    assert!((normalized.values()[[3, 2]] - expected).abs() < 1e-5);
}

#[test]
fn peak_encoding_file_renders_to_wav() {
    let dir = tempdir().unwrap();
    let peaks_path = dir.path().join("peaks.npy");
    let peaks = Array2::from_shape_vec((3, 2), vec![4.0f32, 0.0, 10.5, 1.0, 20.0, 2.0]).unwrap();
    save_array(&peaks_path, &peaks).unwrap();

    let encoding = PeakEncoding::from_array(&load_array(&peaks_path).unwrap()).unwrap();
    assert_eq!(encoding.len(), 3);
    let rir = reconstruct(&encoding);
    assert!(!rir.is_empty());
    let loudest = rir
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
        .map(|(idx, _)| idx)
        .unwrap();
    // First peak lands on sample 5120 and starts the trimmed output.
    assert_eq!(loudest, 0);
    assert!((rir[0] - 1.0).abs() < 1e-6);
    assert!((rir[11_776 - 5_120] - (-1.0f32).exp()).abs() < 1e-5);

    let out = dir.path().join("rir.wav");
    save_wav(&out, &rir, 44_100, true).unwrap();
    let audio = read_wav(&out, None).unwrap();
    assert_eq!(audio.samples.len(), rir.len());
}
