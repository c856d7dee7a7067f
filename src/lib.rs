//! Library exports for the training binaries, benchmarks and tests.
/// WAV IO, signal helpers and onset-based segmentation.
pub mod acoustics;
/// Training configuration.
pub mod config;
/// CSV-indexed paired `.npy` samples and batching.
pub mod dataset;
/// Feature tensors and offline normalization.
pub mod features;
/// Tracing subscriber setup.
pub mod logging;
/// Extractor and autoencoder networks plus backend selection.
pub mod model;
/// Impulse response synthesis from peak encodings.
pub mod reconstruct;
/// Spectral codec: STFT, mel, MFCC and their inverses.
pub mod spectral;
/// Latent-coupled training loop.
pub mod train;
