//! The two networks the trainer couples, behind narrow capability traits.
//!
//! The extractor maps source features `[batch × n_coeff × frames]` to latent
//! codes `[batch × latent]`. The autoencoder maps targets `[batch × D × N]`
//! to the same latent space and back. Neither trait prescribes a topology;
//! [`dense`] ships a small fully connected baseline for both.

pub mod backend;
pub mod dense;

use burn::prelude::*;

pub use dense::{DenseAutoencoder, DenseAutoencoderConfig, DenseExtractor, DenseExtractorConfig};

/// Predicts a latent code directly from spectral features.
pub trait LatentExtractor<B: Backend> {
    fn extract(&self, source: Tensor<B, 3>) -> Tensor<B, 2>;
}

/// Encodes targets into the shared latent space and decodes them back.
pub trait LatentAutoencoder<B: Backend> {
    fn encode(&self, input: Tensor<B, 3>) -> Tensor<B, 2>;
    fn decode(&self, latent: Tensor<B, 2>) -> Tensor<B, 3>;
}
