//! Latent-coupled training: a frozen autoencoder supplies latent targets that
//! a trainable extractor learns to predict from spectral features.

pub mod checkpoint;
pub mod interrupt;
pub mod loss;
pub mod metrics_log;
pub mod report;
mod session;
mod trainer;

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::dataset::DatasetError;

pub use checkpoint::{CheckpointError, CheckpointStore, TrainingState};
pub use interrupt::{StopFlag, install_sigint_handler};
pub use loss::{LatentLoss, chamfer, mean_without_worst, weighted_mse};
pub use session::{DenseTrainer, open_session, run_session};
pub use trainer::{EvalSummary, RunOutcome, TrainSummary, Trainer, TrainerOptions, TrainerParts};

/// Errors that stop a training run.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error("{what} dataset is empty")]
    EmptyDataset { what: &'static str },
    #[error("Failed to write metrics log {path}: {source}")]
    MetricsIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format timestamp: {0}")]
    Timestamp(time::error::Format),
    #[error("Failed to write report {path}: {source}")]
    ReportIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize report: {0}")]
    ReportFormat(serde_json::Error),
}
