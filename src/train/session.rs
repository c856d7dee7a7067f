use std::path::Path;

use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig};
use burn::tensor::backend::AutodiffBackend;
use tracing::{info, warn};

use super::checkpoint::{CheckpointStore, EXTRACTOR_STEM};
use super::interrupt::StopFlag;
use super::metrics_log::MetricsLog;
use super::trainer::{RunOutcome, Trainer, TrainerOptions, TrainerParts};
use super::TrainError;
use crate::config::TrainConfig;
use crate::dataset::{Batcher, DatasetError, IndexTable, PairedDataset};
use crate::features::Normalizer;
use crate::model::{DenseAutoencoder, DenseAutoencoderConfig, DenseExtractor, DenseExtractorConfig};

/// Trainer over the dense baseline networks with Adam.
pub type DenseTrainer<B> = Trainer<
    B,
    DenseExtractor<B>,
    DenseAutoencoder<<B as AutodiffBackend>::InnerBackend>,
    OptimizerAdaptor<Adam, DenseExtractor<B>, B>,
>;

/// Build a trainer for `model_dir`, resuming from its newest extractor checkpoint.
///
/// The autoencoder is loaded from the newest `N_autoencoder.mpk` and must
/// exist. On resume the configured learning rate replaces the saved one.
pub fn open_session<B: AutodiffBackend>(
    model_dir: &Path,
    config: &TrainConfig,
    device: B::Device,
) -> Result<DenseTrainer<B>, TrainError> {
    let loss = config.validate()?;
    let normalizer = match &config.normalization {
        Some(stats) => Some(
            Normalizer::from_files(
                &config.resolve(model_dir, &stats.dir),
                &stats.mean_file,
                &stats.std_file,
            )
            .map_err(DatasetError::from)?,
        ),
        None => None,
    };
    let train_data = load_dataset(model_dir, config, &config.train_index, normalizer.clone())?;
    let eval_data = load_dataset(model_dir, config, &config.eval_index, normalizer)?;
    if train_data.is_empty() {
        return Err(TrainError::EmptyDataset { what: "Training" });
    }
    if eval_data.is_empty() {
        return Err(TrainError::EmptyDataset { what: "Evaluation" });
    }

    let probe = train_data.get(0)?;
    let (source_rows, source_cols) = probe.source.values().dim();
    let (target_rows, target_cols) = probe.target.dim();

    let checkpoints = CheckpointStore::new(model_dir);
    let autoencoder = DenseAutoencoderConfig::new(target_rows, target_cols)
        .with_hidden_size(config.hidden_size)
        .with_latent_dim(config.latent_dim)
        .init::<B::InnerBackend>(&device);
    let (autoencoder, autoencoder_epoch) =
        checkpoints.load_latest_autoencoder::<B::InnerBackend, _>(autoencoder, &device)?;
    info!("Loaded autoencoder from epoch {autoencoder_epoch}");

    let mut extractor = DenseExtractorConfig::new(source_rows, source_cols)
        .with_hidden_size(config.hidden_size)
        .with_latent_dim(config.latent_dim)
        .init::<B>(&device);
    let mut optimizer = AdamConfig::new()
        .with_beta_1(config.beta_1)
        .with_beta_2(config.beta_2)
        .with_epsilon(config.epsilon)
        .init::<B, DenseExtractor<B>>();

    let epoch = checkpoints.latest_epoch(EXTRACTOR_STEM)?.unwrap_or(0);
    if epoch > 0 {
        extractor = checkpoints.load_module::<B, _>(epoch, EXTRACTOR_STEM, extractor, &device)?;
        optimizer = checkpoints
            .load_optimizer::<B, DenseExtractor<B>, _>(epoch, optimizer, &device)?;
        if let Some(state) = checkpoints.load_state(epoch)? {
            if state.learning_rate != config.learning_rate {
                warn!(
                    "Overriding saved learning rate {} with configured {}",
                    state.learning_rate, config.learning_rate
                );
            }
        }
        info!("Resuming extractor from epoch {epoch}");
    } else {
        info!("No extractor checkpoint found, starting from scratch");
    }

    Ok(Trainer::new(TrainerParts {
        extractor,
        autoencoder,
        optimizer,
        options: TrainerOptions {
            loss,
            latent_weight: config.latent_weight,
            learning_rate: config.learning_rate,
            log_interval: config.log_interval,
            epochs: config.epochs,
        },
        train_data,
        eval_data,
        batcher: Batcher::new(config.batch_size, config.seed),
        checkpoints,
        metrics: MetricsLog::in_dir(model_dir),
        report_dir: model_dir.to_path_buf(),
        device,
        epoch,
    }))
}

/// Open the session for `model_dir` and train until done or stopped.
pub fn run_session<B: AutodiffBackend>(
    model_dir: &Path,
    config: &TrainConfig,
    device: B::Device,
    stop: &StopFlag,
) -> Result<RunOutcome, TrainError> {
    let mut trainer = open_session::<B>(model_dir, config, device)?;
    trainer.run(stop)
}

fn load_dataset(
    model_dir: &Path,
    config: &TrainConfig,
    index: &Path,
    normalizer: Option<Normalizer>,
) -> Result<PairedDataset, TrainError> {
    let path = config.resolve(model_dir, index);
    let table = IndexTable::load(&path)?;
    Ok(PairedDataset::new(table, normalizer))
}
