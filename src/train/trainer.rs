use std::path::PathBuf;

use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::ElementConversion;
use burn::tensor::backend::AutodiffBackend;
use tracing::{info, warn};

use super::checkpoint::CheckpointStore;
use super::interrupt::StopFlag;
use super::loss::{LatentLoss, chamfer, mean_without_worst};
use super::metrics_log::{EpochRow, MetricsLog, now_timestamp};
use super::report::{DiagnosticReport, EvalSnapshot, LatentSnapshot};
use super::TrainError;
use crate::dataset::{Batcher, PairedDataset};
use crate::model::{LatentAutoencoder, LatentExtractor};

/// Hyper-parameters the trainer reads on every batch.
#[derive(Clone, Debug)]
pub struct TrainerOptions {
    pub loss: LatentLoss,
    pub latent_weight: f32,
    pub learning_rate: f64,
    pub log_interval: usize,
    /// Last epoch index to run; the loop covers `epoch..=epochs`.
    pub epochs: usize,
}

/// Everything a [`Trainer`] owns, assembled by the caller.
pub struct TrainerParts<B: AutodiffBackend, E, A, O> {
    pub extractor: E,
    pub autoencoder: A,
    pub optimizer: O,
    pub options: TrainerOptions,
    pub train_data: PairedDataset,
    pub eval_data: PairedDataset,
    pub batcher: Batcher,
    pub checkpoints: CheckpointStore,
    pub metrics: MetricsLog,
    pub report_dir: PathBuf,
    pub device: B::Device,
    /// Resume epoch; 0 for a cold start.
    pub epoch: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrainSummary {
    pub mean_latent_loss: f32,
    pub mean_output_loss: f32,
    pub batches: usize,
    pub last_latent: LatentSnapshot,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvalSummary {
    /// Mean Chamfer loss with the worst batch dropped.
    pub output_loss: f32,
    /// Mean latent loss with the worst batch dropped.
    pub latent_loss: f32,
    pub batches: usize,
    pub last_example: EvalSnapshot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { epoch: usize },
    Interrupted { epoch: usize },
}

/// Trains `E` against latent codes from the frozen autoencoder `A`.
///
/// `A` lives on the inner (non-autodiff) backend, so nothing it computes
/// carries gradients. Evaluation runs the extractor through
/// [`AutodiffModule::valid`].
pub struct Trainer<B: AutodiffBackend, E, A, O> {
    extractor: E,
    autoencoder: A,
    optimizer: O,
    options: TrainerOptions,
    train_data: PairedDataset,
    eval_data: PairedDataset,
    batcher: Batcher,
    checkpoints: CheckpointStore,
    metrics: MetricsLog,
    report_dir: PathBuf,
    device: B::Device,
    epoch: usize,
}

impl<B, E, A, O> Trainer<B, E, A, O>
where
    B: AutodiffBackend,
    E: AutodiffModule<B> + LatentExtractor<B>,
    E::InnerModule: LatentExtractor<B::InnerBackend>,
    A: LatentAutoencoder<B::InnerBackend>,
    O: Optimizer<E, B>,
{
    pub fn new(parts: TrainerParts<B, E, A, O>) -> Self {
        Self {
            extractor: parts.extractor,
            autoencoder: parts.autoencoder,
            optimizer: parts.optimizer,
            options: parts.options,
            train_data: parts.train_data,
            eval_data: parts.eval_data,
            batcher: parts.batcher,
            checkpoints: parts.checkpoints,
            metrics: parts.metrics,
            report_dir: parts.report_dir,
            device: parts.device,
            epoch: parts.epoch,
        }
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn learning_rate(&self) -> f64 {
        self.options.learning_rate
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// One pass over the training set, one optimizer step per batch.
    pub fn train_epoch(&mut self) -> Result<TrainSummary, TrainError> {
        let order = self.batcher.epoch_order(self.train_data.len());
        let batch_count = order.len();
        let mut latent_losses = Vec::with_capacity(batch_count);
        let mut output_losses = Vec::with_capacity(batch_count);
        let mut last_latent = LatentSnapshot::default();
        let mut seen = 0usize;

        for (batch_idx, indices) in order.iter().enumerate() {
            let batch = Batcher::collate(&self.train_data, indices)?;
            let source = batch.source_tensor::<B>(&self.device);
            let target = batch.target_tensor::<B::InnerBackend>(&self.device);

            let latent_target = Tensor::<B, 2>::from_inner(self.autoencoder.encode(target.clone()));
            let latent_source = self.extractor.extract(source);
            let loss_latent = self.options.loss.compute(
                latent_source.clone(),
                latent_target.clone(),
                self.options.latent_weight,
            );

            // Monitoring only: decoded on the inner backend, never backpropagated.
            let output = self.autoencoder.decode(latent_source.clone().inner());
            let loss_output = scalar(chamfer(output, target));
            if !loss_output.is_finite() {
                warn!("Non-finite output loss in training batch {batch_idx}");
            }

            let loss_value = scalar(loss_latent.clone().inner());
            let grads = GradientsParams::from_grads(loss_latent.backward(), &self.extractor);
            self.extractor = self.optimizer.step(
                self.options.learning_rate,
                self.extractor.clone(),
                grads,
            );

            latent_losses.push(loss_value);
            output_losses.push(loss_output);
            seen += batch.len();
            if self.options.log_interval > 0 && batch_idx % self.options.log_interval == 0 {
                info!(
                    "Train epoch {:5} [{:5}/{:5} ({:4.1}%)] latent loss: {:.6} output loss: {:.6}",
                    self.epoch + 1,
                    seen,
                    self.train_data.len(),
                    100.0 * batch_idx as f32 / batch_count as f32,
                    loss_value,
                    loss_output
                );
            }
            if batch_idx + 1 == batch_count {
                last_latent = LatentSnapshot {
                    target: first_row(latent_target.inner()),
                    output: first_row(latent_source.inner()),
                };
            }
        }

        Ok(TrainSummary {
            mean_latent_loss: mean(&latent_losses),
            mean_output_loss: mean(&output_losses),
            batches: batch_count,
            last_latent,
        })
    }

    /// One gradient-free pass over the evaluation set.
    pub fn evaluate(&mut self) -> Result<EvalSummary, TrainError> {
        let extractor = self.extractor.valid();
        let order = self.batcher.epoch_order(self.eval_data.len());
        let mut latent_losses = Vec::with_capacity(order.len());
        let mut output_losses = Vec::with_capacity(order.len());
        let mut last_example = EvalSnapshot::default();

        for (batch_idx, indices) in order.iter().enumerate() {
            let batch = Batcher::collate(&self.eval_data, indices)?;
            let source = batch.source_tensor::<B::InnerBackend>(&self.device);
            let target = batch.target_tensor::<B::InnerBackend>(&self.device);

            let latent_target = self.autoencoder.encode(target.clone());
            let latent_source = extractor.extract(source.clone());
            latent_losses.push(scalar(self.options.loss.compute(
                latent_source.clone(),
                latent_target.clone(),
                self.options.latent_weight,
            )));

            let output = self.autoencoder.decode(latent_source.clone());
            let decoded_target = self.autoencoder.decode(latent_target.clone());
            output_losses.push(scalar(chamfer(output.clone(), target.clone())));

            if batch_idx + 1 == order.len() {
                last_example = EvalSnapshot {
                    latent: LatentSnapshot {
                        target: first_row(latent_target),
                        output: first_row(latent_source),
                    },
                    target: first_matrix(target),
                    output: first_matrix(output),
                    decoded_target: first_matrix(decoded_target),
                    source: first_matrix(source),
                };
            }
        }

        let summary = EvalSummary {
            output_loss: mean_without_worst(&output_losses),
            latent_loss: mean_without_worst(&latent_losses),
            batches: order.len(),
            last_example,
        };
        info!("Latent loss eval: {}", summary.latent_loss);
        info!("Output loss eval: {}", summary.output_loss);
        Ok(summary)
    }

    /// Persist weights, optimizer state and resume bookkeeping for the current epoch.
    pub fn save_checkpoint(&self) -> Result<(), TrainError> {
        self.checkpoints.save_training::<B, E, O>(
            self.epoch,
            &self.extractor,
            &self.optimizer,
            self.options.learning_rate,
        )?;
        info!("Saved checkpoint for epoch {}", self.epoch);
        Ok(())
    }

    /// Run epochs until the configured last epoch or a stop request.
    ///
    /// `stop` is polled only after an epoch has been fully trained, evaluated,
    /// logged and checkpointed.
    pub fn run(&mut self, stop: &StopFlag) -> Result<RunOutcome, TrainError> {
        self.metrics.mark_started(now_timestamp())?;
        info!(
            "Training from epoch {} to {} with {} ({} train / {} eval samples)",
            self.epoch,
            self.options.epochs,
            self.options.loss.name(),
            self.train_data.len(),
            self.eval_data.len()
        );

        while self.epoch <= self.options.epochs {
            let train = self.train_epoch()?;
            let eval = self.evaluate()?;
            self.epoch += 1;

            self.metrics.append_epoch(&EpochRow {
                epoch: self.epoch,
                train_latent_loss: train.mean_latent_loss,
                train_output_loss: train.mean_output_loss,
                eval_output_loss: eval.output_loss,
                eval_latent_loss: eval.latent_loss,
                timestamp: now_timestamp(),
            })?;
            self.save_checkpoint()?;
            self.write_report(train.last_latent, eval.last_example)?;

            if stop.is_stop_requested() {
                info!("Stop requested, ending after epoch {}", self.epoch);
                self.metrics.mark_stopped(now_timestamp())?;
                return Ok(RunOutcome::Interrupted { epoch: self.epoch });
            }
        }

        self.metrics.mark_stopped(now_timestamp())?;
        Ok(RunOutcome::Completed { epoch: self.epoch })
    }

    fn write_report(&self, train_latent: LatentSnapshot, eval: EvalSnapshot) -> Result<(), TrainError> {
        let history = self.metrics.read_history()?;
        let report = DiagnosticReport::build(
            self.options.loss.name(),
            &history,
            now_timestamp(),
            train_latent,
            eval,
        );
        report.write(&self.report_dir)?;
        Ok(())
    }
}

fn scalar<B: Backend>(tensor: Tensor<B, 1>) -> f32 {
    tensor.into_scalar().elem::<f32>()
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

fn first_row<B: Backend>(tensor: Tensor<B, 2>) -> Vec<f32> {
    let [batch, _] = tensor.dims();
    if batch == 0 {
        return Vec::new();
    }
    tensor
        .narrow(0, 0, 1)
        .into_data()
        .to_vec::<f32>()
        .unwrap_or_default()
}

fn first_matrix<B: Backend>(tensor: Tensor<B, 3>) -> Vec<Vec<f32>> {
    let [batch, _, cols] = tensor.dims();
    if batch == 0 || cols == 0 {
        return Vec::new();
    }
    let values = tensor
        .narrow(0, 0, 1)
        .into_data()
        .to_vec::<f32>()
        .unwrap_or_default();
    values.chunks(cols).map(|row| row.to_vec()).collect()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use burn::backend::NdArray;
    use burn::optim::adaptor::OptimizerAdaptor;
    use burn::optim::{Adam, AdamConfig};
    use ndarray::Array2;
    use tempfile::tempdir;

    use super::*;
    use crate::dataset::{IndexTable, SamplePair, save_array};
    use crate::model::backend::CpuBackend;
    use crate::model::{DenseAutoencoder, DenseAutoencoderConfig, DenseExtractor, DenseExtractorConfig};

    const SOURCE: (usize, usize) = (3, 4);
    const TARGET: (usize, usize) = (2, 5);
    const LATENT: usize = 3;

    type TestOptimizer = OptimizerAdaptor<Adam, DenseExtractor<CpuBackend>, CpuBackend>;
    type TestTrainer<A> = Trainer<CpuBackend, DenseExtractor<CpuBackend>, A, TestOptimizer>;

    /// Decodes every latent code to the origin.
    struct ZeroAutoencoder;

    impl LatentAutoencoder<NdArray> for ZeroAutoencoder {
        fn encode(&self, input: Tensor<NdArray, 3>) -> Tensor<NdArray, 2> {
            let [batch, _, _] = input.dims();
            Tensor::zeros([batch, LATENT], &input.device())
        }

        fn decode(&self, latent: Tensor<NdArray, 2>) -> Tensor<NdArray, 3> {
            let [batch, _] = latent.dims();
            Tensor::zeros([batch, TARGET.0, TARGET.1], &latent.device())
        }
    }

    fn write_dataset(dir: &Path, name: &str, targets: &[Array2<f32>]) -> PairedDataset {
        let pairs = targets
            .iter()
            .enumerate()
            .map(|(i, target)| {
                let data_path = dir.join(format!("{name}_{i}_data.npy"));
                let target_path = dir.join(format!("{name}_{i}_target.npy"));
                let data = Array2::from_shape_fn(SOURCE, |(r, c)| {
                    0.1 + 0.05 * (r * SOURCE.1 + c + i) as f32
                });
                save_array(&data_path, &data).unwrap();
                save_array(&target_path, target).unwrap();
                SamplePair {
                    data_path,
                    target_path,
                }
            })
            .collect();
        PairedDataset::new(IndexTable::from_pairs(pairs), None)
    }

    fn ramp_target(seed: usize) -> Array2<f32> {
        Array2::from_shape_fn(TARGET, |(r, c)| 1.0 + ((seed + r * 3 + c) % 7) as f32)
    }

    fn build<A: LatentAutoencoder<NdArray>>(
        dir: &Path,
        autoencoder: A,
        latent_weight: f32,
        train_data: PairedDataset,
        eval_data: PairedDataset,
        batch_size: usize,
    ) -> TestTrainer<A> {
        let device = Default::default();
        let extractor = DenseExtractorConfig::new(SOURCE.0, SOURCE.1)
            .with_hidden_size(8)
            .with_latent_dim(LATENT)
            .init::<CpuBackend>(&device);
        Trainer::new(TrainerParts {
            extractor,
            autoencoder,
            optimizer: AdamConfig::new().init::<CpuBackend, DenseExtractor<CpuBackend>>(),
            options: TrainerOptions {
                loss: LatentLoss::Mse,
                latent_weight,
                learning_rate: 1e-2,
                log_interval: 0,
                epochs: 0,
            },
            train_data,
            eval_data,
            batcher: Batcher::new(batch_size, 11),
            checkpoints: CheckpointStore::new(dir),
            metrics: MetricsLog::in_dir(dir),
            report_dir: dir.to_path_buf(),
            device,
            epoch: 0,
        })
    }

    fn extractor_output<A>(trainer: &TestTrainer<A>) -> Vec<f32>
    where
        A: LatentAutoencoder<NdArray>,
    {
        let probe = Tensor::<NdArray, 3>::ones([1, SOURCE.0, SOURCE.1], &Default::default());
        trainer
            .extractor()
            .valid()
            .extract(probe)
            .into_data()
            .to_vec::<f32>()
            .unwrap()
    }

    #[test]
    fn train_epoch_updates_extractor_and_not_autoencoder() {
        let dir = tempdir().unwrap();
        let targets: Vec<_> = (0..4).map(ramp_target).collect();
        let train = write_dataset(dir.path(), "train", &targets);
        let eval = write_dataset(dir.path(), "eval", &targets[..1]);
        let autoencoder = DenseAutoencoderConfig::new(TARGET.0, TARGET.1)
            .with_hidden_size(8)
            .with_latent_dim(LATENT)
            .init::<NdArray>(&Default::default());
        let mut trainer = build(dir.path(), autoencoder, 10.0, train, eval, 2);

        let target_probe = Tensor::<NdArray, 3>::ones([1, TARGET.0, TARGET.1], &Default::default());
        let encode = |trainer: &TestTrainer<DenseAutoencoder<NdArray>>| {
            trainer
                .autoencoder
                .encode(target_probe.clone())
                .into_data()
                .to_vec::<f32>()
                .unwrap()
        };
        let extractor_before = extractor_output(&trainer);
        let latent_before = encode(&trainer);

        let summary = trainer.train_epoch().unwrap();
        assert_eq!(summary.batches, 2);
        assert!(summary.mean_latent_loss.is_finite());
        assert_ne!(extractor_output(&trainer), extractor_before);
        assert_eq!(encode(&trainer), latent_before);
    }

    #[test]
    fn only_the_latent_loss_drives_updates() {
        let dir = tempdir().unwrap();
        let targets: Vec<_> = (0..3).map(ramp_target).collect();
        let train = write_dataset(dir.path(), "train", &targets);
        let eval = write_dataset(dir.path(), "eval", &targets[..1]);
        let mut trainer = build(dir.path(), ZeroAutoencoder, 0.0, train, eval, 1);

        let before = extractor_output(&trainer);
        let summary = trainer.train_epoch().unwrap();
        assert_eq!(summary.mean_latent_loss, 0.0);
        assert!(summary.mean_output_loss > 0.0);
        assert_eq!(extractor_output(&trainer), before);
    }

    #[test]
    fn evaluation_drops_the_worst_batch() {
        let dir = tempdir().unwrap();
        let mut one_hot = Array2::<f32>::zeros(TARGET);
        one_hot[[0, 0]] = 1.0;
        // Against an all-zero decode: one-hot targets score 10 * (1/5) = 2,
        // an all-ones target scores 10 * (2 + 2) = 40.
        let targets = vec![one_hot.clone(), Array2::ones(TARGET), one_hot];
        let train = write_dataset(dir.path(), "train", &targets[..1]);
        let eval = write_dataset(dir.path(), "eval", &targets);
        let mut trainer = build(dir.path(), ZeroAutoencoder, 10.0, train, eval, 1);

        let summary = trainer.evaluate().unwrap();
        assert_eq!(summary.batches, 3);
        assert!((summary.output_loss - 2.0).abs() < 1e-4, "{}", summary.output_loss);
        assert!(summary.latent_loss.is_finite());
    }
}
