//! Epoch-keyed model, optimizer and training-state files in the model directory.

use std::path::{Path, PathBuf};

use burn::module::{AutodiffModule, Module};
use burn::optim::Optimizer;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use burn::tensor::backend::{AutodiffBackend, Backend};
use serde::{Deserialize, Serialize};
use tracing::debug;

const RECORD_EXTENSION: &str = "mpk";
pub const EXTRACTOR_STEM: &str = "extractor";
pub const OPTIMIZER_STEM: &str = "opt_extractor";
pub const AUTOENCODER_STEM: &str = "autoencoder";
const STATE_STEM: &str = "state";

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("Failed to scan checkpoint directory {path}: {source}")]
    Scan {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Checkpoint file {path} is missing")]
    Missing { path: PathBuf },
    #[error("No {stem} weights found in {dir}")]
    NoWeights { stem: &'static str, dir: PathBuf },
    #[error("Failed to record {path}: {message}")]
    Record { path: PathBuf, message: String },
    #[error("Failed to access training state {path}: {source}")]
    StateIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid training state {path}: {source}")]
    StateFormat {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Resume bookkeeping written next to each extractor checkpoint.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingState {
    pub epoch: usize,
    pub learning_rate: f64,
}

type FileRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

#[derive(Clone, Debug)]
pub struct CheckpointStore {
    dir: PathBuf,
    recorder: FileRecorder,
}

impl CheckpointStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            recorder: FileRecorder::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Highest `N` among `N_<stem>.mpk` files, if any.
    pub fn latest_epoch(&self, stem: &str) -> Result<Option<usize>, CheckpointError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|source| CheckpointError::Scan {
            path: self.dir.clone(),
            source,
        })?;
        let suffix = format!("_{stem}.{RECORD_EXTENSION}");
        Ok(entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                name.strip_suffix(&suffix)?.parse::<usize>().ok()
            })
            .max())
    }

    /// Path without extension; the recorder appends `.mpk`.
    fn record_base(&self, epoch: usize, stem: &str) -> PathBuf {
        self.dir.join(format!("{epoch}_{stem}"))
    }

    fn record_path(&self, epoch: usize, stem: &str) -> PathBuf {
        self.dir.join(format!("{epoch}_{stem}.{RECORD_EXTENSION}"))
    }

    fn state_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("{epoch}_{STATE_STEM}.json"))
    }

    pub fn save_module<B: Backend, M: Module<B>>(
        &self,
        epoch: usize,
        stem: &str,
        module: &M,
    ) -> Result<PathBuf, CheckpointError> {
        let path = self.record_path(epoch, stem);
        module
            .clone()
            .save_file(self.record_base(epoch, stem), &self.recorder)
            .map_err(|err| record_error(&path, err))?;
        debug!("Saved {}", path.display());
        Ok(path)
    }

    pub fn load_module<B: Backend, M: Module<B>>(
        &self,
        epoch: usize,
        stem: &str,
        module: M,
        device: &B::Device,
    ) -> Result<M, CheckpointError> {
        let path = self.require(epoch, stem)?;
        module
            .load_file(self.record_base(epoch, stem), &self.recorder, device)
            .map_err(|err| record_error(&path, err))
    }

    /// Extractor weights, optimizer state and resume bookkeeping for `epoch`.
    pub fn save_training<B, M, O>(
        &self,
        epoch: usize,
        model: &M,
        optimizer: &O,
        learning_rate: f64,
    ) -> Result<(), CheckpointError>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        self.save_module::<B, M>(epoch, EXTRACTOR_STEM, model)?;
        let optimizer_path = self.record_path(epoch, OPTIMIZER_STEM);
        <FileRecorder as Recorder<B>>::record(
            &self.recorder,
            optimizer.to_record(),
            self.record_base(epoch, OPTIMIZER_STEM),
        )
        .map_err(|err| record_error(&optimizer_path, err))?;
        self.save_state(&TrainingState {
            epoch,
            learning_rate,
        })
    }

    pub fn load_optimizer<B, M, O>(
        &self,
        epoch: usize,
        optimizer: O,
        device: &B::Device,
    ) -> Result<O, CheckpointError>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        let path = self.require(epoch, OPTIMIZER_STEM)?;
        let record = <FileRecorder as Recorder<B>>::load::<O::Record>(
            &self.recorder,
            self.record_base(epoch, OPTIMIZER_STEM),
            device,
        )
        .map_err(|err| record_error(&path, err))?;
        Ok(optimizer.load_record(record))
    }

    pub fn save_state(&self, state: &TrainingState) -> Result<(), CheckpointError> {
        let path = self.state_path(state.epoch);
        let text = serde_json::to_string_pretty(state).map_err(|source| {
            CheckpointError::StateFormat {
                path: path.clone(),
                source,
            }
        })?;
        std::fs::write(&path, text).map_err(|source| CheckpointError::StateIo { path, source })
    }

    /// Saved state for `epoch`, or `None` when no state file was written.
    pub fn load_state(&self, epoch: usize) -> Result<Option<TrainingState>, CheckpointError> {
        let path = self.state_path(epoch);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path).map_err(|source| CheckpointError::StateIo {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| CheckpointError::StateFormat { path, source })
    }

    /// Load the newest autoencoder weights into `module`.
    pub fn load_latest_autoencoder<B: Backend, M: Module<B>>(
        &self,
        module: M,
        device: &B::Device,
    ) -> Result<(M, usize), CheckpointError> {
        let epoch = self
            .latest_epoch(AUTOENCODER_STEM)?
            .ok_or_else(|| CheckpointError::NoWeights {
                stem: AUTOENCODER_STEM,
                dir: self.dir.clone(),
            })?;
        let module = self.load_module::<B, M>(epoch, AUTOENCODER_STEM, module, device)?;
        Ok((module, epoch))
    }

    fn require(&self, epoch: usize, stem: &str) -> Result<PathBuf, CheckpointError> {
        let path = self.record_path(epoch, stem);
        if path.exists() {
            Ok(path)
        } else {
            Err(CheckpointError::Missing { path })
        }
    }
}

fn record_error(path: &Path, err: burn::record::RecorderError) -> CheckpointError {
    CheckpointError::Record {
        path: path.to_path_buf(),
        message: format!("{err:?}"),
    }
}
