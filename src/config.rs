//! Training configuration read from `<model_dir>/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::backend::BackendKind;
use crate::train::LatentLoss;

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors raised while loading or validating a [`TrainConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unknown loss function '{0}'")]
    UnknownLoss(String),
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Location of the offline normalization statistics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizationConfig {
    pub dir: PathBuf,
    #[serde(default = "default_mean_file")]
    pub mean_file: String,
    #[serde(default = "default_std_file")]
    pub std_file: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub train_index: PathBuf,
    pub eval_index: PathBuf,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Parsed for compatibility with SGD-style configs; Adam ignores it.
    pub momentum: f64,
    /// Batches between progress log lines.
    pub log_interval: usize,
    pub loss_function: String,
    pub latent_weight: f32,
    pub seed: u64,
    pub backend: BackendKind,
    pub latent_dim: usize,
    pub hidden_size: usize,
    pub beta_1: f32,
    pub beta_2: f32,
    pub epsilon: f32,
    pub normalization: Option<NormalizationConfig>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_index: PathBuf::from("train.csv"),
            eval_index: PathBuf::from("eval.csv"),
            epochs: 100,
            batch_size: 100,
            learning_rate: 1e-3,
            momentum: 0.9,
            log_interval: 10,
            loss_function: LatentLoss::Mse.name().to_string(),
            latent_weight: 10.0,
            seed: 0,
            backend: BackendKind::Cpu,
            latent_dim: 32,
            hidden_size: 256,
            beta_1: 0.9,
            beta_2: 0.99,
            epsilon: 1e-5,
            normalization: None,
        }
    }
}

impl TrainConfig {
    /// Load `<model_dir>/config.toml`; a missing file yields the defaults.
    pub fn load(model_dir: &Path) -> Result<Self, ConfigError> {
        let path = model_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn save(&self, model_dir: &Path) -> Result<(), ConfigError> {
        let path = model_dir.join(CONFIG_FILE_NAME);
        let text = toml::to_string_pretty(self)?;
        std::fs::write(&path, text).map_err(|source| ConfigError::Write { path, source })
    }

    /// Reject values that would make training meaningless, and resolve the loss name.
    pub fn validate(&self) -> Result<LatentLoss, ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be positive".into()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.latent_dim == 0 || self.hidden_size == 0 {
            return Err(ConfigError::Invalid(
                "latent_dim and hidden_size must be positive".into(),
            ));
        }
        LatentLoss::from_name(&self.loss_function)
            .ok_or_else(|| ConfigError::UnknownLoss(self.loss_function.clone()))
    }

    /// Index paths relative to `model_dir` are resolved against it.
    pub fn resolve(&self, model_dir: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            model_dir.join(path)
        }
    }
}

fn default_mean_file() -> String {
    "mean.npy".to_string()
}

fn default_std_file() -> String {
    "std.npy".to_string()
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = TrainConfig::load(dir.path()).unwrap();
        assert_eq!(config, TrainConfig::default());
        assert_eq!(config.validate().unwrap(), LatentLoss::Mse);
    }

    #[test]
    fn partial_file_overrides_fields() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "epochs = 3\nloss_function = \"l1_loss\"\nbackend = \"wgpu\"\n\n[normalization]\ndir = \"stats\"\n",
        )
        .unwrap();
        let config = TrainConfig::load(dir.path()).unwrap();
        assert_eq!(config.epochs, 3);
        assert_eq!(config.backend, BackendKind::Wgpu);
        assert_eq!(config.batch_size, 100);
        let normalization = config.normalization.as_ref().unwrap();
        assert_eq!(normalization.mean_file, "mean.npy");
        assert_eq!(config.validate().unwrap(), LatentLoss::L1);
    }

    #[test]
    fn unknown_loss_is_rejected() {
        let config = TrainConfig {
            loss_function: "hinge".into(),
            ..TrainConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::UnknownLoss(name)) if name == "hinge"));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let config = TrainConfig {
            epochs: 7,
            seed: 42,
            ..TrainConfig::default()
        };
        config.save(dir.path()).unwrap();
        assert_eq!(TrainConfig::load(dir.path()).unwrap(), config);
    }
}
