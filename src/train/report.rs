//! JSON diagnostic bundle regenerated after every epoch.

use std::path::{Path, PathBuf};

use serde::Serialize;
use time::PrimitiveDateTime;

use super::TrainError;
use super::metrics_log::MetricsHistory;

pub const REPORT_FILE_NAME: &str = "diagnostics.json";

/// First example of a batch's latent codes.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LatentSnapshot {
    pub target: Vec<f32>,
    pub output: Vec<f32>,
}

/// First example of the last evaluation batch. 2-D arrays are stored row by row.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EvalSnapshot {
    pub latent: LatentSnapshot,
    pub target: Vec<Vec<f32>>,
    pub output: Vec<Vec<f32>>,
    pub decoded_target: Vec<Vec<f32>>,
    pub source: Vec<Vec<f32>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LossCurves {
    pub epochs: Vec<usize>,
    pub train_latent: Vec<f32>,
    pub train_output: Vec<f32>,
    pub eval_latent: Vec<f32>,
    pub eval_output: Vec<f32>,
}

impl LossCurves {
    fn from_history(history: &MetricsHistory) -> Self {
        let mut curves = Self::default();
        for row in &history.rows {
            curves.epochs.push(row.epoch);
            curves.train_latent.push(row.train_latent_loss);
            curves.train_output.push(row.train_output_loss);
            curves.eval_latent.push(row.eval_latent_loss);
            curves.eval_output.push(row.eval_output_loss);
        }
        curves
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrainedTime {
    pub hours: i64,
    pub minutes: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiagnosticReport {
    pub loss_function: String,
    pub trained_for: TrainedTime,
    pub losses: LossCurves,
    pub train_latent: LatentSnapshot,
    pub eval: EvalSnapshot,
}

impl DiagnosticReport {
    pub fn build(
        loss_function: &str,
        history: &MetricsHistory,
        now: PrimitiveDateTime,
        train_latent: LatentSnapshot,
        eval: EvalSnapshot,
    ) -> Self {
        let total = history.total_training_time(now);
        Self {
            loss_function: loss_function.to_string(),
            trained_for: TrainedTime {
                hours: total.whole_hours(),
                minutes: total.whole_minutes() % 60,
            },
            losses: LossCurves::from_history(history),
            train_latent,
            eval,
        }
    }

    pub fn write(&self, model_dir: &Path) -> Result<PathBuf, TrainError> {
        let path = model_dir.join(REPORT_FILE_NAME);
        let text = serde_json::to_string_pretty(self).map_err(TrainError::ReportFormat)?;
        std::fs::write(&path, text).map_err(|source| TrainError::ReportIo {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
