//! Append-only CSV history of epoch losses and session markers.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

use super::TrainError;

pub const METRICS_FILE_NAME: &str = "loss_over_epochs_ex.csv";
const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const STARTED: &str = "started";
const STOPPED: &str = "stopped";

/// Epoch-level losses as written to one CSV row.
#[derive(Clone, Debug, PartialEq)]
pub struct EpochRow {
    pub epoch: usize,
    pub train_latent_loss: f32,
    pub train_output_loss: f32,
    pub eval_output_loss: f32,
    pub eval_latent_loss: f32,
    pub timestamp: PrimitiveDateTime,
}

/// Numeric rows plus session bracketing, parsed from the CSV.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricsHistory {
    pub rows: Vec<EpochRow>,
    pub session_starts: Vec<PrimitiveDateTime>,
    pub session_stops: Vec<PrimitiveDateTime>,
}

impl MetricsHistory {
    /// Sum of closed sessions plus the open one up to `now`.
    pub fn total_training_time(&self, now: PrimitiveDateTime) -> Duration {
        let closed: Duration = self
            .session_stops
            .iter()
            .zip(&self.session_starts)
            .map(|(stop, start)| *stop - *start)
            .sum();
        let open = if self.session_starts.len() > self.session_stops.len() {
            self.session_starts
                .last()
                .map(|start| now - *start)
                .unwrap_or(Duration::ZERO)
        } else {
            Duration::ZERO
        };
        closed + open
    }
}

#[derive(Clone, Debug)]
pub struct MetricsLog {
    path: PathBuf,
}

impl MetricsLog {
    pub fn in_dir(model_dir: &Path) -> Self {
        Self {
            path: model_dir.join(METRICS_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mark_started(&self, at: PrimitiveDateTime) -> Result<(), TrainError> {
        self.append_marker(STARTED, at)
    }

    pub fn mark_stopped(&self, at: PrimitiveDateTime) -> Result<(), TrainError> {
        self.append_marker(STOPPED, at)
    }

    pub fn append_epoch(&self, row: &EpochRow) -> Result<(), TrainError> {
        let line = format!(
            "{},{},{},{},{},{}",
            row.epoch,
            row.train_latent_loss,
            row.train_output_loss,
            row.eval_output_loss,
            row.eval_latent_loss,
            format_timestamp(row.timestamp)?
        );
        self.append_line(&line)
    }

    /// Parse the whole file; a missing file is an empty history.
    pub fn read_history(&self) -> Result<MetricsHistory, TrainError> {
        if !self.path.exists() {
            return Ok(MetricsHistory::default());
        }
        let text = std::fs::read_to_string(&self.path).map_err(|source| TrainError::MetricsIo {
            path: self.path.clone(),
            source,
        })?;
        let mut history = MetricsHistory::default();
        for line in text.lines().filter(|line| !line.trim().is_empty()) {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let [epoch, train_latent, train_output, eval_output, eval_latent, timestamp] =
                fields.as_slice()
            else {
                continue;
            };
            let Ok(timestamp) = PrimitiveDateTime::parse(timestamp, TIMESTAMP_FORMAT) else {
                continue;
            };
            match *epoch {
                STARTED => history.session_starts.push(timestamp),
                STOPPED => history.session_stops.push(timestamp),
                _ => {
                    let parsed = (
                        epoch.parse::<usize>(),
                        train_latent.parse::<f32>(),
                        train_output.parse::<f32>(),
                        eval_output.parse::<f32>(),
                        eval_latent.parse::<f32>(),
                    );
                    if let (Ok(epoch), Ok(tl), Ok(to), Ok(eo), Ok(el)) = parsed {
                        history.rows.push(EpochRow {
                            epoch,
                            train_latent_loss: tl,
                            train_output_loss: to,
                            eval_output_loss: eo,
                            eval_latent_loss: el,
                            timestamp,
                        });
                    }
                }
            }
        }
        Ok(history)
    }

    fn append_marker(&self, marker: &str, at: PrimitiveDateTime) -> Result<(), TrainError> {
        let line = format!(
            "{marker},{marker},{marker},{marker},{marker},{}",
            format_timestamp(at)?
        );
        self.append_line(&line)
    }

    fn append_line(&self, line: &str) -> Result<(), TrainError> {
        let io_err = |source| TrainError::MetricsIo {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        writeln!(file, "{line}").map_err(io_err)
    }
}

/// Local wall-clock time without offset, as stored in the CSV.
pub fn now_timestamp() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    PrimitiveDateTime::new(now.date(), now.time())
}

fn format_timestamp(at: PrimitiveDateTime) -> Result<String, TrainError> {
    at.format(TIMESTAMP_FORMAT).map_err(TrainError::Timestamp)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use time::macros::datetime;

    use super::*;

    fn row(epoch: usize, at: PrimitiveDateTime) -> EpochRow {
        EpochRow {
            epoch,
            train_latent_loss: 0.5,
            train_output_loss: 1.25,
            eval_output_loss: 2.0,
            eval_latent_loss: 0.75,
            timestamp: at,
        }
    }

    #[test]
    fn markers_are_filtered_from_numeric_rows() {
        let dir = tempdir().unwrap();
        let log = MetricsLog::in_dir(dir.path());
        log.mark_started(datetime!(2024-01-01 10:00:00)).unwrap();
        log.append_epoch(&row(1, datetime!(2024-01-01 10:05:00))).unwrap();
        log.append_epoch(&row(2, datetime!(2024-01-01 10:10:00))).unwrap();
        log.mark_stopped(datetime!(2024-01-01 10:30:00)).unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        assert!(text.starts_with("started,started,started,started,started,2024-01-01 10:00:00\n"));

        let history = log.read_history().unwrap();
        assert_eq!(history.rows.len(), 2);
        assert_eq!(history.rows[1], row(2, datetime!(2024-01-01 10:10:00)));
        assert_eq!(history.session_starts.len(), 1);
        assert_eq!(history.session_stops.len(), 1);
    }

    #[test]
    fn total_time_counts_closed_and_open_sessions() {
        let history = MetricsHistory {
            rows: Vec::new(),
            session_starts: vec![datetime!(2024-01-01 10:00:00), datetime!(2024-01-02 08:00:00)],
            session_stops: vec![datetime!(2024-01-01 11:30:00)],
        };
        let total = history.total_training_time(datetime!(2024-01-02 08:45:00));
        assert_eq!(total, Duration::minutes(135));
    }

    #[test]
    fn missing_file_is_empty_history() {
        let dir = tempdir().unwrap();
        let history = MetricsLog::in_dir(dir.path()).read_history().unwrap();
        assert!(history.rows.is_empty());
    }
}
