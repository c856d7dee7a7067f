//! Trains the latent extractor for a model directory, resuming when
//! checkpoints exist. Ctrl-C ends the run after the current epoch.

use std::path::PathBuf;

use rirnet::config::TrainConfig;
use rirnet::logging;
use rirnet::model::backend::{self, BackendKind, CpuBackend, WgpuBackend};
use rirnet::train::{RunOutcome, StopFlag, install_sigint_handler, run_session};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if !options.model_dir.is_dir() {
        return Err(format!(
            "Model path is not a directory: {}",
            options.model_dir.display()
        ));
    }
    let mut config = TrainConfig::load(&options.model_dir).map_err(|err| err.to_string())?;
    if let Some(epochs) = options.epochs {
        config.epochs = epochs;
    }
    config.validate().map_err(|err| err.to_string())?;

    if let Err(err) = logging::init(&logging::log_dir(&options.model_dir)) {
        eprintln!("File logging unavailable: {err}");
    }

    let stop = StopFlag::new();
    if !install_sigint_handler(&stop) {
        tracing::warn!("Ctrl-C will terminate without a final checkpoint");
    }

    let backend = backend::resolve_backend(config.backend);
    tracing::info!("Training on {backend:?} backend");
    let outcome = match backend {
        BackendKind::Cpu => {
            run_session::<CpuBackend>(&options.model_dir, &config, Default::default(), &stop)
        }
        BackendKind::Wgpu => {
            let device = Default::default();
            backend::init_wgpu(&device);
            run_session::<WgpuBackend>(&options.model_dir, &config, device, &stop)
        }
        #[cfg(feature = "rirnet-cuda")]
        BackendKind::Cuda => run_session::<backend::CudaBackend>(
            &options.model_dir,
            &config,
            backend::CudaTrainDevice::default(),
            &stop,
        ),
    }
    .map_err(|err| err.to_string())?;

    match outcome {
        RunOutcome::Completed { epoch } => println!("Training finished at epoch {epoch}"),
        RunOutcome::Interrupted { epoch } => {
            println!("Training interrupted, checkpoint saved at epoch {epoch}")
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    model_dir: PathBuf,
    epochs: Option<usize>,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut model_dir: Option<PathBuf> = None;
    let mut epochs = None;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--epochs" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--epochs requires a value".to_string())?;
                epochs = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --epochs value: {value}"))?,
                );
            }
            flag if flag.starts_with("--") => {
                return Err(format!("Unknown argument: {flag}\n\n{}", help_text()));
            }
            path => {
                if model_dir.is_some() {
                    return Err(format!("Unexpected argument: {path}\n\n{}", help_text()));
                }
                model_dir = Some(PathBuf::from(path));
            }
        }
        idx += 1;
    }

    let model_dir = model_dir.ok_or_else(help_text)?;
    Ok(CliOptions { model_dir, epochs })
}

fn help_text() -> String {
    [
        "rirnet-train-extractor",
        "",
        "Trains the latent extractor against a frozen autoencoder.",
        "Reads <model_dir>/config.toml and resumes from the newest checkpoint.",
        "",
        "Usage:",
        "  rirnet-train-extractor <model_dir> [--epochs <n>]",
        "",
        "Options:",
        "  --epochs <n>   Override the last epoch from config.toml.",
        "",
        "Environment:",
        "  RIRNET_BACKEND   cpu | wgpu (overrides config.toml)",
        "  RUST_LOG         Log filter (default info)",
    ]
    .join("\n")
}
