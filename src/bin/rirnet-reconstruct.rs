//! Renders an impulse response WAV from a `[n, 2]` peak encoding.

use std::path::PathBuf;

use rirnet::acoustics::save_wav;
use rirnet::dataset::load_array;
use rirnet::reconstruct::{PeakEncoding, reconstruct};

const DEFAULT_RATE: u32 = 44_100;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let values = load_array(&options.peaks).map_err(|err| err.to_string())?;
    let encoding = PeakEncoding::from_array(&values).map_err(|err| err.to_string())?;
    let rir = reconstruct(&encoding);
    if rir.is_empty() {
        return Err(format!(
            "Peak encoding {} produced an empty impulse response",
            options.peaks.display()
        ));
    }
    save_wav(&options.out, &rir, options.rate, true).map_err(|err| err.to_string())?;
    println!(
        "Wrote {} samples ({} peaks) to {}",
        rir.len(),
        encoding.len(),
        options.out.display()
    );
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    peaks: PathBuf,
    out: PathBuf,
    rate: u32,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut peaks: Option<PathBuf> = None;
    let mut out: Option<PathBuf> = None;
    let mut rate = DEFAULT_RATE;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--peaks" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--peaks requires a value".to_string())?;
                peaks = Some(PathBuf::from(value));
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                out = Some(PathBuf::from(value));
            }
            "--rate" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--rate requires a value".to_string())?;
                rate = value
                    .parse::<u32>()
                    .ok()
                    .filter(|rate| *rate > 0)
                    .ok_or_else(|| format!("Invalid --rate value: {value}"))?;
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    Ok(CliOptions {
        peaks: peaks.ok_or_else(help_text)?,
        out: out.ok_or_else(help_text)?,
        rate,
    })
}

fn help_text() -> String {
    [
        "rirnet-reconstruct",
        "",
        "Synthesizes an impulse response from a peak encoding (.npy).",
        "",
        "Usage:",
        "  rirnet-reconstruct --peaks <file.npy> --out <file.wav> [--rate <n>]",
        "",
        "Options:",
        "  --peaks <file>   [n, 2] or [2, n] array of (time, log amplitude) (required).",
        "  --out <file>     Output WAV path (required).",
        "  --rate <n>       Output sample rate (default 44100).",
    ]
    .join("\n")
}
