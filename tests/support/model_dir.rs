//! Builds a model directory with paired `.npy` samples, CSV indices and
//! frozen autoencoder weights.

use std::fs;
use std::path::Path;

use burn::backend::NdArray;
use ndarray::Array2;
use rirnet::config::TrainConfig;
use rirnet::dataset::save_array;
use rirnet::model::DenseAutoencoderConfig;
use rirnet::train::CheckpointStore;
use rirnet::train::checkpoint::AUTOENCODER_STEM;

pub const SOURCE_SHAPE: (usize, usize) = (4, 6);
pub const TARGET_SHAPE: (usize, usize) = (2, 5);
pub const HIDDEN: usize = 8;
pub const LATENT: usize = 3;

/// Strictly positive source so `-ln(x)` stays finite.
fn source_array(seed: usize) -> Array2<f32> {
    Array2::from_shape_fn(SOURCE_SHAPE, |(r, c)| {
        0.05 + ((seed * 7 + r * 3 + c) % 17) as f32 / 20.0
    })
}

fn target_array(seed: usize) -> Array2<f32> {
    Array2::from_shape_fn(TARGET_SHAPE, |(r, c)| {
        1.0 + ((seed + r * 5 + c * 2) % 11) as f32
    })
}

fn write_split(dir: &Path, name: &str, samples: usize) {
    let data_dir = dir.join("data").join(name);
    fs::create_dir_all(&data_dir).expect("create data dir");
    let mut csv = String::from("data,target\n");
    for i in 0..samples {
        let data = data_dir.join(format!("{i}_data.npy"));
        let target = data_dir.join(format!("{i}_target.npy"));
        save_array(&data, &source_array(i)).expect("write source npy");
        save_array(&target, &target_array(i)).expect("write target npy");
        csv.push_str(&format!("{},{}\n", data.display(), target.display()));
    }
    fs::write(dir.join(format!("{name}.csv")), csv).expect("write index");
}

/// Default config shrunk to the fixture shapes.
pub fn small_config(epochs: usize) -> TrainConfig {
    TrainConfig {
        train_index: "train.csv".into(),
        eval_index: "eval.csv".into(),
        epochs,
        batch_size: 3,
        log_interval: 1,
        hidden_size: HIDDEN,
        latent_dim: LATENT,
        seed: 7,
        ..TrainConfig::default()
    }
}

/// Write samples, indices and autoencoder weights; returns the config written.
pub fn prepare(dir: &Path, train: usize, eval: usize, epochs: usize) -> TrainConfig {
    write_split(dir, "train", train);
    write_split(dir, "eval", eval);
    write_autoencoder(dir, 12);
    let config = small_config(epochs);
    config.save(dir).expect("write config");
    config
}

pub fn write_autoencoder(dir: &Path, epoch: usize) {
    let device = Default::default();
    let autoencoder = DenseAutoencoderConfig::new(TARGET_SHAPE.0, TARGET_SHAPE.1)
        .with_hidden_size(HIDDEN)
        .with_latent_dim(LATENT)
        .init::<NdArray>(&device);
    CheckpointStore::new(dir)
        .save_module::<NdArray, _>(epoch, AUTOENCODER_STEM, &autoencoder)
        .expect("save autoencoder");
}
