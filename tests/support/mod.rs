#![allow(dead_code)]

pub mod model_dir;
pub mod wav;
