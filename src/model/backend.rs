//! Compute backend selection for training.

use std::env;
use std::sync::OnceLock;

#[cfg(target_os = "macos")]
use burn::backend::wgpu::graphics::Metal;
#[cfg(not(target_os = "macos"))]
use burn::backend::wgpu::graphics::Vulkan;
use burn::backend::wgpu::{self, WgpuDevice};
use burn::backend::{Autodiff, NdArray};
#[cfg(feature = "rirnet-cuda")]
use burn::backend::{Cuda, cuda::CudaDevice};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Environment variable overriding the configured backend.
pub const BACKEND_ENV: &str = "RIRNET_BACKEND";

pub type CpuBackend = Autodiff<NdArray>;
pub type WgpuBackend = Autodiff<wgpu::Wgpu>;
#[cfg(feature = "rirnet-cuda")]
pub type CudaBackend = Autodiff<Cuda>;
#[cfg(feature = "rirnet-cuda")]
pub type CudaTrainDevice = CudaDevice;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Cpu,
    Wgpu,
    #[cfg(feature = "rirnet-cuda")]
    Cuda,
}

impl BackendKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cpu" | "ndarray" => Some(Self::Cpu),
            "wgpu" | "vulkan" | "metal" => Some(Self::Wgpu),
            #[cfg(feature = "rirnet-cuda")]
            "cuda" => Some(Self::Cuda),
            _ => None,
        }
    }
}

/// `RIRNET_BACKEND` when set and recognized, otherwise `configured`.
pub fn resolve_backend(configured: BackendKind) -> BackendKind {
    match env::var(BACKEND_ENV) {
        Ok(value) if !value.trim().is_empty() => BackendKind::parse(&value).unwrap_or_else(|| {
            warn!("Unknown backend '{value}', using {configured:?}.");
            configured
        }),
        _ => configured,
    }
}

/// One-time WGPU runtime setup for `device`.
pub fn init_wgpu(device: &WgpuDevice) {
    static WGPU_INIT: OnceLock<()> = OnceLock::new();
    WGPU_INIT.get_or_init(|| {
        init_cubecl_config();
        #[cfg(target_os = "macos")]
        wgpu::init_setup::<Metal>(device, Default::default());
        #[cfg(not(target_os = "macos"))]
        wgpu::init_setup::<Vulkan>(device, Default::default());
    });
}

/// Share compiled kernels and autotune results across runs.
fn init_cubecl_config() {
    let mut config = cubecl_runtime::config::GlobalConfig::default();
    config.compilation.cache = Some(cubecl_runtime::config::cache::CacheConfig::Global);
    config.autotune.cache = cubecl_runtime::config::cache::CacheConfig::Global;
    let _ = std::panic::catch_unwind(|| cubecl_runtime::config::GlobalConfig::set(config));
}
