//! Host accelerator detection.
//!
//! NVIDIA memory comes from `nvidia-smi`. On macOS the GPU shares unified
//! memory with the CPU and roughly three quarters of RAM is usable by it.

use std::process::Command;

use ggchat_core::ports::accelerator::{AcceleratorError, AcceleratorProbe};
use sysinfo::System;
use tracing::debug;

/// Probe backed by vendor tools and `sysinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAcceleratorProbe;

impl DefaultAcceleratorProbe {
    pub const fn new() -> Self {
        Self
    }
}

impl AcceleratorProbe for DefaultAcceleratorProbe {
    fn is_available(&self) -> bool {
        cfg!(target_os = "macos") || nvidia_vram_bytes().is_some()
    }

    fn total_memory_bytes(&self) -> Result<u64, AcceleratorError> {
        if cfg!(target_os = "macos") {
            let mut sys = System::new();
            sys.refresh_memory();
            return Ok(unified_memory_share(sys.total_memory()));
        }
        nvidia_vram_bytes()
            .ok_or_else(|| AcceleratorError::Detection("nvidia-smi reported no GPU".to_string()))
    }
}

/// First GPU's total VRAM via `nvidia-smi`, in bytes.
fn nvidia_vram_bytes() -> Option<u64> {
    let output = Command::new("nvidia-smi")
        .args(["--query-gpu=memory.total", "--format=csv,noheader,nounits"])
        .output()
        .map_err(|e| debug!(error = %e, "nvidia-smi not runnable"))
        .ok()?;

    if !output.status.success() {
        return None;
    }
    parse_nvidia_smi_mib(&String::from_utf8_lossy(&output.stdout))
}

/// Parse the first line of `memory.total` output (MiB) into bytes.
fn parse_nvidia_smi_mib(stdout: &str) -> Option<u64> {
    let mib: u64 = stdout.lines().next()?.trim().parse().ok()?;
    mib.checked_mul(1024 * 1024)
}

const fn unified_memory_share(total_ram: u64) -> u64 {
    total_ram / 4 * 3
}
