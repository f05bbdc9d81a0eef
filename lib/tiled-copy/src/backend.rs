// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Runtime selection.

use std::sync::Arc;

use anyhow::{Context, Result};
use tilecopy_memory::{AcceleratorRuntime, SimRuntime};

use crate::config::{Backend, BenchConfig};

/// Open the runtime named by `config.backend`.
pub fn open_runtime(config: &BenchConfig) -> Result<Arc<dyn AcceleratorRuntime>> {
    match config.backend {
        Backend::Sim => {
            let runtime = SimRuntime::new(config.sim_config())
                .context("failed to start the reference runtime")?;
            Ok(Arc::new(runtime))
        }
        Backend::Cuda => open_cuda(config.device),
    }
}

#[cfg(feature = "cuda")]
fn open_cuda(device: usize) -> Result<Arc<dyn AcceleratorRuntime>> {
    let runtime = tilecopy_memory::CudaRuntime::new(device)
        .with_context(|| format!("failed to open CUDA device {device}"))?;
    Ok(Arc::new(runtime))
}

#[cfg(not(feature = "cuda"))]
fn open_cuda(_device: usize) -> Result<Arc<dyn AcceleratorRuntime>> {
    anyhow::bail!("the cuda backend requires building with the `cuda` feature")
}
