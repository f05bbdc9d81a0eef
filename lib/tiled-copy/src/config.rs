// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Configuration of a benchmark run.

use std::fmt;
use std::str::FromStr;

use derive_builder::Builder;
use tilecopy_memory::SimConfig;

use crate::error::TransferError;
use crate::geometry::{HostLayout, MAX_TILES, TileGeometry, TileShape};
use crate::poller::DEFAULT_RETRY_BUDGET;

/// Runtime the benchmark runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// In-process reference runtime.
    #[default]
    Sim,
    /// CUDA driver (requires the `cuda` feature).
    Cuda,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Sim => f.write_str("sim"),
            Backend::Cuda => f.write_str("cuda"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sim" => Ok(Backend::Sim),
            "cuda" => Ok(Backend::Cuda),
            other => Err(format!("unknown backend `{other}`")),
        }
    }
}

/// Benchmark configuration.
///
/// # Example
/// ```ignore
/// let config = BenchConfig::builder()
///     .tile_count(8)
///     .layout(HostLayout::Stacked)
///     .build()?;
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(pattern = "owned")]
pub struct BenchConfig {
    /// Number of tiles, 1..=[`MAX_TILES`].
    #[builder(default = "4")]
    pub tile_count: usize,

    /// Tile width in elements.
    #[builder(default = "512")]
    pub tile_width: u32,

    /// Tile height in rows.
    #[builder(default = "512")]
    pub tile_height: u32,

    /// Queries per tile in one poller pass.
    #[builder(default = "DEFAULT_RETRY_BUDGET")]
    pub retry_budget: u32,

    #[builder(default)]
    pub layout: HostLayout,

    #[builder(default)]
    pub backend: Backend,

    /// Device ordinal for the CUDA backend.
    #[builder(default = "0")]
    pub device: usize,

    /// Copy engine threads of the reference runtime.
    #[builder(default = "4")]
    pub copy_engines: usize,

    /// Make the reference runtime reject the copy with this 0-based issue
    /// sequence number. In the first pass this is the tile index.
    #[builder(default, setter(strip_option))]
    pub fail_dispatch_at: Option<u64>,

    /// Make the reference runtime corrupt the copy with this 0-based issue
    /// sequence number.
    #[builder(default, setter(strip_option))]
    pub corrupt_copy_at: Option<u64>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            tile_count: 4,
            tile_width: 512,
            tile_height: 512,
            retry_budget: DEFAULT_RETRY_BUDGET,
            layout: HostLayout::default(),
            backend: Backend::default(),
            device: 0,
            copy_engines: 4,
            fail_dispatch_at: None,
            corrupt_copy_at: None,
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl BenchConfig {
    pub fn builder() -> BenchConfigBuilder {
        BenchConfigBuilder::default()
    }

    /// Create config from environment variables.
    ///
    /// Environment variables:
    /// - `TILECOPY_TILE_WIDTH`: Tile width in elements (default: 512)
    /// - `TILECOPY_TILE_HEIGHT`: Tile height in rows (default: 512)
    /// - `TILECOPY_RETRY_BUDGET`: Queries per tile per poller pass (default: 16)
    /// - `TILECOPY_LAYOUT`: `side-by-side` or `stacked` (default: side-by-side)
    /// - `TILECOPY_BACKEND`: `sim` or `cuda` (default: sim)
    /// - `TILECOPY_CUDA_DEVICE`: CUDA device ordinal (default: 0)
    /// - `TILECOPY_SIM_ENGINES`: Reference runtime copy engines (default: 4)
    /// - `TILECOPY_SIM_FAIL_DISPATCH`: Copy issue to reject (default: none)
    /// - `TILECOPY_SIM_CORRUPT_COPY`: Copy issue to corrupt (default: none)
    ///
    /// Unparseable values fall back to the default. The tile count is not
    /// read from the environment.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tile_count: defaults.tile_count,
            tile_width: env_parse("TILECOPY_TILE_WIDTH").unwrap_or(defaults.tile_width),
            tile_height: env_parse("TILECOPY_TILE_HEIGHT").unwrap_or(defaults.tile_height),
            retry_budget: env_parse("TILECOPY_RETRY_BUDGET").unwrap_or(defaults.retry_budget),
            layout: env_parse("TILECOPY_LAYOUT").unwrap_or(defaults.layout),
            backend: env_parse("TILECOPY_BACKEND").unwrap_or(defaults.backend),
            device: env_parse("TILECOPY_CUDA_DEVICE").unwrap_or(defaults.device),
            copy_engines: env_parse("TILECOPY_SIM_ENGINES").unwrap_or(defaults.copy_engines),
            fail_dispatch_at: env_parse("TILECOPY_SIM_FAIL_DISPATCH"),
            corrupt_copy_at: env_parse("TILECOPY_SIM_CORRUPT_COPY"),
        }
    }

    /// Clamp a requested tile count to [`MAX_TILES`].
    pub fn clamp_tile_count(requested: u64) -> usize {
        requested.min(MAX_TILES as u64) as usize
    }

    /// Set the tile count, clamped to [`MAX_TILES`].
    pub fn with_tile_count(mut self, requested: u64) -> Self {
        let clamped = Self::clamp_tile_count(requested);
        if clamped as u64 != requested {
            tracing::debug!(requested, clamped, "tile count clamped");
        }
        self.tile_count = clamped;
        self
    }

    pub fn with_layout(mut self, layout: HostLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn validate(&self) -> Result<(), TransferError> {
        if self.tile_count == 0 {
            return Err(TransferError::Usage("tile count must be at least 1".into()));
        }
        if self.tile_count > MAX_TILES {
            return Err(TransferError::Config(format!(
                "tile count {} exceeds the maximum of {MAX_TILES}",
                self.tile_count
            )));
        }
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(TransferError::Config(format!(
                "tile dimensions {}x{} must be non-zero",
                self.tile_width, self.tile_height
            )));
        }
        if self.copy_engines == 0 {
            return Err(TransferError::Config("copy engines must be at least 1".into()));
        }
        Ok(())
    }

    /// Tile geometry for elements of type `T`.
    pub fn geometry<T>(&self) -> Result<TileGeometry, TransferError> {
        self.validate()?;
        let shape = TileShape::of::<T>(self.tile_width, self.tile_height);
        Ok(TileGeometry::new(shape, self.tile_count, self.layout)?)
    }

    /// Reference runtime settings derived from this config.
    pub fn sim_config(&self) -> SimConfig {
        SimConfig {
            copy_engines: self.copy_engines.max(1),
            fail_copy_at: self.fail_dispatch_at,
            corrupt_copy_at: self.corrupt_copy_at,
            ..SimConfig::default()
        }
    }
}
