// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Accelerator runtime boundary for tiled host/device copies.
//!
//! This crate provides:
//! - [`AcceleratorRuntime`]: the capability set consumed by the copy engine
//! - [`Status`]: the status table every runtime call resolves to
//! - [`DeviceAllocation`] and [`HostBuffer`]: owned memory on either side
//! - [`SimRuntime`]: a reference runtime on host memory and copy threads
//! - `CudaRuntime` (feature `cuda`): the same boundary over the CUDA driver

pub mod device;
pub mod error;
pub mod host;
pub mod runtime;
pub mod sim;
pub mod status;

#[cfg(feature = "cuda")]
pub mod cuda;

pub use device::DeviceAllocation;
pub use error::{Result, RuntimeError};
pub use host::HostBuffer;
pub use runtime::{
    AcceleratorRuntime, CopyEndpoint, DevicePtr, EventHandle, EventPoolHandle, EventStatus,
    MemoryKind, MemoryModuleState, Region,
};
pub use sim::{SimConfig, SimConfigBuilder, SimRuntime};
pub use status::Status;

#[cfg(feature = "cuda")]
pub use cuda::CudaRuntime;
