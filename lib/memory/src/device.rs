// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Device memory allocations owned by the host process.

use std::sync::Arc;

use crate::error::{Result, RuntimeError};
use crate::runtime::{AcceleratorRuntime, CopyEndpoint, DevicePtr, Region};
use crate::status::Status;

/// A resident device allocation, released when dropped.
#[derive(Debug)]
pub struct DeviceAllocation {
    ptr: DevicePtr,
    len: usize,
    runtime: Arc<dyn AcceleratorRuntime>,
}

impl DeviceAllocation {
    /// Allocate `len` bytes aligned to `alignment` and make them resident.
    ///
    /// # Errors
    /// Returns an error if:
    /// - `len` is 0
    /// - the runtime refuses the allocation
    /// - the allocation cannot be made resident (it is released again)
    pub fn new(runtime: Arc<dyn AcceleratorRuntime>, len: usize, alignment: usize) -> Result<Self> {
        if len == 0 {
            return Err(RuntimeError::new("alloc_device", Status::InvalidSize));
        }

        let ptr = runtime.alloc_device(len, alignment)?;
        if let Err(e) = runtime.make_resident(ptr, len) {
            if let Err(free_err) = runtime.free_device(ptr) {
                tracing::warn!("failed to release non-resident allocation {ptr}: {free_err}");
            }
            return Err(e);
        }

        tracing::trace!(ptr = %ptr, len, alignment, "device allocation");
        Ok(Self { ptr, len, runtime })
    }

    pub fn ptr(&self) -> DevicePtr {
        self.ptr
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy endpoint addressing `region` at the start of this allocation.
    pub fn endpoint(&self, pitch: usize, region: Region) -> CopyEndpoint {
        CopyEndpoint::device(self.ptr, pitch, region)
    }

    /// Free the allocation now, reporting failure instead of logging it.
    pub fn release(mut self) -> Result<()> {
        let ptr = std::mem::replace(&mut self.ptr, DevicePtr::new(0));
        self.len = 0;
        self.runtime.free_device(ptr)
    }

    /// Returns true when the two allocations share at least one byte.
    pub fn overlaps(&self, other: &DeviceAllocation) -> bool {
        let a = self.ptr.addr()..self.ptr.addr() + self.len as u64;
        let b = other.ptr.addr()..other.ptr.addr() + other.len as u64;
        a.start < b.end && b.start < a.end
    }
}

impl Drop for DeviceAllocation {
    fn drop(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        if let Err(e) = self.runtime.free_device(self.ptr) {
            tracing::warn!("failed to free device allocation {}: {e}", self.ptr);
        }
    }
}
