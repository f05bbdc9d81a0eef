// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! [`AcceleratorRuntime`] over the CUDA driver API.
//!
//! Copies are issued with `cuMemcpy2DAsync` on one stream and followed by a
//! `cuEventRecord` of the copy's event. Recording an event replaces its
//! previous state, so a host reset only has to validate the handle.

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cudarc::driver::sys::{self, CUresult};
use cudarc::driver::{CudaContext, CudaStream};
use parking_lot::Mutex;

use crate::error::{Result, RuntimeError};
use crate::runtime::{
    AcceleratorRuntime, CopyEndpoint, DevicePtr, EventHandle, EventPoolHandle, EventStatus,
    MemoryKind, MemoryModuleState,
};
use crate::status::Status;

/// Alignment `cuMemAlloc` already guarantees.
const DRIVER_ALIGNMENT: usize = 256;

/// Map a driver result onto the status table.
pub fn status_from_cu(result: CUresult) -> Status {
    match result {
        CUresult::CUDA_SUCCESS => Status::Success,
        CUresult::CUDA_ERROR_NOT_READY => Status::NotReady,
        CUresult::CUDA_ERROR_OUT_OF_MEMORY => Status::OutOfDeviceMemory,
        CUresult::CUDA_ERROR_INVALID_VALUE => Status::InvalidArgument,
        CUresult::CUDA_ERROR_INVALID_HANDLE => Status::InvalidNullHandle,
        CUresult::CUDA_ERROR_NOT_INITIALIZED | CUresult::CUDA_ERROR_DEINITIALIZED => {
            Status::Uninitialized
        }
        CUresult::CUDA_ERROR_NOT_SUPPORTED => Status::UnsupportedFeature,
        CUresult::CUDA_ERROR_NO_DEVICE | CUresult::CUDA_ERROR_INVALID_DEVICE => {
            Status::NotAvailable
        }
        CUresult::CUDA_ERROR_ILLEGAL_ADDRESS | CUresult::CUDA_ERROR_LAUNCH_FAILED => {
            Status::DeviceLost
        }
        other => Status::Unrecognized(other as u32),
    }
}

fn check(op: &'static str, result: CUresult) -> Result<()> {
    status_from_cu(result).check(op)
}

#[derive(Debug, Clone, Copy)]
struct RawAllocation {
    raw: u64,
    size: usize,
}

/// CUDA implementation of [`AcceleratorRuntime`].
pub struct CudaRuntime {
    ctx: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    next_handle: AtomicU64,
    allocations: Mutex<HashMap<u64, RawAllocation>>,
    pools: Mutex<HashMap<u64, Vec<bool>>>,
    // CUevent stored as usize so the map stays Send.
    events: Mutex<HashMap<u64, (u64, u32, usize)>>,
}

// SAFETY: the driver handles held here are only used with the owning context
// bound to the calling thread.
unsafe impl Send for CudaRuntime {}
unsafe impl Sync for CudaRuntime {}

impl std::fmt::Debug for CudaRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaRuntime")
            .field("device", &self.ctx.cu_device())
            .field("allocations", &self.allocations.lock().len())
            .finish()
    }
}

impl CudaRuntime {
    /// Bind to device `ordinal` and create the command stream.
    ///
    /// # Errors
    /// Returns an error if the driver or the device is unavailable.
    pub fn new(ordinal: usize) -> Result<Self> {
        let ctx = CudaContext::new(ordinal)
            .map_err(|e| RuntimeError::new("init", status_from_cu(e.0)))?;
        let stream = ctx
            .new_stream()
            .map_err(|e| RuntimeError::new("create_command_list", status_from_cu(e.0)))?;

        tracing::debug!(ordinal, "CUDA runtime initialized");
        Ok(Self {
            ctx,
            stream,
            next_handle: AtomicU64::new(1),
            allocations: Mutex::new(HashMap::new()),
            pools: Mutex::new(HashMap::new()),
            events: Mutex::new(HashMap::new()),
        })
    }

    fn bind(&self, op: &'static str) -> Result<()> {
        self.ctx
            .bind_to_thread()
            .map_err(|e| RuntimeError::new(op, status_from_cu(e.0)))
    }

    fn cu_event(&self, op: &'static str, event: EventHandle) -> Result<sys::CUevent> {
        self.events
            .lock()
            .get(&event.raw())
            .map(|(_, _, ev)| *ev as sys::CUevent)
            .ok_or_else(|| RuntimeError::new(op, Status::InvalidNullHandle))
    }
}

fn memory_type(kind: MemoryKind) -> sys::CUmemorytype {
    match kind {
        MemoryKind::Host => sys::CUmemorytype::CU_MEMORYTYPE_HOST,
        MemoryKind::Device => sys::CUmemorytype::CU_MEMORYTYPE_DEVICE,
    }
}

impl AcceleratorRuntime for CudaRuntime {
    fn name(&self) -> &str {
        "cuda"
    }

    fn alloc_device(&self, size: usize, alignment: usize) -> Result<DevicePtr> {
        const OP: &str = "alloc_device";
        if size == 0 {
            return Err(RuntimeError::new(OP, Status::InvalidSize));
        }
        if alignment != 0 && !alignment.is_power_of_two() {
            return Err(RuntimeError::new(OP, Status::UnsupportedAlignment));
        }
        self.bind(OP)?;

        let padded = if alignment > DRIVER_ALIGNMENT {
            size + alignment
        } else {
            size
        };
        let mut raw: sys::CUdeviceptr = 0;
        check(OP, unsafe { sys::cuMemAlloc_v2(&mut raw, padded) })?;

        let aligned = if alignment > DRIVER_ALIGNMENT {
            let mask = alignment as u64 - 1;
            (raw + mask) & !mask
        } else {
            raw
        };
        self.allocations
            .lock()
            .insert(aligned, RawAllocation { raw, size });
        Ok(DevicePtr::new(aligned))
    }

    fn make_resident(&self, ptr: DevicePtr, size: usize) -> Result<()> {
        // Device allocations are resident from creation; only validate.
        let allocations = self.allocations.lock();
        let alloc = allocations
            .get(&ptr.addr())
            .ok_or_else(|| RuntimeError::new("make_resident", Status::InvalidArgument))?;
        if size > alloc.size {
            return Err(RuntimeError::new("make_resident", Status::InvalidSize));
        }
        Ok(())
    }

    fn free_device(&self, ptr: DevicePtr) -> Result<()> {
        const OP: &str = "free_device";
        let alloc = self
            .allocations
            .lock()
            .remove(&ptr.addr())
            .ok_or_else(|| RuntimeError::new(OP, Status::InvalidArgument))?;
        self.bind(OP)?;
        check(OP, unsafe { sys::cuMemFree_v2(alloc.raw) })
    }

    fn create_event_pool(&self, count: u32) -> Result<EventPoolHandle> {
        if count == 0 {
            return Err(RuntimeError::new("create_event_pool", Status::InvalidSize));
        }
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.pools.lock().insert(handle, vec![false; count as usize]);
        Ok(EventPoolHandle::new(handle))
    }

    fn create_event(&self, pool: EventPoolHandle, index: u32) -> Result<EventHandle> {
        const OP: &str = "create_event";
        let mut pools = self.pools.lock();
        let slot = pools
            .get_mut(&pool.raw())
            .ok_or_else(|| RuntimeError::new(OP, Status::InvalidNullHandle))?
            .get_mut(index as usize)
            .ok_or_else(|| RuntimeError::new(OP, Status::InvalidArgument))?;
        if *slot {
            return Err(RuntimeError::new(OP, Status::HandleObjectInUse));
        }

        self.bind(OP)?;
        let mut event: sys::CUevent = std::ptr::null_mut();
        let flags = sys::CUevent_flags::CU_EVENT_DISABLE_TIMING as u32;
        check(OP, unsafe { sys::cuEventCreate(&mut event, flags) })?;
        *slot = true;

        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.events
            .lock()
            .insert(handle, (pool.raw(), index, event as usize));
        Ok(EventHandle::new(handle))
    }

    fn destroy_event(&self, event: EventHandle) -> Result<()> {
        const OP: &str = "destroy_event";
        let mut pools = self.pools.lock();
        let (pool, index, ev) = self
            .events
            .lock()
            .remove(&event.raw())
            .ok_or_else(|| RuntimeError::new(OP, Status::InvalidNullHandle))?;
        if let Some(slot) = pools.get_mut(&pool).and_then(|p| p.get_mut(index as usize)) {
            *slot = false;
        }
        self.bind(OP)?;
        check(OP, unsafe { sys::cuEventDestroy_v2(ev as sys::CUevent) })
    }

    fn destroy_event_pool(&self, pool: EventPoolHandle) -> Result<()> {
        const OP: &str = "destroy_event_pool";
        let mut pools = self.pools.lock();
        let live = pools
            .get(&pool.raw())
            .ok_or_else(|| RuntimeError::new(OP, Status::InvalidNullHandle))?;
        if live.iter().any(|l| *l) {
            return Err(RuntimeError::new(OP, Status::HandleObjectInUse));
        }
        pools.remove(&pool.raw());
        Ok(())
    }

    fn event_host_reset(&self, event: EventHandle) -> Result<()> {
        self.cu_event("event_host_reset", event).map(|_| ())
    }

    unsafe fn append_copy_region(
        &self,
        dst: &CopyEndpoint,
        src: &CopyEndpoint,
        signal: EventHandle,
        wait: &[EventHandle],
    ) -> Result<()> {
        const OP: &str = "append_copy_region";
        if !wait.is_empty() || src.region.depth > 1 {
            return Err(RuntimeError::new(OP, Status::UnsupportedFeature));
        }
        if !src.region.same_extent(&dst.region) {
            return Err(RuntimeError::new(OP, Status::InvalidArgument));
        }
        let event = self.cu_event(OP, signal)?;
        self.bind(OP)?;

        // SAFETY: CUDA_MEMCPY2D is a plain C struct; zero is a valid value
        // for every field not set below.
        let mut copy: sys::CUDA_MEMCPY2D = unsafe { std::mem::zeroed() };
        copy.srcXInBytes = src.region.origin_x as usize;
        copy.srcY = src.region.origin_y as usize;
        copy.srcMemoryType = memory_type(src.kind);
        copy.srcPitch = src.pitch;
        copy.dstXInBytes = dst.region.origin_x as usize;
        copy.dstY = dst.region.origin_y as usize;
        copy.dstMemoryType = memory_type(dst.kind);
        copy.dstPitch = dst.pitch;
        copy.WidthInBytes = src.region.width as usize;
        copy.Height = src.region.height as usize;

        match src.kind {
            MemoryKind::Host => copy.srcHost = src.addr as *const c_void,
            MemoryKind::Device => copy.srcDevice = src.addr,
        }
        match dst.kind {
            MemoryKind::Host => copy.dstHost = dst.addr as *mut c_void,
            MemoryKind::Device => copy.dstDevice = dst.addr,
        }

        let stream = self.stream.cu_stream();
        check(OP, unsafe { sys::cuMemcpy2DAsync_v2(&copy, stream) })?;
        let recorded = check(OP, unsafe { sys::cuEventRecord(event, stream) });
        if recorded.is_err() {
            // The copy is queued but no event tracks it; finish it here.
            if let Err(e) = check(OP, unsafe { sys::cuStreamSynchronize(stream) }) {
                tracing::warn!("failed to drain unrecorded copy: {e}");
            }
        }
        recorded
    }

    fn event_query_status(&self, event: EventHandle) -> Result<EventStatus> {
        const OP: &str = "event_query_status";
        let event = self.cu_event(OP, event)?;
        self.bind(OP)?;
        match status_from_cu(unsafe { sys::cuEventQuery(event) }) {
            Status::Success => Ok(EventStatus::Ready),
            Status::NotReady => Ok(EventStatus::NotReady),
            status => Err(RuntimeError::new(OP, status)),
        }
    }

    fn synchronize(&self) -> Result<()> {
        self.bind("synchronize")?;
        check("synchronize", unsafe {
            sys::cuStreamSynchronize(self.stream.cu_stream())
        })
    }

    fn memory_modules(&self) -> Result<Vec<MemoryModuleState>> {
        const OP: &str = "memory_modules";
        self.bind(OP)?;
        let (mut free, mut total) = (0usize, 0usize);
        check(OP, unsafe { sys::cuMemGetInfo_v2(&mut free, &mut total) })?;
        Ok(vec![MemoryModuleState {
            module: 0,
            used: (total - free) as u64,
            capacity: total as u64,
        }])
    }
}

impl Drop for CudaRuntime {
    fn drop(&mut self) {
        if let Err(e) = self.synchronize() {
            tracing::warn!("failed to drain CUDA stream: {e}");
        }
        for (_, (_, _, ev)) in self.events.lock().drain() {
            let result = unsafe { sys::cuEventDestroy_v2(ev as sys::CUevent) };
            if result != CUresult::CUDA_SUCCESS {
                tracing::warn!("cuEventDestroy failed with error: {:?}", result);
            }
        }
        for (_, alloc) in self.allocations.lock().drain() {
            let result = unsafe { sys::cuMemFree_v2(alloc.raw) };
            if result != CUresult::CUDA_SUCCESS {
                tracing::warn!("cuMemFree failed with error: {:?}", result);
            }
        }
    }
}
