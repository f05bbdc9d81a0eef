// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Reference runtime backed by host memory and copy engine threads.
//!
//! [`SimRuntime`] enforces the same contract a hardware runtime does:
//! allocations are bounds checked, an event cannot be reset or re-armed while
//! its copy is in flight, and copies complete asynchronously and out of order
//! across the configured number of copy engines. Faults can be injected at a
//! given append or on a given event query, and an event can be stalled so it
//! never signals.

mod engine;

use std::alloc::Layout;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use derive_builder::Builder;
use parking_lot::Mutex;

use crate::error::{Result, RuntimeError};
use crate::runtime::{
    AcceleratorRuntime, CopyEndpoint, DevicePtr, EventHandle, EventPoolHandle, EventStatus,
    MemoryKind, MemoryModuleState,
};
use crate::status::Status;

use engine::{CopyEngine, CopyJob, SimEvent};

const DEFAULT_COPY_ENGINES: usize = 4;
const DEFAULT_CAPACITY: u64 = 16 << 30;
const DEFAULT_ALIGNMENT: usize = 64;

/// Configuration of the reference runtime.
#[derive(Debug, Clone, Builder)]
#[builder(pattern = "owned", build_fn(validate = "Self::validate"))]
pub struct SimConfig {
    /// Number of copy engine threads.
    #[builder(default = "DEFAULT_COPY_ENGINES")]
    pub copy_engines: usize,

    /// Device memory capacity in bytes.
    #[builder(default = "DEFAULT_CAPACITY")]
    pub capacity: u64,

    /// Time every copy spends on an engine before it is performed.
    #[builder(default = "Duration::ZERO")]
    pub copy_latency: Duration,

    /// Stretch each copy's latency by a per-copy factor of 1 to 4 so that
    /// completion order differs from issue order.
    #[builder(default = "false")]
    pub latency_jitter: bool,

    /// Fail the append with this 0-based sequence number.
    #[builder(default, setter(strip_option))]
    pub fail_copy_at: Option<u64>,

    /// Complete the append with this 0-based sequence number, but flip the
    /// first byte it writes.
    #[builder(default, setter(strip_option))]
    pub corrupt_copy_at: Option<u64>,

    /// Fail every status query of the event with this pool index.
    #[builder(default, setter(strip_option))]
    pub fail_query_of: Option<u32>,

    /// Never signal copies carried by the event with this pool index.
    #[builder(default, setter(strip_option))]
    pub stall_event: Option<u32>,

    /// Status reported by injected faults.
    #[builder(default = "Status::DeviceLost")]
    pub fault_status: Status,
}

impl SimConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.copy_engines == Some(0) {
            return Err("copy_engines must be at least 1".to_string());
        }
        if self.capacity == Some(0) {
            return Err("capacity must be non-zero".to_string());
        }
        if self.fault_status.is_some_and(Status::is_success) {
            return Err("fault_status must be an error status".to_string());
        }
        Ok(())
    }
}

impl SimConfig {
    pub fn builder() -> SimConfigBuilder {
        SimConfigBuilder::default()
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            copy_engines: DEFAULT_COPY_ENGINES,
            capacity: DEFAULT_CAPACITY,
            copy_latency: Duration::ZERO,
            latency_jitter: false,
            fail_copy_at: None,
            corrupt_copy_at: None,
            fail_query_of: None,
            stall_event: None,
            fault_status: Status::DeviceLost,
        }
    }
}

#[derive(Debug)]
struct Allocation {
    layout: Layout,
    resident: bool,
}

#[derive(Debug)]
struct PoolState {
    live: Vec<bool>,
}

/// Host-memory implementation of [`AcceleratorRuntime`].
#[derive(Debug)]
pub struct SimRuntime {
    config: SimConfig,
    engine: CopyEngine,
    next_handle: AtomicU64,
    appends: AtomicU64,
    allocations: Mutex<BTreeMap<u64, Allocation>>,
    pools: Mutex<HashMap<u64, PoolState>>,
    events: Mutex<HashMap<u64, Arc<SimEvent>>>,
}

impl SimRuntime {
    /// Start the copy engines.
    ///
    /// # Errors
    /// Returns an error if an engine thread cannot be spawned.
    pub fn new(config: SimConfig) -> Result<Self> {
        let engine = CopyEngine::new(config.copy_engines.max(1)).map_err(|e| {
            tracing::error!("failed to start copy engines: {e}");
            RuntimeError::new("init", Status::OutOfHostMemory)
        })?;

        tracing::debug!(
            engines = config.copy_engines,
            capacity = config.capacity,
            "reference runtime initialized"
        );

        Ok(Self {
            config,
            engine,
            next_handle: AtomicU64::new(1),
            appends: AtomicU64::new(0),
            allocations: Mutex::new(BTreeMap::new()),
            pools: Mutex::new(HashMap::new()),
            events: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Number of copies appended so far, including rejected ones.
    pub fn appended(&self) -> u64 {
        self.appends.load(Ordering::Relaxed)
    }

    fn next_handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    fn event(&self, op: &'static str, event: EventHandle) -> Result<Arc<SimEvent>> {
        self.events
            .lock()
            .get(&event.raw())
            .cloned()
            .ok_or_else(|| RuntimeError::new(op, Status::InvalidNullHandle))
    }

    fn latency_for(&self, seq: u64) -> Duration {
        if !self.config.latency_jitter {
            return self.config.copy_latency;
        }
        let factor = (seq.wrapping_mul(0x9e37_79b9_7f4a_7c15) >> 62) as u32 + 1;
        self.config.copy_latency * factor
    }

    /// Check that a device endpoint addresses resident memory of a single
    /// allocation.
    fn check_device_endpoint(&self, ep: &CopyEndpoint) -> Result<()> {
        const OP: &str = "append_copy_region";
        let range = ep.byte_range();
        let allocations = self.allocations.lock();
        let (base, alloc) = allocations
            .range(..=range.start)
            .next_back()
            .ok_or_else(|| RuntimeError::new(OP, Status::InvalidArgument))?;

        let end = base + alloc.layout.size() as u64;
        if range.start >= end && !range.is_empty() {
            return Err(RuntimeError::new(OP, Status::InvalidArgument));
        }
        if !alloc.resident {
            return Err(RuntimeError::new(OP, Status::InvalidArgument));
        }
        if range.end > end {
            return Err(RuntimeError::new(OP, Status::InvalidSize));
        }
        Ok(())
    }
}

impl AcceleratorRuntime for SimRuntime {
    fn name(&self) -> &str {
        "sim"
    }

    fn alloc_device(&self, size: usize, alignment: usize) -> Result<DevicePtr> {
        const OP: &str = "alloc_device";
        if size == 0 {
            return Err(RuntimeError::new(OP, Status::InvalidSize));
        }
        let alignment = if alignment == 0 {
            DEFAULT_ALIGNMENT
        } else {
            alignment
        };
        if !alignment.is_power_of_two() {
            return Err(RuntimeError::new(OP, Status::UnsupportedAlignment));
        }
        let layout = Layout::from_size_align(size, alignment)
            .map_err(|_| RuntimeError::new(OP, Status::UnsupportedSize))?;

        let mut allocations = self.allocations.lock();
        let used: u64 = allocations.values().map(|a| a.layout.size() as u64).sum();
        if used + size as u64 > self.config.capacity {
            return Err(RuntimeError::new(OP, Status::OutOfDeviceMemory));
        }

        // SAFETY: the layout has a non-zero size.
        let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
        if ptr.is_null() {
            return Err(RuntimeError::new(OP, Status::OutOfHostMemory));
        }

        let addr = ptr as u64;
        allocations.insert(
            addr,
            Allocation {
                layout,
                resident: false,
            },
        );
        Ok(DevicePtr::new(addr))
    }

    fn make_resident(&self, ptr: DevicePtr, size: usize) -> Result<()> {
        const OP: &str = "make_resident";
        let mut allocations = self.allocations.lock();
        let alloc = allocations
            .get_mut(&ptr.addr())
            .ok_or_else(|| RuntimeError::new(OP, Status::InvalidArgument))?;
        if size > alloc.layout.size() {
            return Err(RuntimeError::new(OP, Status::InvalidSize));
        }
        alloc.resident = true;
        Ok(())
    }

    fn free_device(&self, ptr: DevicePtr) -> Result<()> {
        let alloc = self
            .allocations
            .lock()
            .remove(&ptr.addr())
            .ok_or_else(|| RuntimeError::new("free_device", Status::InvalidArgument))?;
        // SAFETY: the address and layout come from `alloc_device`.
        unsafe { std::alloc::dealloc(ptr.addr() as *mut u8, alloc.layout) };
        Ok(())
    }

    fn create_event_pool(&self, count: u32) -> Result<EventPoolHandle> {
        if count == 0 {
            return Err(RuntimeError::new("create_event_pool", Status::InvalidSize));
        }
        let handle = self.next_handle();
        self.pools.lock().insert(
            handle,
            PoolState {
                live: vec![false; count as usize],
            },
        );
        Ok(EventPoolHandle::new(handle))
    }

    fn create_event(&self, pool: EventPoolHandle, index: u32) -> Result<EventHandle> {
        const OP: &str = "create_event";
        let mut pools = self.pools.lock();
        let state = pools
            .get_mut(&pool.raw())
            .ok_or_else(|| RuntimeError::new(OP, Status::InvalidNullHandle))?;
        let slot = state
            .live
            .get_mut(index as usize)
            .ok_or_else(|| RuntimeError::new(OP, Status::InvalidArgument))?;
        if *slot {
            return Err(RuntimeError::new(OP, Status::HandleObjectInUse));
        }
        *slot = true;

        let handle = self.next_handle();
        self.events
            .lock()
            .insert(handle, Arc::new(SimEvent::new(pool.raw(), index)));
        Ok(EventHandle::new(handle))
    }

    fn destroy_event(&self, event: EventHandle) -> Result<()> {
        const OP: &str = "destroy_event";
        let mut pools = self.pools.lock();
        let mut events = self.events.lock();
        let sim = events
            .get(&event.raw())
            .ok_or_else(|| RuntimeError::new(OP, Status::InvalidNullHandle))?;
        if sim.is_in_flight() {
            return Err(RuntimeError::new(OP, Status::HandleObjectInUse));
        }
        if let Some(slot) = pools
            .get_mut(&sim.pool)
            .and_then(|p| p.live.get_mut(sim.index as usize))
        {
            *slot = false;
        }
        events.remove(&event.raw());
        Ok(())
    }

    fn destroy_event_pool(&self, pool: EventPoolHandle) -> Result<()> {
        const OP: &str = "destroy_event_pool";
        let mut pools = self.pools.lock();
        let state = pools
            .get(&pool.raw())
            .ok_or_else(|| RuntimeError::new(OP, Status::InvalidNullHandle))?;
        if state.live.iter().any(|live| *live) {
            return Err(RuntimeError::new(OP, Status::HandleObjectInUse));
        }
        pools.remove(&pool.raw());
        Ok(())
    }

    fn event_host_reset(&self, event: EventHandle) -> Result<()> {
        const OP: &str = "event_host_reset";
        let sim = self.event(OP, event)?;
        if sim.is_in_flight() {
            return Err(RuntimeError::new(OP, Status::HandleObjectInUse));
        }
        sim.reset();
        Ok(())
    }

    unsafe fn append_copy_region(
        &self,
        dst: &CopyEndpoint,
        src: &CopyEndpoint,
        signal: EventHandle,
        wait: &[EventHandle],
    ) -> Result<()> {
        const OP: &str = "append_copy_region";
        let seq = self.appends.fetch_add(1, Ordering::Relaxed);
        if self.config.fail_copy_at == Some(seq) {
            tracing::debug!(seq, "injecting append fault");
            return Err(RuntimeError::new(OP, self.config.fault_status));
        }

        if !wait.is_empty() {
            return Err(RuntimeError::new(OP, Status::UnsupportedFeature));
        }
        if !src.region.same_extent(&dst.region) {
            return Err(RuntimeError::new(OP, Status::InvalidArgument));
        }
        if src.region.is_empty() {
            return Err(RuntimeError::new(OP, Status::InvalidSize));
        }
        for ep in [src, dst] {
            let row_end = ep.region.origin_x as usize + ep.region.width as usize;
            if ep.region.height > 1 && ep.pitch < row_end {
                return Err(RuntimeError::new(OP, Status::InvalidArgument));
            }
            if ep.kind == MemoryKind::Device {
                self.check_device_endpoint(ep)?;
            }
        }

        let (a, b) = (src.byte_range(), dst.byte_range());
        if a.start < b.end && b.start < a.end {
            return Err(RuntimeError::new(OP, Status::OverlappingRegions));
        }

        let event = self.event(OP, signal)?;
        if event.is_in_flight() {
            return Err(RuntimeError::new(OP, Status::HandleObjectInUse));
        }
        if event.is_signaled() {
            return Err(RuntimeError::new(OP, Status::InvalidSynchronizationObject));
        }

        if self.config.stall_event == Some(event.index) {
            tracing::debug!(seq, event = event.index, "stalling copy");
            return Ok(());
        }

        event.begin();
        self.engine.submit(CopyJob {
            dst: *dst,
            src: *src,
            event,
            latency: self.latency_for(seq),
            corrupt: self.config.corrupt_copy_at == Some(seq),
        });
        Ok(())
    }

    fn event_query_status(&self, event: EventHandle) -> Result<EventStatus> {
        const OP: &str = "event_query_status";
        let sim = self.event(OP, event)?;
        if self.config.fail_query_of == Some(sim.index) {
            return Err(RuntimeError::new(OP, self.config.fault_status));
        }
        if sim.is_signaled() {
            Ok(EventStatus::Ready)
        } else {
            Ok(EventStatus::NotReady)
        }
    }

    fn synchronize(&self) -> Result<()> {
        self.engine.wait_idle();
        Ok(())
    }

    fn memory_modules(&self) -> Result<Vec<MemoryModuleState>> {
        let used = self
            .allocations
            .lock()
            .values()
            .map(|a| a.layout.size() as u64)
            .sum();
        Ok(vec![MemoryModuleState {
            module: 0,
            used,
            capacity: self.config.capacity,
        }])
    }
}

impl Drop for SimRuntime {
    fn drop(&mut self) {
        self.engine.shutdown();

        let allocations = std::mem::take(&mut *self.allocations.lock());
        if !allocations.is_empty() {
            tracing::warn!(
                "releasing {} device allocations still live at shutdown",
                allocations.len()
            );
        }
        for (addr, alloc) in allocations {
            // SAFETY: every entry was produced by `alloc_device` and the
            // engines have stopped.
            unsafe { std::alloc::dealloc(addr as *mut u8, alloc.layout) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Region;

    fn runtime() -> SimRuntime {
        SimRuntime::new(SimConfig::default()).unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let config = SimConfig::builder().build().unwrap();
        assert_eq!(config.copy_engines, DEFAULT_COPY_ENGINES);
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert_eq!(config.fault_status, Status::DeviceLost);

        assert!(SimConfig::builder().copy_engines(0).build().is_err());
        assert!(
            SimConfig::builder()
                .fault_status(Status::Success)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_alloc_alignment_and_accounting() {
        let rt = runtime();
        let ptr = rt.alloc_device(4096, 4096).unwrap();
        assert_eq!(ptr.addr() % 4096, 0);
        assert_eq!(rt.memory_modules().unwrap()[0].used, 4096);

        let err = rt.alloc_device(64, 3).unwrap_err();
        assert_eq!(err.status, Status::UnsupportedAlignment);

        rt.free_device(ptr).unwrap();
        assert_eq!(rt.memory_modules().unwrap()[0].used, 0);
        assert_eq!(
            rt.free_device(ptr).unwrap_err().status,
            Status::InvalidArgument
        );
    }

    #[test]
    fn test_capacity_exhausted() {
        let rt = SimRuntime::new(SimConfig::builder().capacity(1024).build().unwrap()).unwrap();
        let ptr = rt.alloc_device(1024, 0).unwrap();
        let err = rt.alloc_device(1, 0).unwrap_err();
        assert_eq!(err.status, Status::OutOfDeviceMemory);
        rt.free_device(ptr).unwrap();
    }

    #[test]
    fn test_event_pool_lifecycle() {
        let rt = runtime();
        let pool = rt.create_event_pool(2).unwrap();
        let e0 = rt.create_event(pool, 0).unwrap();

        assert_eq!(
            rt.create_event(pool, 0).unwrap_err().status,
            Status::HandleObjectInUse
        );
        assert_eq!(
            rt.create_event(pool, 2).unwrap_err().status,
            Status::InvalidArgument
        );
        assert_eq!(
            rt.destroy_event_pool(pool).unwrap_err().status,
            Status::HandleObjectInUse
        );

        rt.destroy_event(e0).unwrap();
        rt.destroy_event_pool(pool).unwrap();
        assert_eq!(
            rt.event_query_status(e0).unwrap_err().status,
            Status::InvalidNullHandle
        );
    }

    #[test]
    fn test_copy_signals_event() {
        let rt = runtime();
        let dev = rt.alloc_device(256, 0).unwrap();
        rt.make_resident(dev, 256).unwrap();
        let pool = rt.create_event_pool(1).unwrap();
        let event = rt.create_event(pool, 0).unwrap();

        let src: Vec<u8> = (0..=255).collect();
        let mut back = vec![0u8; 256];
        let region = Region::rect(64, 4);

        unsafe {
            rt.append_copy_region(
                &CopyEndpoint::device(dev, 64, region),
                &CopyEndpoint::host(src.as_ptr() as u64, 64, region),
                event,
                &[],
            )
            .unwrap();
        }
        rt.synchronize().unwrap();
        assert_eq!(rt.event_query_status(event).unwrap(), EventStatus::Ready);

        // Signaled and not reset: cannot carry a second copy.
        let err = unsafe {
            rt.append_copy_region(
                &CopyEndpoint::host(back.as_mut_ptr() as u64, 64, region),
                &CopyEndpoint::device(dev, 64, region),
                event,
                &[],
            )
        }
        .unwrap_err();
        assert_eq!(err.status, Status::InvalidSynchronizationObject);

        rt.event_host_reset(event).unwrap();
        assert_eq!(rt.event_query_status(event).unwrap(), EventStatus::NotReady);
        unsafe {
            rt.append_copy_region(
                &CopyEndpoint::host(back.as_mut_ptr() as u64, 64, region),
                &CopyEndpoint::device(dev, 64, region),
                event,
                &[],
            )
            .unwrap();
        }
        rt.synchronize().unwrap();
        assert_eq!(src, back);

        rt.destroy_event(event).unwrap();
        rt.destroy_event_pool(pool).unwrap();
        rt.free_device(dev).unwrap();
    }

    #[test]
    fn test_append_validation() {
        let rt = runtime();
        let dev = rt.alloc_device(128, 0).unwrap();
        let pool = rt.create_event_pool(1).unwrap();
        let event = rt.create_event(pool, 0).unwrap();
        let host = vec![0u8; 1024];
        let region = Region::rect(64, 2);
        let host_ep = CopyEndpoint::host(host.as_ptr() as u64, 64, region);

        let append = |dst: CopyEndpoint, src: CopyEndpoint, wait: &[EventHandle]| unsafe {
            rt.append_copy_region(&dst, &src, event, wait)
                .unwrap_err()
                .status
        };

        // Not resident yet.
        assert_eq!(
            append(CopyEndpoint::device(dev, 64, region), host_ep, &[]),
            Status::InvalidArgument
        );
        rt.make_resident(dev, 128).unwrap();

        assert_eq!(
            append(CopyEndpoint::device(dev, 64, region), host_ep, &[event]),
            Status::UnsupportedFeature
        );
        assert_eq!(
            append(
                CopyEndpoint::device(dev, 64, Region::rect(32, 2)),
                host_ep,
                &[]
            ),
            Status::InvalidArgument
        );
        assert_eq!(
            append(
                CopyEndpoint::device(dev, 128, region),
                host_ep,
                &[]
            ),
            Status::InvalidSize
        );
        assert_eq!(
            append(
                CopyEndpoint::host(host.as_ptr() as u64 + 32, 64, region),
                host_ep,
                &[]
            ),
            Status::OverlappingRegions
        );
        assert_eq!(
            append(
                CopyEndpoint::device(dev, 64, region),
                CopyEndpoint::host(host.as_ptr() as u64, 32, region),
                &[]
            ),
            Status::InvalidArgument
        );

        rt.destroy_event(event).unwrap();
        rt.destroy_event_pool(pool).unwrap();
        rt.free_device(dev).unwrap();
    }

    #[test]
    fn test_injected_faults() {
        let config = SimConfig::builder()
            .fail_copy_at(1)
            .fail_query_of(0)
            .fault_status(Status::DeviceLost)
            .build()
            .unwrap();
        let rt = SimRuntime::new(config).unwrap();
        let pool = rt.create_event_pool(2).unwrap();
        let e0 = rt.create_event(pool, 0).unwrap();
        let e1 = rt.create_event(pool, 1).unwrap();

        let src = vec![1u8; 64];
        let mut dst = vec![0u8; 128];
        let region = Region::rect(64, 1);
        let src_ep = CopyEndpoint::host(src.as_ptr() as u64, 64, region);

        unsafe {
            rt.append_copy_region(
                &CopyEndpoint::host(dst.as_mut_ptr() as u64, 64, region),
                &src_ep,
                e0,
                &[],
            )
            .unwrap();
            let err = rt
                .append_copy_region(
                    &CopyEndpoint::host(dst.as_mut_ptr() as u64 + 64, 64, region),
                    &src_ep,
                    e1,
                    &[],
                )
                .unwrap_err();
            assert_eq!(err.status, Status::DeviceLost);
        }
        assert_eq!(rt.appended(), 2);

        rt.synchronize().unwrap();
        assert_eq!(
            rt.event_query_status(e0).unwrap_err().status,
            Status::DeviceLost
        );
        assert_eq!(rt.event_query_status(e1).unwrap(), EventStatus::NotReady);

        rt.destroy_event(e0).unwrap();
        rt.destroy_event(e1).unwrap();
        rt.destroy_event_pool(pool).unwrap();
    }

    #[test]
    fn test_stalled_event_never_signals() {
        let rt = SimRuntime::new(SimConfig::builder().stall_event(0).build().unwrap()).unwrap();
        let pool = rt.create_event_pool(1).unwrap();
        let event = rt.create_event(pool, 0).unwrap();

        let src = vec![7u8; 32];
        let mut dst = vec![0u8; 32];
        let region = Region::rect(32, 1);
        unsafe {
            rt.append_copy_region(
                &CopyEndpoint::host(dst.as_mut_ptr() as u64, 32, region),
                &CopyEndpoint::host(src.as_ptr() as u64, 32, region),
                event,
                &[],
            )
            .unwrap();
        }
        rt.synchronize().unwrap();
        assert_eq!(rt.event_query_status(event).unwrap(), EventStatus::NotReady);
        assert_eq!(dst, vec![0u8; 32]);

        rt.destroy_event(event).unwrap();
        rt.destroy_event_pool(pool).unwrap();
    }

    #[test]
    fn test_corrupted_copy_still_signals() {
        let rt = SimRuntime::new(SimConfig::builder().corrupt_copy_at(0).build().unwrap()).unwrap();
        let pool = rt.create_event_pool(1).unwrap();
        let event = rt.create_event(pool, 0).unwrap();

        let src = vec![7u8; 32];
        let mut dst = vec![0u8; 32];
        let region = Region::rect(32, 1);
        unsafe {
            rt.append_copy_region(
                &CopyEndpoint::host(dst.as_mut_ptr() as u64, 32, region),
                &CopyEndpoint::host(src.as_ptr() as u64, 32, region),
                event,
                &[],
            )
            .unwrap();
        }
        rt.synchronize().unwrap();
        assert_eq!(rt.event_query_status(event).unwrap(), EventStatus::Ready);
        assert_eq!(dst[0], !7u8);
        assert_eq!(&dst[1..], &src[1..]);

        rt.destroy_event(event).unwrap();
        rt.destroy_event_pool(pool).unwrap();
    }
}
