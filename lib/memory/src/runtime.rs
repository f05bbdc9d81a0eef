// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The accelerator runtime boundary.
//!
//! [`AcceleratorRuntime`] is the capability set the copy engine consumes:
//! device allocation, host-visible completion events, asynchronous strided 2D
//! copies on a single command stream, and status queries. Driver, device and
//! context bootstrap happen inside the implementation's constructor.

use std::fmt;

use crate::error::Result;

/// Opaque address of a device allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DevicePtr(u64);

impl DevicePtr {
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    pub const fn addr(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for DevicePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Opaque handle to a pool of host-visible completion events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventPoolHandle(u64);

impl EventPoolHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Opaque handle to a single completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle(u64);

impl EventHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Rectangular sub-area of a 2D (optionally 3D) buffer.
///
/// `origin_x` and `width` are in bytes, `origin_y` and `height` in rows,
/// `origin_z` and `depth` in slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub origin_x: u32,
    pub origin_y: u32,
    pub origin_z: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Region {
    /// A single-slice region anchored at the origin.
    pub const fn rect(width: u32, height: u32) -> Self {
        Self {
            origin_x: 0,
            origin_y: 0,
            origin_z: 0,
            width,
            height,
            depth: 1,
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.depth == 0
    }

    /// Returns true when both regions describe the same extent.
    pub const fn same_extent(&self, other: &Region) -> bool {
        self.width == other.width && self.height == other.height && self.depth == other.depth
    }

    /// Byte offset of the first byte touched, relative to the endpoint base.
    pub fn start(&self, pitch: usize, slice_pitch: usize) -> usize {
        self.origin_z as usize * slice_pitch
            + self.origin_y as usize * pitch
            + self.origin_x as usize
    }

    /// Byte offset one past the last byte touched, relative to the endpoint
    /// base. Zero for an empty region.
    pub fn end(&self, pitch: usize, slice_pitch: usize) -> usize {
        if self.is_empty() {
            return 0;
        }
        let last_slice = (self.origin_z + self.depth - 1) as usize;
        let last_row = (self.origin_y + self.height - 1) as usize;
        last_slice * slice_pitch + last_row * pitch + self.origin_x as usize + self.width as usize
    }

    /// Returns true when the region stays inside an allocation of `len` bytes.
    pub fn fits(&self, pitch: usize, slice_pitch: usize, len: usize) -> bool {
        self.end(pitch, slice_pitch) <= len
    }
}

/// Where the memory of a copy endpoint lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    Host,
    Device,
}

/// One side of a strided copy: a base address, its row and slice pitch, and
/// the region addressed relative to that base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyEndpoint {
    pub addr: u64,
    pub kind: MemoryKind,
    pub pitch: usize,
    pub slice_pitch: usize,
    pub region: Region,
}

impl CopyEndpoint {
    /// Endpoint in host memory.
    pub fn host(addr: u64, pitch: usize, region: Region) -> Self {
        Self {
            addr,
            kind: MemoryKind::Host,
            pitch,
            slice_pitch: 0,
            region,
        }
    }

    /// Endpoint in device memory.
    pub fn device(ptr: DevicePtr, pitch: usize, region: Region) -> Self {
        Self {
            addr: ptr.addr(),
            kind: MemoryKind::Device,
            pitch,
            slice_pitch: 0,
            region,
        }
    }

    /// Absolute byte range `[start, end)` touched by this endpoint.
    pub fn byte_range(&self) -> std::ops::Range<u64> {
        let start = self.addr + self.region.start(self.pitch, self.slice_pitch) as u64;
        let end = self.addr + self.region.end(self.pitch, self.slice_pitch) as u64;
        start..end
    }
}

/// Result of querying a completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    /// The associated operation is still in flight.
    NotReady,
    /// The event has been signaled.
    Ready,
}

/// Utilization of one device memory module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryModuleState {
    pub module: u32,
    pub used: u64,
    pub capacity: u64,
}

impl MemoryModuleState {
    pub fn free(&self) -> u64 {
        self.capacity.saturating_sub(self.used)
    }
}

/// Capability set consumed from an accelerator runtime.
///
/// Every method maps a non-success status to [`crate::RuntimeError`]. The
/// only non-error, non-success outcome is [`EventStatus::NotReady`] from
/// [`AcceleratorRuntime::event_query_status`].
pub trait AcceleratorRuntime: Send + Sync + fmt::Debug {
    /// Human readable backend name for logs.
    fn name(&self) -> &str;

    /// Allocate `size` bytes of device memory aligned to `alignment`
    /// (a power of two, or zero for the runtime default).
    fn alloc_device(&self, size: usize, alignment: usize) -> Result<DevicePtr>;

    /// Make a device allocation resident.
    fn make_resident(&self, ptr: DevicePtr, size: usize) -> Result<()>;

    /// Release a device allocation.
    fn free_device(&self, ptr: DevicePtr) -> Result<()>;

    /// Create a pool able to hold `count` host-visible events.
    fn create_event_pool(&self, count: u32) -> Result<EventPoolHandle>;

    /// Create the event at `index` inside `pool`.
    fn create_event(&self, pool: EventPoolHandle, index: u32) -> Result<EventHandle>;

    fn destroy_event(&self, event: EventHandle) -> Result<()>;

    /// Destroy a pool. All of its events must have been destroyed first.
    fn destroy_event_pool(&self, pool: EventPoolHandle) -> Result<()>;

    /// Reset an event to its unsignaled state from the host.
    fn event_host_reset(&self, event: EventHandle) -> Result<()>;

    /// Append an asynchronous strided copy from `src` to `dst` on the command
    /// stream. `signal` is signaled when the copy completes; the copy starts
    /// only after every event in `wait` is signaled.
    ///
    /// # Safety
    /// Both endpoints must stay valid, and nothing else may access the bytes
    /// they address, until `signal` has been observed as signaled (or
    /// [`AcceleratorRuntime::synchronize`] has returned).
    unsafe fn append_copy_region(
        &self,
        dst: &CopyEndpoint,
        src: &CopyEndpoint,
        signal: EventHandle,
        wait: &[EventHandle],
    ) -> Result<()>;

    /// Query an event without blocking.
    fn event_query_status(&self, event: EventHandle) -> Result<EventStatus>;

    /// Block until every operation appended so far has finished.
    fn synchronize(&self) -> Result<()>;

    /// Utilization of every memory module of the device.
    fn memory_modules(&self) -> Result<Vec<MemoryModuleState>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_bounds() {
        let region = Region::rect(2048, 512);
        assert_eq!(region.start(8192, 0), 0);
        assert_eq!(region.end(8192, 0), 511 * 8192 + 2048);
        assert!(region.fits(2048, 0, 2048 * 512));
        assert!(!region.fits(2048, 0, 2048 * 512 - 1));
    }

    #[test]
    fn test_region_with_origin() {
        let region = Region {
            origin_x: 16,
            origin_y: 2,
            ..Region::rect(32, 4)
        };
        assert_eq!(region.start(64, 0), 2 * 64 + 16);
        assert_eq!(region.end(64, 0), 5 * 64 + 16 + 32);
    }

    #[test]
    fn test_empty_region() {
        let region = Region::rect(0, 10);
        assert!(region.is_empty());
        assert_eq!(region.end(128, 0), 0);
        assert!(region.fits(128, 0, 0));
    }

    #[test]
    fn test_memory_module_free() {
        let state = MemoryModuleState {
            module: 0,
            used: 3 << 20,
            capacity: 8 << 20,
        };
        assert_eq!(state.free(), 5 << 20);

        let overcommitted = MemoryModuleState { used: 9 << 20, ..state };
        assert_eq!(overcommitted.free(), 0);
    }

    #[test]
    fn test_endpoint_byte_range() {
        let ep = CopyEndpoint::device(DevicePtr::new(0x1000), 256, Region::rect(128, 2));
        assert_eq!(ep.byte_range(), 0x1000..0x1000 + 256 + 128);
    }
}
