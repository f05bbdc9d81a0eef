// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Scripted runtime for unit tests.
//!
//! Nothing is copied. Queries of an event return its scripted statuses in
//! order and report ready once the script runs out.

use std::collections::{HashMap, HashSet, VecDeque};

use parking_lot::Mutex;
use tilecopy_memory::{
    AcceleratorRuntime, CopyEndpoint, DevicePtr, EventHandle, EventPoolHandle, EventStatus,
    MemoryModuleState, Result, RuntimeError, Status,
};

#[derive(Debug, Clone, Copy)]
pub(crate) struct AppendRecord {
    pub signal: EventHandle,
    pub dst: CopyEndpoint,
    pub src: CopyEndpoint,
}

#[derive(Debug, Default)]
struct MockState {
    next: u64,
    scripts: HashMap<u64, VecDeque<std::result::Result<EventStatus, Status>>>,
    events: HashSet<u64>,
    pools: HashSet<u64>,
    allocations: HashMap<u64, usize>,
    appends: Vec<AppendRecord>,
    fail_append_at: Option<usize>,
    resets: usize,
    queries: usize,
    syncs: usize,
}

#[derive(Debug, Default)]
pub(crate) struct MockRuntime {
    state: Mutex<MockState>,
}

impl MockRuntime {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue the statuses the next queries of `event` return.
    pub(crate) fn script(
        &self,
        event: EventHandle,
        statuses: impl IntoIterator<Item = std::result::Result<EventStatus, Status>>,
    ) {
        self.state
            .lock()
            .scripts
            .entry(event.raw())
            .or_default()
            .extend(statuses);
    }

    /// Fail the append with this 0-based sequence number.
    pub(crate) fn fail_append_at(&self, seq: usize) {
        self.state.lock().fail_append_at = Some(seq);
    }

    pub(crate) fn appends(&self) -> Vec<AppendRecord> {
        self.state.lock().appends.clone()
    }

    pub(crate) fn resets(&self) -> usize {
        self.state.lock().resets
    }

    pub(crate) fn queries(&self) -> usize {
        self.state.lock().queries
    }

    pub(crate) fn synchronizations(&self) -> usize {
        self.state.lock().syncs
    }

    pub(crate) fn live_events(&self) -> usize {
        self.state.lock().events.len()
    }

    pub(crate) fn live_pools(&self) -> usize {
        self.state.lock().pools.len()
    }

    fn next_handle(state: &mut MockState) -> u64 {
        state.next += 1;
        state.next
    }
}

impl AcceleratorRuntime for MockRuntime {
    fn name(&self) -> &str {
        "mock"
    }

    fn alloc_device(&self, size: usize, _alignment: usize) -> Result<DevicePtr> {
        let mut state = self.state.lock();
        let addr = 0x1000_0000 + Self::next_handle(&mut state) * 0x1000_0000;
        state.allocations.insert(addr, size);
        Ok(DevicePtr::new(addr))
    }

    fn make_resident(&self, _ptr: DevicePtr, _size: usize) -> Result<()> {
        Ok(())
    }

    fn free_device(&self, ptr: DevicePtr) -> Result<()> {
        self.state
            .lock()
            .allocations
            .remove(&ptr.addr())
            .map(|_| ())
            .ok_or_else(|| RuntimeError::new("free_device", Status::InvalidArgument))
    }

    fn create_event_pool(&self, _count: u32) -> Result<EventPoolHandle> {
        let mut state = self.state.lock();
        let handle = Self::next_handle(&mut state);
        state.pools.insert(handle);
        Ok(EventPoolHandle::new(handle))
    }

    fn create_event(&self, _pool: EventPoolHandle, _index: u32) -> Result<EventHandle> {
        let mut state = self.state.lock();
        let handle = Self::next_handle(&mut state);
        state.events.insert(handle);
        Ok(EventHandle::new(handle))
    }

    fn destroy_event(&self, event: EventHandle) -> Result<()> {
        if self.state.lock().events.remove(&event.raw()) {
            Ok(())
        } else {
            Err(RuntimeError::new("destroy_event", Status::InvalidNullHandle))
        }
    }

    fn destroy_event_pool(&self, pool: EventPoolHandle) -> Result<()> {
        if self.state.lock().pools.remove(&pool.raw()) {
            Ok(())
        } else {
            Err(RuntimeError::new(
                "destroy_event_pool",
                Status::InvalidNullHandle,
            ))
        }
    }

    fn event_host_reset(&self, _event: EventHandle) -> Result<()> {
        self.state.lock().resets += 1;
        Ok(())
    }

    unsafe fn append_copy_region(
        &self,
        dst: &CopyEndpoint,
        src: &CopyEndpoint,
        signal: EventHandle,
        _wait: &[EventHandle],
    ) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_append_at == Some(state.appends.len()) {
            state.fail_append_at = None;
            return Err(RuntimeError::new("append_copy_region", Status::DeviceLost));
        }
        state.appends.push(AppendRecord {
            signal,
            dst: *dst,
            src: *src,
        });
        Ok(())
    }

    fn event_query_status(&self, event: EventHandle) -> Result<EventStatus> {
        let mut state = self.state.lock();
        state.queries += 1;
        match state
            .scripts
            .get_mut(&event.raw())
            .and_then(|script| script.pop_front())
        {
            Some(Ok(status)) => Ok(status),
            Some(Err(status)) => Err(RuntimeError::new("event_query_status", status)),
            None => Ok(EventStatus::Ready),
        }
    }

    fn synchronize(&self) -> Result<()> {
        self.state.lock().syncs += 1;
        Ok(())
    }

    fn memory_modules(&self) -> Result<Vec<MemoryModuleState>> {
        let used = self.state.lock().allocations.values().sum::<usize>() as u64;
        Ok(vec![MemoryModuleState {
            module: 0,
            used,
            capacity: 1 << 30,
        }])
    }
}
