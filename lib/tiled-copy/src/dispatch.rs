// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Issue one asynchronous strided copy per tile.

use std::sync::Arc;

use tilecopy_memory::{AcceleratorRuntime, CopyEndpoint, DeviceAllocation, HostBuffer};

use crate::error::TransferError;
use crate::events::{EventSet, HandleState};
use crate::geometry::{CopyPlan, Direction};

/// A planned copy bound to concrete host and device memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyTask {
    pub tile: usize,
    pub direction: Direction,
    pub src: CopyEndpoint,
    pub dst: CopyEndpoint,
}

impl CopyTask {
    /// Bind `plan` to `host` and the tile's `device` allocation.
    ///
    /// # Errors
    /// A geometry error if the plan does not fit either buffer.
    pub fn new<T: Copy + Default>(
        plan: &CopyPlan,
        host: &mut HostBuffer<T>,
        device: &DeviceAllocation,
    ) -> Result<Self, TransferError> {
        plan.check_bounds(host.byte_len(), device.len())?;

        let device_ep = device.endpoint(plan.device.pitch, plan.region);
        let (src, dst) = match plan.direction {
            Direction::HostToDevice => {
                let host_ep = host.endpoint(plan.host.offset, plan.host.pitch, plan.region)?;
                (host_ep, device_ep)
            }
            Direction::DeviceToHost => {
                let host_ep = host.endpoint_mut(plan.host.offset, plan.host.pitch, plan.region)?;
                (device_ep, host_ep)
            }
        };

        Ok(Self {
            tile: plan.tile,
            direction: plan.direction,
            src,
            dst,
        })
    }
}

/// Appends copies to the runtime's command stream in the order given.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    runtime: Arc<dyn AcceleratorRuntime>,
}

impl Dispatcher {
    pub fn new(runtime: Arc<dyn AcceleratorRuntime>) -> Self {
        Self { runtime }
    }

    /// Issue `task` against the armed handle of its tile and mark the handle
    /// pending.
    ///
    /// # Errors
    /// - [`TransferError::HandleMisuse`] if the handle is not armed
    /// - [`TransferError::Dispatch`] if the runtime rejects the copy
    ///
    /// # Safety
    /// The memory behind both endpoints of `task` must stay alive and
    /// untouched until the handle is observed signaled.
    pub unsafe fn dispatch(&self, events: &mut EventSet, task: &CopyTask) -> Result<(), TransferError> {
        let handle = events.handle(task.tile)?;
        if handle.state() != HandleState::Armed {
            return Err(TransferError::HandleMisuse {
                tile: task.tile,
                state: handle.state(),
                expected: HandleState::Armed,
            });
        }

        // SAFETY: forwarded to the caller.
        unsafe {
            self.runtime
                .append_copy_region(&task.dst, &task.src, handle.event(), &[])
        }
        .map_err(|source| TransferError::Dispatch {
            tile: task.tile,
            direction: task.direction,
            source,
        })?;

        events.mark_pending(task.tile)?;
        tracing::trace!(tile = task.tile, direction = %task.direction, "copy dispatched");
        Ok(())
    }
}
