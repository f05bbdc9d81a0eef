// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Per-tile completion handles.
//!
//! Each tile owns one event from a shared pool. The host tracks what it
//! expects the event to be doing:
//!
//! ```text
//!   Armed --dispatch--> Pending --query: ready--> Signaled --rearm--> Armed
//! ```
//!
//! Re-arming a `Pending` handle would race the copy that is about to signal
//! it, so [`EventSet::rearm`] refuses it.

use std::fmt;
use std::sync::Arc;

use tilecopy_memory::{AcceleratorRuntime, EventHandle, EventPoolHandle, EventStatus};

use crate::error::TransferError;
use crate::geometry::MAX_TILES;
use crate::tiles::TileArray;

/// Host-side view of a completion handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleState {
    /// Unsignaled and not attached to any copy.
    Armed,
    /// Attached to a copy that has not been observed complete.
    Pending,
    /// The copy was observed complete.
    Signaled,
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleState::Armed => f.write_str("armed"),
            HandleState::Pending => f.write_str("pending"),
            HandleState::Signaled => f.write_str("signaled"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompletionHandle {
    event: EventHandle,
    state: HandleState,
}

impl CompletionHandle {
    pub fn event(&self) -> EventHandle {
        self.event
    }

    pub fn state(&self) -> HandleState {
        self.state
    }
}

/// Fixed-capacity set of completion handles, one per tile.
#[derive(Debug)]
pub struct EventSet {
    runtime: Arc<dyn AcceleratorRuntime>,
    pool: Option<EventPoolHandle>,
    handles: TileArray<CompletionHandle>,
}

impl EventSet {
    /// Create a pool of `count` events and one armed handle per tile.
    pub fn new(runtime: Arc<dyn AcceleratorRuntime>, count: usize) -> Result<Self, TransferError> {
        if count == 0 || count > MAX_TILES {
            return Err(TransferError::Capacity {
                requested: count,
                capacity: MAX_TILES,
            });
        }

        let pool = runtime.create_event_pool(count as u32)?;
        let mut set = Self {
            runtime,
            pool: Some(pool),
            handles: TileArray::new(),
        };

        // On failure `set` drops and releases whatever was created.
        for index in 0..count {
            let event = set.runtime.create_event(pool, index as u32)?;
            set.handles.try_push(CompletionHandle {
                event,
                state: HandleState::Armed,
            })?;
        }

        tracing::debug!(count, "created completion events");
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn state(&self, tile: usize) -> Result<HandleState, TransferError> {
        Ok(self.handles.get(tile)?.state)
    }

    pub fn handle(&self, tile: usize) -> Result<CompletionHandle, TransferError> {
        self.handles.get(tile).copied()
    }

    /// Reset the event of `tile` so it can carry a new copy.
    ///
    /// # Errors
    /// [`TransferError::HandleMisuse`] if the handle is still pending.
    pub fn rearm(&mut self, tile: usize) -> Result<(), TransferError> {
        let handle = self.handles.get_mut(tile)?;
        match handle.state {
            HandleState::Pending => Err(TransferError::HandleMisuse {
                tile,
                state: HandleState::Pending,
                expected: HandleState::Signaled,
            }),
            HandleState::Armed | HandleState::Signaled => {
                self.runtime.event_host_reset(handle.event)?;
                handle.state = HandleState::Armed;
                Ok(())
            }
        }
    }

    /// Record that a copy was attached to the armed handle of `tile`.
    pub fn mark_pending(&mut self, tile: usize) -> Result<(), TransferError> {
        let handle = self.handles.get_mut(tile)?;
        if handle.state != HandleState::Armed {
            return Err(TransferError::HandleMisuse {
                tile,
                state: handle.state,
                expected: HandleState::Armed,
            });
        }
        handle.state = HandleState::Pending;
        Ok(())
    }

    /// Query the event of `tile` once.
    ///
    /// A handle already observed as signaled reports ready without another
    /// runtime call.
    pub fn query(&mut self, tile: usize) -> Result<EventStatus, TransferError> {
        let handle = self.handles.get_mut(tile)?;
        if handle.state == HandleState::Signaled {
            return Ok(EventStatus::Ready);
        }

        let status = self
            .runtime
            .event_query_status(handle.event)
            .map_err(|source| TransferError::Query { tile, source })?;
        if status == EventStatus::Ready {
            handle.state = HandleState::Signaled;
        }
        Ok(status)
    }

    pub fn all_signaled(&self) -> bool {
        self.handles.iter().all(|h| h.state == HandleState::Signaled)
    }

    /// True when some handle may still be attached to an in-flight copy.
    pub fn any_pending(&self) -> bool {
        self.handles.iter().any(|h| h.state == HandleState::Pending)
    }

    /// Destroy every event, then the pool. Pending copies are drained first.
    pub fn release(&mut self) -> Result<(), TransferError> {
        if self.any_pending() {
            self.runtime.synchronize()?;
        }

        let mut first_err = None;
        while let Some(handle) = self.handles.pop() {
            if let Err(e) = self.runtime.destroy_event(handle.event) {
                first_err.get_or_insert(e);
            }
        }
        if let Some(pool) = self.pool.take() {
            if let Err(e) = self.runtime.destroy_event_pool(pool) {
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

impl Drop for EventSet {
    fn drop(&mut self) {
        if self.pool.is_none() {
            return;
        }
        if let Err(e) = self.release() {
            tracing::warn!("failed to release completion events: {e}");
        }
    }
}
