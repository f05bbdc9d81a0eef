// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Cooperative completion polling.
//!
//! Each outer pass walks the tiles that are not done yet and queries each one
//! up to `retry_budget` times, yielding the thread after every not-ready
//! answer. A tile is dropped from the walk the first time it reports ready.
//! There is no timeout: a copy that never completes keeps the poller
//! spinning.

use smallvec::SmallVec;
use tilecopy_memory::EventStatus;

use crate::error::TransferError;
use crate::events::{EventSet, HandleState};
use crate::geometry::MAX_TILES;

/// Queries per tile in one outer pass.
pub const DEFAULT_RETRY_BUDGET: u32 = 16;

/// Counters collected by one [`CompletionPoller::wait_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub outer_passes: u64,
    pub queries: u64,
    pub yields: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct CompletionPoller {
    retry_budget: u32,
}

impl Default for CompletionPoller {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_BUDGET)
    }
}

impl CompletionPoller {
    /// A budget of 0 is treated as 1.
    pub fn new(retry_budget: u32) -> Self {
        Self {
            retry_budget: retry_budget.max(1),
        }
    }

    pub fn retry_budget(&self) -> u32 {
        self.retry_budget
    }

    /// Block until every handle in `events` is signaled.
    ///
    /// # Errors
    /// - [`TransferError::HandleMisuse`] if a handle was never dispatched
    /// - [`TransferError::Query`] if a query returns an error status
    pub fn wait_all(&self, events: &mut EventSet) -> Result<PollStats, TransferError> {
        let mut done: SmallVec<[bool; MAX_TILES]> = SmallVec::with_capacity(events.len());
        for tile in 0..events.len() {
            match events.state(tile)? {
                HandleState::Armed => {
                    return Err(TransferError::HandleMisuse {
                        tile,
                        state: HandleState::Armed,
                        expected: HandleState::Pending,
                    });
                }
                HandleState::Pending => done.push(false),
                HandleState::Signaled => done.push(true),
            }
        }

        let mut stats = PollStats::default();
        let mut remaining = done.iter().filter(|d| !**d).count();

        while remaining > 0 {
            stats.outer_passes += 1;
            for (tile, tile_done) in done.iter_mut().enumerate() {
                if *tile_done {
                    continue;
                }
                for _ in 0..self.retry_budget {
                    stats.queries += 1;
                    match events.query(tile)? {
                        EventStatus::Ready => {
                            *tile_done = true;
                            remaining -= 1;
                            break;
                        }
                        EventStatus::NotReady => {
                            stats.yields += 1;
                            std::thread::yield_now();
                        }
                    }
                }
            }
        }

        tracing::trace!(
            passes = stats.outer_passes,
            queries = stats.queries,
            yields = stats.yields,
            "all tiles complete"
        );
        Ok(stats)
    }
}
