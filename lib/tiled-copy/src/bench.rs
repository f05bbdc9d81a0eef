// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Host -> device -> host round trip over a set of tiles.
//!
//! A [`RoundTrip`] owns every resource of a run: the host buffer, one device
//! allocation per tile and one completion event per tile. Resources are
//! acquired in that order and released in reverse by [`RoundTrip::finish`].
//! Dropping a run with copies still in flight drains the command stream
//! before anything is freed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tilecopy_memory::{AcceleratorRuntime, HostBuffer};

use crate::config::BenchConfig;
use crate::dispatch::{CopyTask, Dispatcher};
use crate::error::TransferError;
use crate::events::EventSet;
use crate::geometry::{Direction, TileGeometry};
use crate::poller::{CompletionPoller, PollStats};
use crate::tiles::TileSet;
use crate::verify::{self, Element};

/// Outcome of one pass over every tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassReport {
    pub direction: Direction,
    /// Bytes moved by the pass.
    pub bytes: usize,
    /// Time from the first dispatch until every tile completed.
    pub elapsed: Duration,
    pub poll: PollStats,
}

impl PassReport {
    /// Throughput in GB/s (10^9 bytes per second).
    pub fn gb_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.bytes as f64 / secs / 1e9
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundTripReport {
    pub tile_count: usize,
    pub tile_bytes: usize,
    pub h2d: PassReport,
    pub d2h: PassReport,
}

pub struct RoundTrip<T: Element = f32> {
    runtime: Arc<dyn AcceleratorRuntime>,
    geometry: TileGeometry,
    dispatcher: Dispatcher,
    poller: CompletionPoller,
    events: EventSet,
    tiles: TileSet,
    host: HostBuffer<T>,
}

impl<T: Element> RoundTrip<T> {
    /// Allocate the host buffer, the tiles and their events.
    pub fn new(runtime: Arc<dyn AcceleratorRuntime>, config: &BenchConfig) -> Result<Self, TransferError> {
        let geometry = config.geometry::<T>()?;
        if geometry.host_elements() > T::MAX_EXACT_INDEX {
            return Err(TransferError::Config(format!(
                "{} elements cannot each hold their index as {}",
                geometry.host_elements(),
                T::NAME
            )));
        }

        tracing::debug!(
            backend = runtime.name(),
            tiles = geometry.tile_count(),
            tile_bytes = geometry.tile_bytes(),
            host_pitch = geometry.host_row_pitch(),
            device_pitch = geometry.device_row_pitch(),
            layout = %geometry.layout(),
            element = T::NAME,
            "allocating round trip"
        );

        let host = HostBuffer::new(geometry.host_elements())?;
        let tiles = TileSet::allocate(runtime.clone(), &geometry)?;
        let events = EventSet::new(runtime.clone(), geometry.tile_count())?;

        Ok(Self {
            dispatcher: Dispatcher::new(runtime.clone()),
            poller: CompletionPoller::new(config.retry_budget),
            runtime,
            geometry,
            events,
            tiles,
            host,
        })
    }

    pub fn geometry(&self) -> &TileGeometry {
        &self.geometry
    }

    pub fn tiles(&self) -> &TileSet {
        &self.tiles
    }

    pub fn events(&self) -> &EventSet {
        &self.events
    }

    /// Host buffer contents. Never observed while a copy is in flight.
    pub fn host(&self) -> &[T] {
        self.host.as_slice()
    }

    /// Write each element's flat index into the host buffer.
    pub fn fill(&mut self) {
        verify::fill_index_pattern(self.host.as_mut_slice());
    }

    pub fn zero_host(&mut self) {
        self.host.zero();
    }

    /// Copy every tile in `direction` and wait for all of them.
    ///
    /// On failure, copies already issued are drained before returning.
    pub fn transfer(&mut self, direction: Direction) -> Result<PassReport, TransferError> {
        let start = Instant::now();
        let result = self
            .dispatch_all(direction)
            .and_then(|()| self.poller.wait_all(&mut self.events));

        let poll = match result {
            Ok(poll) => poll,
            Err(e) => {
                // A rejected issue can leave queued work that no handle tracks.
                if let Err(sync_err) = self.runtime.synchronize() {
                    tracing::warn!("failed to drain in-flight copies: {sync_err}");
                }
                return Err(e);
            }
        };

        let report = PassReport {
            direction,
            bytes: self.geometry.host_len(),
            elapsed: start.elapsed(),
            poll,
        };
        tracing::debug!(
            direction = %direction,
            bytes = report.bytes,
            elapsed_us = report.elapsed.as_micros() as u64,
            passes = poll.outer_passes,
            queries = poll.queries,
            yields = poll.yields,
            "pass complete"
        );
        Ok(report)
    }

    fn dispatch_all(&mut self, direction: Direction) -> Result<(), TransferError> {
        for tile in 0..self.geometry.tile_count() {
            let plan = self.geometry.plan(tile, direction)?;
            let task = CopyTask::new(&plan, &mut self.host, self.tiles.get(tile)?.allocation())?;
            self.events.rearm(tile)?;
            // SAFETY: the host buffer and the tile allocations are owned by
            // `self` and not touched until the pass is waited on or drained.
            unsafe { self.dispatcher.dispatch(&mut self.events, &task)? };
        }
        Ok(())
    }

    pub fn verify(&self) -> Result<(), TransferError> {
        Ok(verify::verify_index_pattern(self.host.as_slice())?)
    }

    /// Fill, copy to the device, zero the host, copy back and verify.
    pub fn run(&mut self) -> Result<RoundTripReport, TransferError> {
        self.fill();

        tracing::info!("H2D");
        let h2d = self.transfer(Direction::HostToDevice)?;

        self.zero_host();

        tracing::info!("D2H");
        let d2h = self.transfer(Direction::DeviceToHost)?;

        self.verify()?;

        Ok(RoundTripReport {
            tile_count: self.geometry.tile_count(),
            tile_bytes: self.geometry.tile_bytes(),
            h2d,
            d2h,
        })
    }

    /// Release events, then device memory. The host buffer goes with `self`.
    pub fn finish(mut self) -> Result<(), TransferError> {
        let events = self.events.release();
        let tiles = self.tiles.release();
        events.and(tiles)
    }
}

impl<T: Element> Drop for RoundTrip<T> {
    fn drop(&mut self) {
        if self.events.any_pending() {
            if let Err(e) = self.runtime.synchronize() {
                tracing::warn!("failed to drain in-flight copies: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::HandleState;
    use crate::geometry::HostLayout;
    use crate::testing::MockRuntime;
    use tilecopy_memory::{SimConfig, SimRuntime, Status};

    fn small_config(count: usize) -> BenchConfig {
        BenchConfig::builder()
            .tile_count(count)
            .tile_width(32)
            .tile_height(16)
            .build()
            .unwrap()
    }

    fn sim(config: SimConfig) -> Arc<SimRuntime> {
        Arc::new(SimRuntime::new(config).unwrap())
    }

    #[test]
    fn test_round_trip() {
        let rt = sim(SimConfig::default());
        let mut bench = RoundTrip::<f32>::new(rt.clone(), &small_config(4)).unwrap();
        let report = bench.run().unwrap();

        assert_eq!(report.tile_count, 4);
        assert_eq!(report.h2d.bytes, 4 * 32 * 16 * 4);
        assert_eq!(report.h2d.direction, Direction::HostToDevice);
        assert!(report.d2h.poll.outer_passes >= 1);
        assert!(bench.events().all_signaled());
        assert_eq!(bench.host()[100], 100.0);

        bench.finish().unwrap();
        assert_eq!(rt.memory_modules().unwrap()[0].used, 0);
    }

    #[test]
    fn test_device_holds_copy_after_h2d() {
        let rt = sim(SimConfig::default());
        let mut bench = RoundTrip::<u32>::new(rt, &small_config(2)).unwrap();
        bench.fill();
        bench.transfer(Direction::HostToDevice).unwrap();
        bench.zero_host();
        assert!(bench.verify().is_err());

        bench.transfer(Direction::DeviceToHost).unwrap();
        bench.verify().unwrap();
    }

    #[test]
    fn test_dispatch_fault_drains_and_reports() {
        let rt = sim(SimConfig::builder().fail_copy_at(2).build().unwrap());
        let mut bench = RoundTrip::<f32>::new(rt, &small_config(4)).unwrap();

        match bench.run() {
            Err(TransferError::Dispatch { tile: 2, direction: Direction::HostToDevice, source }) => {
                assert_eq!(source.status, Status::DeviceLost);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(bench.events().state(1).unwrap(), HandleState::Pending);
        assert_eq!(bench.events().state(2).unwrap(), HandleState::Armed);
        bench.finish().unwrap();
    }

    #[test]
    fn test_failed_first_issue_still_drains() {
        let mock = Arc::new(MockRuntime::new());
        mock.fail_append_at(0);
        let mut bench = RoundTrip::<f32>::new(mock.clone(), &small_config(2)).unwrap();

        let err = bench.transfer(Direction::HostToDevice).unwrap_err();
        assert!(matches!(err, TransferError::Dispatch { tile: 0, .. }));
        assert!(!bench.events().any_pending());
        assert_eq!(mock.synchronizations(), 1);
        bench.finish().unwrap();
    }

    #[test]
    fn test_stacked_layout() {
        let rt = sim(SimConfig::builder().copy_engines(2).build().unwrap());
        let config = small_config(3).with_layout(HostLayout::Stacked);
        let mut bench = RoundTrip::<f64>::new(rt, &config).unwrap();
        bench.run().unwrap();
    }

    #[test]
    fn test_rejects_inexact_element_count() {
        let rt = sim(SimConfig::default());
        let config = BenchConfig::builder()
            .tile_count(64)
            .tile_width(1024)
            .tile_height(512)
            .build()
            .unwrap();
        assert!(matches!(
            RoundTrip::<f32>::new(rt, &config),
            Err(TransferError::Config(_))
        ));
    }

    #[test]
    fn test_gb_per_sec() {
        let report = PassReport {
            direction: Direction::HostToDevice,
            bytes: 2_000_000_000,
            elapsed: Duration::from_secs(2),
            poll: PollStats::default(),
        };
        assert!((report.gb_per_sec() - 1.0).abs() < 1e-9);

        let instant = PassReport {
            elapsed: Duration::ZERO,
            ..report
        };
        assert_eq!(instant.gb_per_sec(), 0.0);
    }
}
