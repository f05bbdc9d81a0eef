// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Tiled asynchronous host/device copies.
//!
//! A host buffer holding up to [`MAX_TILES`] tiles is copied to one device
//! allocation per tile and back, one asynchronous strided copy per tile, with
//! completion tracked through per-tile events and a cooperative poller.
//!
//! - [`geometry`]: per-tile offsets, pitches and extents
//! - [`events`]: completion handles and their armed/pending/signaled state
//! - [`dispatch`]: issues one copy per tile
//! - [`poller`]: waits until every tile has completed
//! - [`verify`]: round-trip integrity checks
//! - [`bench`]: the full round trip with timing

pub mod backend;
pub mod bench;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod geometry;
pub mod logging;
pub mod poller;
pub mod tiles;
pub mod verify;

#[cfg(test)]
mod testing;

#[doc(hidden)]
pub use tracing as __tracing;

pub use backend::open_runtime;
pub use bench::{PassReport, RoundTrip, RoundTripReport};
pub use config::{Backend, BenchConfig, BenchConfigBuilder};
pub use dispatch::{CopyTask, Dispatcher};
pub use error::{ErrorKind, TransferError};
pub use events::{CompletionHandle, EventSet, HandleState};
pub use geometry::{CopyPlan, Direction, GeometryError, HostLayout, MAX_TILES, TileGeometry, TileShape};
pub use poller::{CompletionPoller, DEFAULT_RETRY_BUDGET, PollStats};
pub use tiles::{Tile, TileArray, TileSet};
pub use verify::{Element, IntegrityError};
