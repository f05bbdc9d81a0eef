// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Tiles and the fixed-capacity container that holds them.

use std::sync::Arc;

use smallvec::SmallVec;
use tilecopy_memory::{AcceleratorRuntime, DeviceAllocation, DevicePtr, RuntimeError, Status};

use crate::error::TransferError;
use crate::geometry::{GeometryError, MAX_TILES, TileGeometry};

/// Largest alignment requested for a tile allocation.
const MAX_TILE_ALIGNMENT: usize = 2 << 20;

/// Bounds-checked array with inline room for [`MAX_TILES`] items. It never
/// grows past that capacity.
#[derive(Debug)]
pub struct TileArray<T> {
    items: SmallVec<[T; MAX_TILES]>,
}

impl<T> Default for TileArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TileArray<T> {
    pub fn new() -> Self {
        Self {
            items: SmallVec::new(),
        }
    }

    /// Append an item, failing once [`MAX_TILES`] items are held.
    pub fn try_push(&mut self, item: T) -> Result<(), TransferError> {
        if self.items.len() == MAX_TILES {
            return Err(TransferError::Capacity {
                requested: MAX_TILES + 1,
                capacity: MAX_TILES,
            });
        }
        self.items.push(item);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&T, TransferError> {
        let count = self.items.len();
        self.items
            .get(index)
            .ok_or(TransferError::Geometry(GeometryError::TileIndex { index, count }))
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut T, TransferError> {
        let count = self.items.len();
        self.items
            .get_mut(index)
            .ok_or(TransferError::Geometry(GeometryError::TileIndex { index, count }))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    /// Remove and return the last item.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }
}

/// One tile: its place in the host buffer and its own device allocation.
#[derive(Debug)]
pub struct Tile {
    index: usize,
    host_offset: usize,
    allocation: DeviceAllocation,
}

impl Tile {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn host_offset(&self) -> usize {
        self.host_offset
    }

    /// Opaque handle of the tile's device region.
    pub fn device_handle(&self) -> DevicePtr {
        self.allocation.ptr()
    }

    pub fn allocation(&self) -> &DeviceAllocation {
        &self.allocation
    }
}

/// Every tile of a geometry, each with a disjoint device allocation.
#[derive(Debug)]
pub struct TileSet {
    tiles: TileArray<Tile>,
}

impl TileSet {
    /// Allocate one resident device region per tile.
    ///
    /// Regions are aligned to the tile size (rounded up to a power of two and
    /// capped at 2 MiB).
    pub fn allocate(
        runtime: Arc<dyn AcceleratorRuntime>,
        geometry: &TileGeometry,
    ) -> Result<Self, TransferError> {
        let alignment = geometry
            .device_len()
            .next_power_of_two()
            .min(MAX_TILE_ALIGNMENT);

        let mut tiles = TileArray::new();
        for index in 0..geometry.tile_count() {
            let allocation =
                DeviceAllocation::new(runtime.clone(), geometry.device_len(), alignment)?;
            tracing::debug!(
                tile = index,
                ptr = %allocation.ptr(),
                len = allocation.len(),
                "allocated tile"
            );
            tiles.try_push(Tile {
                index,
                host_offset: geometry.host_offset(index)?,
                allocation,
            })?;
        }

        let set = Self { tiles };
        if let Some((a, b)) = set.first_overlap() {
            tracing::error!(a, b, "device allocations of two tiles alias");
            return Err(RuntimeError::new("alloc_device", Status::OverlappingRegions).into());
        }
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Tile, TransferError> {
        self.tiles.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// First pair of tiles whose device allocations share a byte.
    pub fn first_overlap(&self) -> Option<(usize, usize)> {
        let tiles: Vec<&Tile> = self.tiles.iter().collect();
        for (i, a) in tiles.iter().enumerate() {
            for b in &tiles[i + 1..] {
                if a.allocation.overlaps(&b.allocation) {
                    return Some((a.index, b.index));
                }
            }
        }
        None
    }

    /// Free every allocation, last tile first. All tiles are released even if
    /// one fails; the first failure is returned.
    pub fn release(&mut self) -> Result<(), TransferError> {
        let mut first_err = None;
        while let Some(tile) = self.tiles.pop() {
            if let Err(e) = tile.allocation.release() {
                tracing::warn!(tile = tile.index, "failed to free tile allocation: {e}");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}
