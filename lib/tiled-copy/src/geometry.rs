// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Tile geometry planning.
//!
//! A host buffer holding `tile_count` tiles is mapped onto one device
//! allocation per tile. With [`HostLayout::SideBySide`] the tiles sit next to
//! each other along the row, so every host row spans all tiles and the host
//! pitch is `tile_count` times the device pitch. With [`HostLayout::Stacked`]
//! each tile is contiguous and both sides share the same pitch.
//!
//! Every function here is pure: the same inputs always produce the same plan.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tilecopy_memory::Region;

/// Hard upper bound on the number of tiles.
pub const MAX_TILES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    HostToDevice,
    DeviceToHost,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::HostToDevice => f.write_str("H2D"),
            Direction::DeviceToHost => f.write_str("D2H"),
        }
    }
}

/// Arrangement of the tiles inside the host buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HostLayout {
    /// Tiles side by side; a host row spans every tile.
    #[default]
    SideBySide,
    /// Each tile contiguous; tile `i` starts at `i * tile_bytes`.
    Stacked,
}

impl fmt::Display for HostLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostLayout::SideBySide => f.write_str("side-by-side"),
            HostLayout::Stacked => f.write_str("stacked"),
        }
    }
}

impl FromStr for HostLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "side-by-side" | "sidebyside" | "side_by_side" => Ok(HostLayout::SideBySide),
            "stacked" | "contiguous" => Ok(HostLayout::Stacked),
            other => Err(format!("unknown host layout `{other}`")),
        }
    }
}

/// Extent of one tile: `width` x `height` elements of `element_size` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileShape {
    pub width: u32,
    pub height: u32,
    pub element_size: u32,
}

impl TileShape {
    /// Shape of a tile of `T` elements.
    pub fn of<T>(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            element_size: std::mem::size_of::<T>() as u32,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("tile count {count} outside 1..={max}")]
    TileCount { count: usize, max: usize },

    #[error("tile index {index} out of range for {count} tiles")]
    TileIndex { index: usize, count: usize },

    #[error("tile shape {width}x{height} with {element_size}-byte elements is empty")]
    EmptyTile {
        width: u32,
        height: u32,
        element_size: u32,
    },

    #[error("tile extent overflows the addressable copy region")]
    ExtentOverflow,

    #[error("{side} extent of tile {tile} ends at byte {end}, past the {len}-byte allocation")]
    OutOfBounds {
        tile: usize,
        side: &'static str,
        end: usize,
        len: usize,
    },
}

/// Byte offset and row pitch of one side of a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub offset: usize,
    pub pitch: usize,
}

/// Row pitches in copy order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchPair {
    pub src: usize,
    pub dst: usize,
}

/// Everything needed to issue the copy of one tile in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyPlan {
    pub tile: usize,
    pub direction: Direction,
    pub host: Placement,
    pub device: Placement,
    /// Extent of the copy; width in bytes, height in rows.
    pub region: Region,
}

impl CopyPlan {
    pub fn src(&self) -> Placement {
        match self.direction {
            Direction::HostToDevice => self.host,
            Direction::DeviceToHost => self.device,
        }
    }

    pub fn dst(&self) -> Placement {
        match self.direction {
            Direction::HostToDevice => self.device,
            Direction::DeviceToHost => self.host,
        }
    }

    pub fn pitches(&self) -> PitchPair {
        PitchPair {
            src: self.src().pitch,
            dst: self.dst().pitch,
        }
    }

    /// Reject the plan unless both sides stay inside their allocations.
    pub fn check_bounds(&self, host_len: usize, device_len: usize) -> Result<(), GeometryError> {
        for (side, placement, len) in [
            ("host", self.host, host_len),
            ("device", self.device, device_len),
        ] {
            let end = placement.offset + self.region.end(placement.pitch, 0);
            if end > len {
                return Err(GeometryError::OutOfBounds {
                    tile: self.tile,
                    side,
                    end,
                    len,
                });
            }
        }
        Ok(())
    }
}

/// Geometry of a full set of tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGeometry {
    shape: TileShape,
    tile_count: usize,
    layout: HostLayout,
    row_bytes: u32,
    tile_bytes: usize,
}

impl TileGeometry {
    /// # Errors
    /// Returns an error if:
    /// - `tile_count` is 0 or above [`MAX_TILES`]
    /// - the shape has no bytes
    /// - a row or the host buffer would not be addressable
    pub fn new(shape: TileShape, tile_count: usize, layout: HostLayout) -> Result<Self, GeometryError> {
        if tile_count == 0 || tile_count > MAX_TILES {
            return Err(GeometryError::TileCount {
                count: tile_count,
                max: MAX_TILES,
            });
        }
        if shape.width == 0 || shape.height == 0 || shape.element_size == 0 {
            return Err(GeometryError::EmptyTile {
                width: shape.width,
                height: shape.height,
                element_size: shape.element_size,
            });
        }

        let row_bytes = shape
            .width
            .checked_mul(shape.element_size)
            .ok_or(GeometryError::ExtentOverflow)?;
        let tile_bytes = (row_bytes as usize)
            .checked_mul(shape.height as usize)
            .ok_or(GeometryError::ExtentOverflow)?;
        tile_bytes
            .checked_mul(tile_count)
            .ok_or(GeometryError::ExtentOverflow)?;

        Ok(Self {
            shape,
            tile_count,
            layout,
            row_bytes,
            tile_bytes,
        })
    }

    pub fn shape(&self) -> TileShape {
        self.shape
    }

    pub fn tile_count(&self) -> usize {
        self.tile_count
    }

    pub fn layout(&self) -> HostLayout {
        self.layout
    }

    /// Bytes in one tile row.
    pub fn row_bytes(&self) -> usize {
        self.row_bytes as usize
    }

    pub fn tile_bytes(&self) -> usize {
        self.tile_bytes
    }

    /// Host row pitch, identical for every tile.
    pub fn host_row_pitch(&self) -> usize {
        match self.layout {
            HostLayout::SideBySide => self.tile_count * self.row_bytes(),
            HostLayout::Stacked => self.row_bytes(),
        }
    }

    /// Device row pitch, independent of the tile count.
    pub fn device_row_pitch(&self) -> usize {
        self.row_bytes()
    }

    /// Size of the host buffer holding every tile.
    pub fn host_len(&self) -> usize {
        self.tile_count * self.tile_bytes
    }

    /// Size of each per-tile device allocation.
    pub fn device_len(&self) -> usize {
        self.tile_bytes
    }

    /// Number of elements in the host buffer.
    pub fn host_elements(&self) -> usize {
        self.host_len() / self.shape.element_size as usize
    }

    /// Byte offset of tile `index` into the host buffer.
    pub fn host_offset(&self, index: usize) -> Result<usize, GeometryError> {
        self.check_index(index)?;
        Ok(match self.layout {
            HostLayout::SideBySide => index * self.row_bytes(),
            HostLayout::Stacked => index * self.tile_bytes,
        })
    }

    /// Copy extent shared by every tile.
    pub fn region(&self) -> Region {
        Region::rect(self.row_bytes, self.shape.height)
    }

    /// Plan the copy of tile `index` in `direction`.
    pub fn plan(&self, index: usize, direction: Direction) -> Result<CopyPlan, GeometryError> {
        let plan = CopyPlan {
            tile: index,
            direction,
            host: Placement {
                offset: self.host_offset(index)?,
                pitch: self.host_row_pitch(),
            },
            device: Placement {
                offset: 0,
                pitch: self.device_row_pitch(),
            },
            region: self.region(),
        };
        plan.check_bounds(self.host_len(), self.device_len())?;
        Ok(plan)
    }

    fn check_index(&self, index: usize) -> Result<(), GeometryError> {
        if index >= self.tile_count {
            return Err(GeometryError::TileIndex {
                index,
                count: self.tile_count,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn geometry(count: usize, layout: HostLayout) -> TileGeometry {
        TileGeometry::new(TileShape::of::<f32>(512, 512), count, layout).unwrap()
    }

    #[test]
    fn test_side_by_side_pitches() {
        let g = geometry(4, HostLayout::SideBySide);
        assert_eq!(g.row_bytes(), 2048);
        assert_eq!(g.host_row_pitch(), 4 * 2048);
        assert_eq!(g.device_row_pitch(), 2048);
        assert_eq!(g.host_offset(3).unwrap(), 3 * 2048);
        assert_eq!(g.host_len(), 4 * 512 * 512 * 4);

        let plan = g.plan(1, Direction::HostToDevice).unwrap();
        assert_eq!(plan.pitches(), PitchPair { src: 8192, dst: 2048 });
        assert_eq!(plan.src().offset, 2048);
        assert_eq!(plan.dst().offset, 0);
        assert_eq!(plan.region, Region::rect(2048, 512));
    }

    #[test]
    fn test_directions_swap() {
        let g = geometry(4, HostLayout::SideBySide);
        let h2d = g.plan(2, Direction::HostToDevice).unwrap();
        let d2h = g.plan(2, Direction::DeviceToHost).unwrap();
        assert_eq!(h2d.src(), d2h.dst());
        assert_eq!(h2d.dst(), d2h.src());
        assert_eq!(h2d.region, d2h.region);
    }

    #[test]
    fn test_stacked_layout() {
        let g = geometry(3, HostLayout::Stacked);
        assert_eq!(g.host_row_pitch(), g.device_row_pitch());
        assert_eq!(g.host_offset(2).unwrap(), 2 * g.tile_bytes());
    }

    #[test]
    fn test_rejects_bad_input() {
        let shape = TileShape::of::<f32>(512, 512);
        assert_eq!(
            TileGeometry::new(shape, 0, HostLayout::SideBySide),
            Err(GeometryError::TileCount { count: 0, max: MAX_TILES })
        );
        assert!(TileGeometry::new(shape, MAX_TILES + 1, HostLayout::SideBySide).is_err());
        assert!(matches!(
            TileGeometry::new(TileShape::of::<f32>(0, 512), 1, HostLayout::SideBySide),
            Err(GeometryError::EmptyTile { .. })
        ));
        assert_eq!(
            TileGeometry::new(TileShape::of::<f64>(u32::MAX, 1), 1, HostLayout::SideBySide),
            Err(GeometryError::ExtentOverflow)
        );

        let g = geometry(4, HostLayout::SideBySide);
        assert_eq!(
            g.plan(4, Direction::DeviceToHost),
            Err(GeometryError::TileIndex { index: 4, count: 4 })
        );
    }

    #[test]
    fn test_check_bounds() {
        let g = geometry(2, HostLayout::SideBySide);
        let plan = g.plan(1, Direction::HostToDevice).unwrap();
        assert!(plan.check_bounds(g.host_len(), g.device_len()).is_ok());
        assert!(matches!(
            plan.check_bounds(g.host_len() - 1, g.device_len()),
            Err(GeometryError::OutOfBounds { side: "host", .. })
        ));
        assert!(matches!(
            plan.check_bounds(g.host_len(), g.device_len() - 1),
            Err(GeometryError::OutOfBounds { side: "device", .. })
        ));
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("stacked".parse::<HostLayout>(), Ok(HostLayout::Stacked));
        assert_eq!(" Side-By-Side ".parse::<HostLayout>(), Ok(HostLayout::SideBySide));
        assert!("diagonal".parse::<HostLayout>().is_err());
    }

    proptest! {
        #[test]
        fn prop_pitches_independent_of_index(
            count in 1usize..=MAX_TILES,
            width in 1u32..1024,
            height in 1u32..64,
        ) {
            let g = TileGeometry::new(TileShape::of::<f32>(width, height), count, HostLayout::SideBySide).unwrap();
            for i in 0..count {
                let plan = g.plan(i, Direction::HostToDevice).unwrap();
                prop_assert_eq!(plan.host.pitch, count * width as usize * 4);
                prop_assert_eq!(plan.device.pitch, width as usize * 4);
            }
        }

        /// Every host byte belongs to exactly one tile.
        #[test]
        fn prop_tiles_partition_host_buffer(
            count in 1usize..=16,
            width in 1u32..32,
            height in 1u32..16,
            stacked in any::<bool>(),
        ) {
            let layout = if stacked { HostLayout::Stacked } else { HostLayout::SideBySide };
            let g = TileGeometry::new(TileShape::of::<u32>(width, height), count, layout).unwrap();
            let mut owner = vec![usize::MAX; g.host_len()];
            for i in 0..count {
                let plan = g.plan(i, Direction::HostToDevice).unwrap();
                for row in 0..height as usize {
                    let start = plan.host.offset + row * plan.host.pitch;
                    for byte in &mut owner[start..start + g.row_bytes()] {
                        prop_assert_eq!(*byte, usize::MAX);
                        *byte = i;
                    }
                }
            }
            prop_assert!(owner.iter().all(|o| *o != usize::MAX));
        }
    }
}
