// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tile-granular dirty tracking.
//!
//! A [`TileDirtyTracker`] partitions a `width` × `height` pixel buffer into
//! square tiles of a fixed size, in row-major order. Tiles on the right and
//! bottom edges are clipped to the buffer bounds, so the tiles cover every
//! pixel exactly once.
//!
//! # Contract
//!
//! Every mutation of the owning buffer must mark the affected pixels with
//! [`mark_dirty`](TileDirtyTracker::mark_dirty). The renderer assumes that
//! bytes outside tiles marked since the last upload are unchanged. It clears
//! individual tiles after uploading them as regions, and calls
//! [`reset_dirty_states`](TileDirtyTracker::reset_dirty_states) after a full
//! upload.

use alloc::vec::Vec;

use crate::geometry::PixelRect;

/// Default edge length of a tile, in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 32;

/// One square (or edge-clipped) region of a layer buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile {
    index: usize,
    rect: PixelRect,
    size: u32,
    dirty: bool,
}

impl Tile {
    /// Position of the tile in the tracker's row-major tile list.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Top-left pixel of the tile.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> (u32, u32) {
        (self.rect.x, self.rect.y)
    }

    /// Nominal edge length (before clipping to the buffer bounds).
    #[inline]
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Pixel area covered by the tile, already clipped to the buffer bounds.
    #[inline]
    #[must_use]
    pub const fn rect(&self) -> PixelRect {
        self.rect
    }

    /// Whether the tile changed since it was last uploaded.
    #[inline]
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Dirty flags for the tiles of one layer buffer.
#[derive(Clone, Debug)]
pub struct TileDirtyTracker {
    width: u32,
    height: u32,
    tile_size: u32,
    columns: u32,
    rows: u32,
    tiles: Vec<Tile>,
    dirty_count: usize,
}

impl TileDirtyTracker {
    /// Creates a tracker for a `width` × `height` buffer with all tiles clean.
    ///
    /// # Panics
    ///
    /// Panics if `tile_size` is zero.
    #[must_use]
    pub fn new(width: u32, height: u32, tile_size: u32) -> Self {
        assert!(tile_size > 0, "tile size must be non-zero");
        let columns = width.div_ceil(tile_size);
        let rows = height.div_ceil(tile_size);
        let mut tiles = Vec::with_capacity(columns as usize * rows as usize);
        for row in 0..rows {
            for column in 0..columns {
                let x = column * tile_size;
                let y = row * tile_size;
                tiles.push(Tile {
                    index: tiles.len(),
                    rect: PixelRect::new(
                        x,
                        y,
                        tile_size.min(width - x),
                        tile_size.min(height - y),
                    ),
                    size: tile_size,
                    dirty: false,
                });
            }
        }
        Self {
            width,
            height,
            tile_size,
            columns,
            rows,
            tiles,
            dirty_count: 0,
        }
    }

    /// Width of the tracked buffer.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the tracked buffer.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Nominal tile edge length.
    #[inline]
    #[must_use]
    pub const fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Number of tile columns and rows.
    #[inline]
    #[must_use]
    pub const fn grid(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// All tiles in row-major order.
    #[inline]
    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Number of dirty tiles.
    #[inline]
    #[must_use]
    pub const fn dirty_count(&self) -> usize {
        self.dirty_count
    }

    /// Returns `true` if any tile is dirty.
    #[inline]
    #[must_use]
    pub const fn has_dirty(&self) -> bool {
        self.dirty_count > 0
    }

    /// Iterates over the dirty tiles in row-major order.
    pub fn dirty_tiles(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.tiles.iter().filter(|tile| tile.dirty)
    }

    /// Marks every tile overlapping `region` dirty.
    ///
    /// Parts of `region` outside the buffer are ignored.
    pub fn mark_dirty(&mut self, region: PixelRect) {
        let Some(region) = region.clip_to(self.width, self.height) else {
            return;
        };
        let first_column = region.x / self.tile_size;
        let last_column = (region.right() - 1) / self.tile_size;
        let first_row = region.y / self.tile_size;
        let last_row = (region.bottom() - 1) / self.tile_size;
        for row in first_row..=last_row {
            for column in first_column..=last_column {
                let index = (row * self.columns + column) as usize;
                self.set_dirty(index);
            }
        }
    }

    /// Marks every tile covering a fractional area dirty.
    pub fn mark_dirty_area(&mut self, area: kurbo::Rect) {
        if let Some(region) = PixelRect::covering(area) {
            self.mark_dirty(region);
        }
    }

    /// Marks the whole buffer dirty.
    pub fn mark_all_dirty(&mut self) {
        for tile in &mut self.tiles {
            tile.dirty = true;
        }
        self.dirty_count = self.tiles.len();
    }

    /// Clears the dirty flag of the tile at `index`.
    ///
    /// Out-of-range indices are ignored.
    pub fn clear_tile(&mut self, index: usize) {
        if let Some(tile) = self.tiles.get_mut(index)
            && tile.dirty
        {
            tile.dirty = false;
            self.dirty_count -= 1;
        }
    }

    /// Clears every dirty flag.
    pub fn reset_dirty_states(&mut self) {
        for tile in &mut self.tiles {
            tile.dirty = false;
        }
        self.dirty_count = 0;
    }

    fn set_dirty(&mut self, index: usize) {
        let tile = &mut self.tiles[index];
        if !tile.dirty {
            tile.dirty = true;
            self.dirty_count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    #[test]
    fn tiles_partition_buffer_with_clipped_edges() {
        let tracker = TileDirtyTracker::new(70, 40, 32);
        assert_eq!(tracker.grid(), (3, 2));
        assert_eq!(tracker.tiles().len(), 6);

        let last = tracker.tiles()[5];
        assert_eq!(last.offset(), (64, 32));
        assert_eq!(last.rect(), PixelRect::new(64, 32, 6, 8));
        assert_eq!(last.size(), 32);

        let covered: u64 = tracker.tiles().iter().map(|t| t.rect().area()).sum();
        assert_eq!(covered, 70 * 40, "tiles must cover every pixel exactly once");
    }

    #[test]
    fn mark_dirty_hits_overlapping_tiles_once() {
        let mut tracker = TileDirtyTracker::new(64, 64, 16);
        tracker.mark_dirty(PixelRect::new(10, 10, 10, 4));
        tracker.mark_dirty(PixelRect::new(12, 12, 2, 2));

        let dirty: Vec<usize> = tracker.dirty_tiles().map(Tile::index).collect();
        assert_eq!(dirty, [0, 1]);
        assert_eq!(tracker.dirty_count(), 2);
    }

    #[test]
    fn mark_dirty_ignores_out_of_bounds() {
        let mut tracker = TileDirtyTracker::new(20, 20, 8);
        tracker.mark_dirty(PixelRect::new(30, 30, 5, 5));
        assert!(!tracker.has_dirty());

        tracker.mark_dirty(PixelRect::new(18, 18, 100, 100));
        let dirty: Vec<usize> = tracker.dirty_tiles().map(Tile::index).collect();
        assert_eq!(dirty, [8]);
    }

    #[test]
    fn mark_dirty_area_covers_fractional_edges() {
        let mut tracker = TileDirtyTracker::new(32, 32, 8);
        tracker.mark_dirty_area(kurbo::Rect::new(7.5, 0.0, 8.5, 1.0));
        let dirty: Vec<usize> = tracker.dirty_tiles().map(Tile::index).collect();
        assert_eq!(dirty, [0, 1]);
    }

    #[test]
    fn clear_and_reset() {
        let mut tracker = TileDirtyTracker::new(32, 32, 16);
        tracker.mark_all_dirty();
        assert_eq!(tracker.dirty_count(), 4);

        tracker.clear_tile(2);
        tracker.clear_tile(2);
        tracker.clear_tile(99);
        assert_eq!(tracker.dirty_count(), 3);

        tracker.reset_dirty_states();
        assert_eq!(tracker.dirty_tiles().count(), 0);
        assert!(!tracker.has_dirty());
    }

    #[test]
    fn empty_buffer_has_no_tiles() {
        let mut tracker = TileDirtyTracker::new(0, 10, 16);
        tracker.mark_dirty(PixelRect::new(0, 0, 10, 10));
        assert!(tracker.tiles().is_empty());
        assert!(!tracker.has_dirty());
    }
}
