// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! RGBA8 layer pixel buffers.
//!
//! A [`LayerBuffer`] owns the pixels of exactly one layer: `width × height`
//! texels, row-major, four bytes per texel, no row padding. Every editing
//! operation here marks the tiles it touched in the buffer's
//! [`TileDirtyTracker`], so incremental uploads stay consistent with the
//! pixel data.
//!
//! Direct byte access goes through [`LayerBuffer::edit`], which takes the
//! region up front so the tiles can be marked before the caller writes.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::geometry::PixelRect;
use crate::tile::{DEFAULT_TILE_SIZE, TileDirtyTracker};

/// Bytes per texel (RGBA8).
pub const BYTES_PER_PIXEL: usize = 4;

/// Errors from [`LayerBuffer`] operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferError {
    /// A pixel slice did not have the length its dimensions require.
    LengthMismatch {
        /// Required length in bytes.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },
    /// A region extends past the buffer bounds.
    RegionOutOfBounds {
        /// The offending region.
        region: PixelRect,
        /// Buffer width.
        width: u32,
        /// Buffer height.
        height: u32,
    },
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch { expected, actual } => {
                write!(f, "pixel data is {actual} bytes, expected {expected}")
            }
            Self::RegionOutOfBounds {
                region,
                width,
                height,
            } => write!(f, "{region:?} exceeds {width}x{height} buffer"),
        }
    }
}

impl core::error::Error for BufferError {}

/// Returns the byte length of a tightly packed `width` × `height` RGBA8 image.
#[inline]
#[must_use]
pub const fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * BYTES_PER_PIXEL
}

/// Pixels and tile dirty state of one layer.
#[derive(Clone)]
pub struct LayerBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    tiles: TileDirtyTracker,
}

impl fmt::Debug for LayerBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("tiles", &self.tiles.tiles().len())
            .field("dirty", &self.tiles.dirty_count())
            .finish_non_exhaustive()
    }
}

impl LayerBuffer {
    /// Creates a fully transparent buffer with [`DEFAULT_TILE_SIZE`] tiles.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_tile_size(width, height, DEFAULT_TILE_SIZE)
    }

    /// Creates a fully transparent buffer with the given tile size.
    ///
    /// # Panics
    ///
    /// Panics if `tile_size` is zero.
    #[must_use]
    pub fn with_tile_size(width: u32, height: u32, tile_size: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; byte_len(width, height)],
            tiles: TileDirtyTracker::new(width, height, tile_size),
        }
    }

    /// Wraps existing pixel data. Every tile starts dirty.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::LengthMismatch`] if `pixels` is not exactly
    /// `width × height × 4` bytes.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, BufferError> {
        let expected = byte_len(width, height);
        if pixels.len() != expected {
            return Err(BufferError::LengthMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        let mut tiles = TileDirtyTracker::new(width, height, DEFAULT_TILE_SIZE);
        tiles.mark_all_dirty();
        Ok(Self {
            width,
            height,
            pixels,
            tiles,
        })
    }

    /// Buffer width in pixels.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Buffer height in pixels.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// The whole pixel buffer.
    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// The tile dirty state.
    #[inline]
    #[must_use]
    pub const fn tiles(&self) -> &TileDirtyTracker {
        &self.tiles
    }

    /// Mutable tile dirty state, for marking edits made elsewhere or clearing
    /// tiles after an upload.
    #[inline]
    pub fn tiles_mut(&mut self) -> &mut TileDirtyTracker {
        &mut self.tiles
    }

    /// Splits the buffer into read-only pixels and mutable tile state.
    ///
    /// Uploaders read pixels and clear tiles in the same pass.
    #[inline]
    pub fn split(&mut self) -> (&[u8], &mut TileDirtyTracker) {
        (&self.pixels, &mut self.tiles)
    }

    /// Returns the RGBA value at `(x, y)`, or `None` outside the buffer.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let at = self.offset_of(x, y);
        let mut out = [0; 4];
        out.copy_from_slice(&self.pixels[at..at + BYTES_PER_PIXEL]);
        Some(out)
    }

    /// Writes one pixel. Writes outside the buffer are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let at = self.offset_of(x, y);
        self.pixels[at..at + BYTES_PER_PIXEL].copy_from_slice(&rgba);
        self.tiles.mark_dirty(PixelRect::new(x, y, 1, 1));
    }

    /// Fills a rectangle with a single color. The rectangle is clipped to the
    /// buffer.
    pub fn fill_rect(&mut self, rect: PixelRect, rgba: [u8; 4]) {
        let Some(rect) = rect.clip_to(self.width, self.height) else {
            return;
        };
        for y in rect.y..rect.bottom() {
            let start = self.offset_of(rect.x, y);
            let row = &mut self.pixels[start..start + rect.width as usize * BYTES_PER_PIXEL];
            for texel in row.chunks_exact_mut(BYTES_PER_PIXEL) {
                texel.copy_from_slice(&rgba);
            }
        }
        self.tiles.mark_dirty(rect);
    }

    /// Clears the whole buffer to transparent black.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
        self.tiles.mark_all_dirty();
    }

    /// Copies tightly packed RGBA8 data into `region`.
    ///
    /// # Errors
    ///
    /// Fails without writing if `region` is outside the buffer or `texels`
    /// is not exactly `region.width × region.height × 4` bytes.
    pub fn write_region(&mut self, region: PixelRect, texels: &[u8]) -> Result<(), BufferError> {
        self.check_region(region)?;
        let expected = byte_len(region.width, region.height);
        if texels.len() != expected {
            return Err(BufferError::LengthMismatch {
                expected,
                actual: texels.len(),
            });
        }
        let row_len = region.width as usize * BYTES_PER_PIXEL;
        for (y, src) in (region.y..).zip(texels.chunks_exact(row_len.max(1))) {
            let start = self.offset_of(region.x, y);
            self.pixels[start..start + row_len].copy_from_slice(src);
        }
        self.tiles.mark_dirty(region);
        Ok(())
    }

    /// Runs `f` on each row slice of `region` (row index within the region,
    /// row bytes) after marking the region dirty.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::RegionOutOfBounds`] if `region` is outside the
    /// buffer.
    pub fn edit(
        &mut self,
        region: PixelRect,
        mut f: impl FnMut(u32, &mut [u8]),
    ) -> Result<(), BufferError> {
        self.check_region(region)?;
        self.tiles.mark_dirty(region);
        let row_len = region.width as usize * BYTES_PER_PIXEL;
        for dy in 0..region.height {
            let start = self.offset_of(region.x, region.y + dy);
            f(dy, &mut self.pixels[start..start + row_len]);
        }
        Ok(())
    }

    /// Copies `region` into `out` as tightly packed rows, replacing its
    /// contents.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::RegionOutOfBounds`] if `region` is outside the
    /// buffer.
    pub fn read_region(&self, region: PixelRect, out: &mut Vec<u8>) -> Result<(), BufferError> {
        self.check_region(region)?;
        copy_region(&self.pixels, self.width, region, out);
        Ok(())
    }

    /// Reallocates the buffer for a new canvas size.
    ///
    /// Pixels inside both the old and new bounds are kept; new area is
    /// transparent. The tile grid is rebuilt and every tile starts dirty.
    pub fn resize(&mut self, width: u32, height: u32) {
        let mut pixels = vec![0; byte_len(width, height)];
        let keep_w = self.width.min(width) as usize * BYTES_PER_PIXEL;
        for y in 0..self.height.min(height) as usize {
            let src = y * self.width as usize * BYTES_PER_PIXEL;
            let dst = y * width as usize * BYTES_PER_PIXEL;
            pixels[dst..dst + keep_w].copy_from_slice(&self.pixels[src..src + keep_w]);
        }
        self.pixels = pixels;
        self.width = width;
        self.height = height;
        self.tiles = TileDirtyTracker::new(width, height, self.tiles.tile_size());
        self.tiles.mark_all_dirty();
    }

    fn offset_of(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }

    fn check_region(&self, region: PixelRect) -> Result<(), BufferError> {
        if region.fits_within(self.width, self.height) {
            Ok(())
        } else {
            Err(BufferError::RegionOutOfBounds {
                region,
                width: self.width,
                height: self.height,
            })
        }
    }
}

/// Copies `region` of a tightly packed `width`-wide RGBA8 image into `out`,
/// replacing its contents with `region.width × region.height × 4` bytes.
///
/// The region must lie inside the image.
pub fn copy_region(pixels: &[u8], width: u32, region: PixelRect, out: &mut Vec<u8>) {
    out.clear();
    out.reserve(byte_len(region.width, region.height));
    let row_len = region.width as usize * BYTES_PER_PIXEL;
    for y in region.y..region.bottom() {
        let start = (y as usize * width as usize + region.x as usize) * BYTES_PER_PIXEL;
        out.extend_from_slice(&pixels[start..start + row_len]);
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;

    #[test]
    fn new_buffer_is_transparent_and_clean() {
        let buffer = LayerBuffer::new(5, 3);
        assert_eq!(buffer.pixels().len(), 5 * 3 * 4);
        assert!(buffer.pixels().iter().all(|&b| b == 0));
        assert!(!buffer.tiles().has_dirty());
    }

    #[test]
    fn from_pixels_checks_length() {
        let err = LayerBuffer::from_pixels(2, 2, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            BufferError::LengthMismatch {
                expected: 16,
                actual: 15
            }
        );
        let ok = LayerBuffer::from_pixels(2, 2, vec![7; 16]).unwrap();
        assert_eq!(ok.tiles().dirty_count(), 1);
    }

    #[test]
    fn fill_rect_writes_and_marks() {
        let mut buffer = LayerBuffer::with_tile_size(8, 8, 4);
        buffer.fill_rect(PixelRect::new(3, 3, 2, 2), [1, 2, 3, 4]);

        assert_eq!(buffer.pixel(3, 3), Some([1, 2, 3, 4]));
        assert_eq!(buffer.pixel(4, 4), Some([1, 2, 3, 4]));
        assert_eq!(buffer.pixel(2, 3), Some([0, 0, 0, 0]));
        assert_eq!(buffer.tiles().dirty_count(), 4, "2x2 fill straddles all four tiles");
    }

    #[test]
    fn write_and_read_region() {
        let mut buffer = LayerBuffer::with_tile_size(4, 4, 2);
        let texels: Vec<u8> = (0_u8..2 * 3 * 4).collect();
        let region = PixelRect::new(1, 1, 2, 3);
        buffer.write_region(region, &texels).unwrap();

        let mut out = Vec::new();
        buffer.read_region(region, &mut out).unwrap();
        assert_eq!(out, texels);
        assert_eq!(buffer.pixel(1, 1), Some([0, 1, 2, 3]));
        assert_eq!(buffer.pixel(2, 3), Some([20, 21, 22, 23]));
    }

    #[test]
    fn write_region_rejects_bad_input() {
        let mut buffer = LayerBuffer::new(4, 4);
        assert!(matches!(
            buffer.write_region(PixelRect::new(3, 3, 2, 2), &[0; 16]),
            Err(BufferError::RegionOutOfBounds { .. })
        ));
        assert!(matches!(
            buffer.write_region(PixelRect::new(0, 0, 2, 2), &[0; 12]),
            Err(BufferError::LengthMismatch { .. })
        ));
        assert!(!buffer.tiles().has_dirty(), "failed writes mark nothing");
    }

    #[test]
    fn edit_marks_region_before_writing() {
        let mut buffer = LayerBuffer::with_tile_size(16, 16, 8);
        buffer
            .edit(PixelRect::new(9, 0, 2, 2), |_, row| row.fill(0xff))
            .unwrap();
        let dirty: Vec<usize> = buffer.tiles().dirty_tiles().map(|t| t.index()).collect();
        assert_eq!(dirty, [1]);
        assert_eq!(buffer.pixel(10, 1), Some([0xff; 4]));
    }

    #[test]
    fn resize_keeps_overlap_and_dirties_everything() {
        let mut buffer = LayerBuffer::with_tile_size(4, 4, 2);
        buffer.set_pixel(1, 1, [9, 9, 9, 9]);
        buffer.set_pixel(3, 3, [5, 5, 5, 5]);
        buffer.tiles_mut().reset_dirty_states();

        buffer.resize(2, 6);
        assert_eq!(buffer.pixels().len(), 2 * 6 * 4);
        assert_eq!(buffer.pixel(1, 1), Some([9, 9, 9, 9]));
        assert_eq!(buffer.pixel(1, 5), Some([0, 0, 0, 0]));
        assert_eq!(buffer.tiles().dirty_count(), buffer.tiles().tiles().len());
    }
}
