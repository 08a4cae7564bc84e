// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pure numeric pixel helpers.
//!
//! The renderer reaches these through the [`PixelOps`] capability so a host
//! can substitute an accelerated implementation. The trait's provided methods
//! are the software reference; [`SoftwarePixelOps`] uses them unchanged.

use crate::buffer::BYTES_PER_PIXEL;

/// Estimated memory footprint of an RGBA8 array texture, in bytes.
#[inline]
#[must_use]
pub const fn texture_memory_bytes(width: u32, height: u32, depth: u32) -> u64 {
    width as u64 * height as u64 * depth as u64 * BYTES_PER_PIXEL as u64
}

/// Swaps row `r` with row `height - 1 - r` of a tightly packed RGBA8 image.
///
/// # Panics
///
/// Panics if `pixels` is not exactly `width × height × 4` bytes.
pub fn flip_rows_vertically(pixels: &mut [u8], width: u32, height: u32) {
    let Some((top, bottom, row_len)) = split_halves(pixels, width, height) else {
        return;
    };
    for (upper, lower) in top
        .chunks_exact_mut(row_len)
        .zip(bottom.chunks_exact_mut(row_len).rev())
    {
        upper.swap_with_slice(lower);
    }
}

/// Splits an image into its top half and bottom half rows, skipping the
/// middle row of an odd-height image.
fn split_halves(
    pixels: &mut [u8],
    width: u32,
    height: u32,
) -> Option<(&mut [u8], &mut [u8], usize)> {
    let row_len = width as usize * BYTES_PER_PIXEL;
    assert_eq!(
        pixels.len(),
        row_len * height as usize,
        "pixel buffer must be width × height × 4 bytes"
    );
    if row_len == 0 || height < 2 {
        return None;
    }
    let half = (height / 2) as usize * row_len;
    let (top, rest) = pixels.split_at_mut(half);
    let skip = rest.len() - half;
    Some((top, &mut rest[skip..], row_len))
}

/// Numeric helpers used by the renderer.
///
/// Both methods have software implementations; override them to plug in an
/// accelerated version. Overrides must produce identical results.
pub trait PixelOps {
    /// Memory an array texture of the given extent occupies, for diagnostics.
    fn estimate_texture_memory_bytes(&self, width: u32, height: u32, depth: u32) -> u64 {
        texture_memory_bytes(width, height, depth)
    }

    /// Flips a tightly packed RGBA8 image upside down in place.
    ///
    /// # Panics
    ///
    /// Panics if `pixels` is not exactly `width × height × 4` bytes.
    fn flip_rows_vertically(&self, pixels: &mut [u8], width: u32, height: u32) {
        flip_rows_vertically(pixels, width, height);
    }
}

/// The software reference [`PixelOps`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SoftwarePixelOps;

impl PixelOps for SoftwarePixelOps {}

/// A [`PixelOps`] that flips rows on the rayon thread pool.
#[cfg(feature = "parallel")]
#[derive(Clone, Copy, Debug, Default)]
pub struct ParallelPixelOps;

#[cfg(feature = "parallel")]
impl PixelOps for ParallelPixelOps {
    fn flip_rows_vertically(&self, pixels: &mut [u8], width: u32, height: u32) {
        use rayon::prelude::*;

        let Some((top, bottom, row_len)) = split_halves(pixels, width, height) else {
            return;
        };
        top.par_chunks_exact_mut(row_len)
            .zip(bottom.par_chunks_exact_mut(row_len).rev())
            .for_each(|(upper, lower)| upper.swap_with_slice(lower));
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    fn numbered(width: u32, height: u32) -> Vec<u8> {
        (0..width * height * 4)
            .map(|i| u8::try_from(i % 251).unwrap())
            .collect()
    }

    fn row(pixels: &[u8], width: u32, r: u32) -> &[u8] {
        let len = width as usize * 4;
        &pixels[r as usize * len..(r as usize + 1) * len]
    }

    #[test]
    fn memory_estimate() {
        assert_eq!(texture_memory_bytes(1920, 1080, 16), 1920 * 1080 * 16 * 4);
        assert_eq!(SoftwarePixelOps.estimate_texture_memory_bytes(0, 5, 3), 0);
    }

    #[test]
    fn flip_swaps_rows_and_keeps_middle_row() {
        let original = numbered(3, 5);
        let mut flipped = original.clone();
        SoftwarePixelOps.flip_rows_vertically(&mut flipped, 3, 5);
        for r in 0..5 {
            assert_eq!(row(&flipped, 3, r), row(&original, 3, 4 - r));
        }
    }

    #[test]
    fn flip_twice_is_identity() {
        let original = numbered(4, 6);
        let mut pixels = original.clone();
        flip_rows_vertically(&mut pixels, 4, 6);
        assert_ne!(pixels, original);
        flip_rows_vertically(&mut pixels, 4, 6);
        assert_eq!(pixels, original);
    }

    #[test]
    fn flip_degenerate_images() {
        let mut empty: [u8; 0] = [];
        flip_rows_vertically(&mut empty, 0, 7);
        let mut single = [1, 2, 3, 4];
        flip_rows_vertically(&mut single, 1, 1);
        assert_eq!(single, [1, 2, 3, 4]);
    }

    #[test]
    #[should_panic(expected = "width × height × 4")]
    fn flip_rejects_wrong_length() {
        let mut pixels = [0_u8; 10];
        flip_rows_vertically(&mut pixels, 2, 2);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_flip_matches_software() {
        let original = numbered(17, 33);
        let mut expected = original.clone();
        let mut actual = original;
        SoftwarePixelOps.flip_rows_vertically(&mut expected, 17, 33);
        ParallelPixelOps.flip_rows_vertically(&mut actual, 17, 33);
        assert_eq!(actual, expected);
    }
}
