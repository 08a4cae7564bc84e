// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer pixel rectangles.

use core::fmt;

/// An axis-aligned rectangle in pixel coordinates.
///
/// The origin is the top-left corner of row 0 of a layer buffer. A rectangle
/// with zero width or height covers no pixels.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRect {
    /// Creates a rectangle from its origin and size.
    #[inline]
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle covering a whole `width` × `height` surface.
    #[inline]
    #[must_use]
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Returns `true` if the rectangle covers no pixels.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge, saturating at `u32::MAX`.
    #[inline]
    #[must_use]
    pub const fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge, saturating at `u32::MAX`.
    #[inline]
    #[must_use]
    pub const fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Number of pixels covered.
    #[inline]
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns the overlap of two rectangles, or `None` if they are disjoint.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        (x0 < x1 && y0 < y1).then(|| Self::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Clips the rectangle to a `width` × `height` surface.
    #[inline]
    #[must_use]
    pub fn clip_to(&self, width: u32, height: u32) -> Option<Self> {
        self.intersect(&Self::from_size(width, height))
    }

    /// Returns `true` if the rectangle lies entirely inside a
    /// `width` × `height` surface.
    #[inline]
    #[must_use]
    pub const fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width && self.bottom() <= height
    }

    /// Returns the smallest pixel rectangle covering a fractional area.
    ///
    /// Brush stamps and selection outlines produce `kurbo` rectangles with
    /// sub-pixel edges; every pixel they touch is included. Negative
    /// coordinates are clamped to zero. Returns `None` for areas that cover no
    /// pixel at all.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "edges are rounded and clamped to the u32 range before casting"
    )]
    pub fn covering(area: kurbo::Rect) -> Option<Self> {
        let area = area.abs().expand();
        if !(area.x1 > 0.0 && area.y1 > 0.0) {
            return None;
        }
        let clamp = |v: f64| v.clamp(0.0, f64::from(u32::MAX)) as u32;
        let (x0, y0) = (clamp(area.x0), clamp(area.y0));
        let (x1, y1) = (clamp(area.x1), clamp(area.y1));
        let rect = Self::new(x0, y0, x1 - x0, y1 - y0);
        (!rect.is_empty()).then_some(rect)
    }
}

impl fmt::Debug for PixelRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PixelRect({},{} {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}

impl From<PixelRect> for kurbo::Rect {
    fn from(rect: PixelRect) -> Self {
        Self::new(
            f64::from(rect.x),
            f64::from(rect.y),
            f64::from(rect.right()),
            f64::from(rect.bottom()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersect_overlapping_and_disjoint() {
        let a = PixelRect::new(0, 0, 10, 10);
        let b = PixelRect::new(5, 8, 10, 10);
        assert_eq!(a.intersect(&b), Some(PixelRect::new(5, 8, 5, 2)));

        let c = PixelRect::new(10, 0, 4, 4);
        assert_eq!(a.intersect(&c), None, "touching edges do not overlap");
    }

    #[test]
    fn clip_to_surface() {
        let r = PixelRect::new(60, 60, 10, 10);
        assert_eq!(r.clip_to(64, 62), Some(PixelRect::new(60, 60, 4, 2)));
        assert_eq!(r.clip_to(50, 50), None);
        assert!(!r.fits_within(64, 64));
        assert!(r.fits_within(70, 70));
    }

    #[test]
    fn covering_rounds_outward() {
        let r = PixelRect::covering(kurbo::Rect::new(1.5, 2.25, 3.1, 4.0)).unwrap();
        assert_eq!(r, PixelRect::new(1, 2, 3, 2));
    }

    #[test]
    fn covering_clamps_negative_origin() {
        let r = PixelRect::covering(kurbo::Rect::new(-4.0, -1.0, 2.0, 3.0)).unwrap();
        assert_eq!(r, PixelRect::new(0, 0, 2, 3));
        assert_eq!(
            PixelRect::covering(kurbo::Rect::new(-5.0, -5.0, -1.0, -1.0)),
            None
        );
    }
}
