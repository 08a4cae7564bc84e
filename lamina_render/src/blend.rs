// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference per-texel compositing math.
//!
//! This is the CPU definition of what the compositing shader computes. Colors
//! are straight (non-premultiplied) alpha in `0.0..=1.0`. Slices are folded
//! bottom-up onto a transparent backdrop:
//!
//! ```text
//!   as    = texel.a × opacity
//!   B     = blend(mode, cb, cs)
//!   mixed = (1 − ab)·cs + ab·B
//!   ao    = as + ab·(1 − as)
//!   co    = (as·mixed + ab·(1 − as)·cb) / ao
//! ```

use lamina_core::layer::BlendMode;

/// A straight-alpha RGBA color with components in `0.0..=1.0`.
pub type Rgba = [f32; 4];

/// Applies the separable blend function of `mode` to one channel.
#[inline]
#[must_use]
pub fn blend_channel(mode: BlendMode, backdrop: f32, source: f32) -> f32 {
    match mode {
        BlendMode::Normal => source,
        BlendMode::Multiply => backdrop * source,
        BlendMode::Screen => backdrop + source - backdrop * source,
    }
}

/// Composites one RGBA8 texel onto `backdrop`.
#[must_use]
pub fn composite_over(backdrop: Rgba, texel: [u8; 4], opacity: f32, mode: BlendMode) -> Rgba {
    let source = unpack(texel);
    let source_alpha = source[3] * opacity;
    let backdrop_alpha = backdrop[3];
    let out_alpha = source_alpha + backdrop_alpha * (1.0 - source_alpha);
    let mut out = [0.0; 4];
    if out_alpha > 0.0 {
        for c in 0..3 {
            let blended = blend_channel(mode, backdrop[c], source[c]);
            let mixed = (1.0 - backdrop_alpha) * source[c] + backdrop_alpha * blended;
            let premultiplied =
                source_alpha * mixed + backdrop_alpha * (1.0 - source_alpha) * backdrop[c];
            out[c] = premultiplied / out_alpha;
        }
    }
    out[3] = out_alpha;
    out
}

/// Converts an RGBA8 texel to `0.0..=1.0` floats.
#[inline]
#[must_use]
pub fn unpack(texel: [u8; 4]) -> Rgba {
    texel.map(|v| f32::from(v) / 255.0)
}

/// Quantizes a color to RGBA8 with round-to-nearest, the way a unorm render
/// target stores it.
#[inline]
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "value is clamped to 0.5..=255.5 before the cast"
)]
pub fn quantize(color: Rgba) -> [u8; 4] {
    color.map(|v| (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSPARENT: Rgba = [0.0; 4];

    #[test]
    fn normal_over_transparent_keeps_texel() {
        let texel = [10, 200, 30, 255];
        let out = composite_over(TRANSPARENT, texel, 1.0, BlendMode::Normal);
        assert_eq!(quantize(out), texel);
    }

    #[test]
    fn semi_transparent_texel_over_transparent_keeps_color() {
        let texel = [80, 40, 20, 128];
        let out = composite_over(TRANSPARENT, texel, 1.0, BlendMode::Multiply);
        assert_eq!(quantize(out), texel);
    }

    #[test]
    fn multiply_over_opaque_white_reproduces_layer() {
        let white = [1.0; 4];
        for texel in [[0, 0, 0, 255], [12, 34, 56, 255], [255, 128, 1, 255]] {
            let out = composite_over(white, texel, 1.0, BlendMode::Multiply);
            assert_eq!(quantize(out), texel);
        }
    }

    #[test]
    fn screen_over_black_reproduces_layer() {
        let black = [0.0, 0.0, 0.0, 1.0];
        let out = composite_over(black, [90, 0, 255, 255], 1.0, BlendMode::Screen);
        assert_eq!(quantize(out), [90, 0, 255, 255]);
    }

    #[test]
    fn opacity_scales_source_alpha() {
        let black = [0.0, 0.0, 0.0, 1.0];
        let out = composite_over(black, [255, 255, 255, 255], 0.5, BlendMode::Normal);
        assert_eq!(quantize(out), [128, 128, 128, 255]);

        let out = composite_over(TRANSPARENT, [255, 0, 0, 255], 0.0, BlendMode::Normal);
        assert_eq!(quantize(out), [0, 0, 0, 0]);
    }
}
