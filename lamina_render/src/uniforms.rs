// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-draw uniform block of the compositing program.

use bytemuck::{Pod, Zeroable};
use lamina_core::layer::{BlendMode, Layer};

/// Fixed number of slots in the shader's opacity and blend-mode arrays.
///
/// This is also the hard upper bound for
/// [`RendererConfig::max_layers`](crate::RendererConfig::max_layers).
pub const MAX_SLOTS: usize = 16;

/// Uniform block read by the compositing shader.
///
/// The layout matches the WGSL declaration in [`COMPOSITE_WGSL`]:
/// a `u32` layer count padded to 16 bytes, then 16 opacities and 16 blend
/// codes, each packed four to a `vec4`. Slot `i` describes texture slice `i`
/// (slot 0 = bottommost).
///
/// [`COMPOSITE_WGSL`]: crate::shader::COMPOSITE_WGSL
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct CompositeUniforms {
    /// Number of slices to composite.
    pub layer_count: u32,
    _pad: [u32; 3],
    /// Opacity per slice.
    pub opacities: [f32; MAX_SLOTS],
    /// [`BlendMode::code`] per slice.
    pub blend_modes: [i32; MAX_SLOTS],
}

impl Default for CompositeUniforms {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl CompositeUniforms {
    /// Size of the block in bytes.
    pub const SIZE: usize = size_of::<Self>();

    /// Fills the first `layers.len()` slots from `layers` (bottom-up) and
    /// zeroes the rest.
    ///
    /// # Panics
    ///
    /// Panics if more than [`MAX_SLOTS`] layers are passed.
    pub fn set_layers<'a>(&mut self, layers: impl ExactSizeIterator<Item = &'a Layer>) {
        assert!(layers.len() <= MAX_SLOTS, "at most {MAX_SLOTS} layers");
        *self = Self::zeroed();
        for (slot, layer) in layers.enumerate() {
            self.opacities[slot] = layer.opacity;
            self.blend_modes[slot] = layer.blend_mode.code();
            self.layer_count += 1;
        }
    }

    /// Blend mode of slot `slot`, falling back to normal for unknown codes.
    #[must_use]
    pub fn blend_mode(&self, slot: usize) -> BlendMode {
        BlendMode::from_code(self.blend_modes[slot]).unwrap_or_default()
    }

    /// Raw bytes for upload to a uniform buffer.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}
