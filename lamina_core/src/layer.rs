// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer identity and compositing properties.
//!
//! A [`Layer`] is the per-frame view of a paint layer that the renderer reads:
//! whether it is enabled, how opaque it is, and how it blends onto the layers
//! below it. Z-order is not stored on the layer; it is the layer's position in
//! the topmost-first list handed to the renderer.

use core::fmt;

/// Identifies a layer and, through it, the layer's pixel buffer.
///
/// IDs are assigned by the layer-management collaborator (see
/// [`LayerStack`](crate::stack::LayerStack)); the renderer treats them as
/// opaque.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub u32);

impl fmt::Debug for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerId({})", self.0)
    }
}

/// How a layer's color combines with the composite of the layers below it.
///
/// Each mode has a stable integer [`code`](Self::code) that the compositing
/// shader switches on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Standard source-over alpha compositing.
    #[default]
    Normal,
    /// Multiply blend: backdrop × source.
    Multiply,
    /// Screen blend: backdrop + source − backdrop × source.
    Screen,
}

impl BlendMode {
    /// All blend modes, in code order.
    pub const ALL: [Self; 3] = [Self::Normal, Self::Multiply, Self::Screen];

    /// Returns the shader code for this mode.
    #[inline]
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Normal => 0,
            Self::Multiply => 1,
            Self::Screen => 2,
        }
    }

    /// Looks up the mode for a shader code.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Normal),
            1 => Some(Self::Multiply),
            2 => Some(Self::Screen),
            _ => None,
        }
    }
}

/// Compositing properties of one layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Layer {
    /// The layer's identity.
    pub id: LayerId,
    /// Disabled layers are skipped by the renderer.
    pub enabled: bool,
    /// Opacity multiplier in `0.0..=1.0`.
    pub opacity: f32,
    /// Blend mode used when compositing onto lower layers.
    pub blend_mode: BlendMode,
}

impl Layer {
    /// Creates an enabled, fully opaque, normal-blended layer.
    #[must_use]
    pub const fn new(id: LayerId) -> Self {
        Self {
            id,
            enabled: true,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
        }
    }

    /// Returns the layer with the given enabled flag.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns the layer with the given opacity, clamped to `0.0..=1.0`.
    #[must_use]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Returns the layer with the given blend mode.
    #[must_use]
    pub const fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_codes_round_trip() {
        for mode in BlendMode::ALL {
            assert_eq!(BlendMode::from_code(mode.code()), Some(mode));
        }
        assert_eq!(BlendMode::Normal.code(), 0);
        assert_eq!(BlendMode::Multiply.code(), 1);
        assert_eq!(BlendMode::from_code(7), None);
    }

    #[test]
    fn opacity_is_clamped() {
        let layer = Layer::new(LayerId(3)).with_opacity(1.7);
        assert_eq!(layer.opacity, 1.0);
        assert_eq!(Layer::new(LayerId(3)).with_opacity(-0.5).opacity, 0.0);
    }
}
