// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordered layer list with one buffer per layer.
//!
//! [`LayerStack`] is the layer-management side of the compositor: it creates
//! and destroys layers, keeps their z-order (index 0 is the topmost layer),
//! and owns every layer's [`LayerBuffer`]. All buffers share the canvas size;
//! [`resize_canvas`](LayerStack::resize_canvas) reallocates them together.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::buffer::LayerBuffer;
use crate::layer::{BlendMode, Layer, LayerId};
use crate::source::{LayerBuffers, LayerSource};
use crate::tile::DEFAULT_TILE_SIZE;

/// Layers in z-order plus their pixel buffers.
#[derive(Debug)]
pub struct LayerStack {
    width: u32,
    height: u32,
    tile_size: u32,
    // Topmost first.
    layers: Vec<Layer>,
    buffers: BTreeMap<LayerId, LayerBuffer>,
    next_id: u32,
}

impl LayerStack {
    /// Creates an empty stack for a `width` × `height` canvas.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_tile_size(width, height, DEFAULT_TILE_SIZE)
    }

    /// Creates an empty stack whose buffers use `tile_size` tiles.
    ///
    /// # Panics
    ///
    /// Panics if `tile_size` is zero.
    #[must_use]
    pub fn with_tile_size(width: u32, height: u32, tile_size: u32) -> Self {
        assert!(tile_size > 0, "tile size must be non-zero");
        Self {
            width,
            height,
            tile_size,
            layers: Vec::new(),
            buffers: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Canvas width.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Canvas height.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Number of layers.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if the stack has no layers.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Adds a new transparent layer on top of the stack.
    pub fn push_layer(&mut self) -> LayerId {
        self.insert_layer(0)
    }

    /// Adds a new transparent layer at z-position `position` (0 = topmost).
    ///
    /// Positions past the end place the layer at the bottom.
    pub fn insert_layer(&mut self, position: usize) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        let position = position.min(self.layers.len());
        self.layers.insert(position, Layer::new(id));
        self.buffers.insert(
            id,
            LayerBuffer::with_tile_size(self.width, self.height, self.tile_size),
        );
        id
    }

    /// Removes a layer and its buffer. Returns `false` for unknown ids.
    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        let Some(position) = self.position(id) else {
            return false;
        };
        self.layers.remove(position);
        self.buffers.remove(&id);
        true
    }

    /// Moves a layer to z-position `position` (0 = topmost). Returns `false`
    /// for unknown ids.
    pub fn move_layer(&mut self, id: LayerId, position: usize) -> bool {
        let Some(from) = self.position(id) else {
            return false;
        };
        let layer = self.layers.remove(from);
        let position = position.min(self.layers.len());
        self.layers.insert(position, layer);
        true
    }

    /// Z-position of a layer (0 = topmost).
    #[must_use]
    pub fn position(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id == id)
    }

    /// Returns a layer's properties.
    #[must_use]
    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    /// Returns a layer's properties for modification.
    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|layer| layer.id == id)
    }

    /// Enables or disables a layer.
    pub fn set_enabled(&mut self, id: LayerId, enabled: bool) {
        if let Some(layer) = self.layer_mut(id) {
            layer.enabled = enabled;
        }
    }

    /// Sets a layer's opacity, clamped to `0.0..=1.0`.
    pub fn set_opacity(&mut self, id: LayerId, opacity: f32) {
        if let Some(layer) = self.layer_mut(id) {
            layer.opacity = opacity.clamp(0.0, 1.0);
        }
    }

    /// Sets a layer's blend mode.
    pub fn set_blend_mode(&mut self, id: LayerId, blend_mode: BlendMode) {
        if let Some(layer) = self.layer_mut(id) {
            layer.blend_mode = blend_mode;
        }
    }

    /// All layers, topmost first.
    #[inline]
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Returns a layer's buffer.
    #[must_use]
    pub fn buffer(&self, id: LayerId) -> Option<&LayerBuffer> {
        self.buffers.get(&id)
    }

    /// Returns a layer's buffer for editing.
    pub fn buffer_mut(&mut self, id: LayerId) -> Option<&mut LayerBuffer> {
        self.buffers.get_mut(&id)
    }

    /// Resizes the canvas, reallocating every buffer.
    ///
    /// The renderer must be resized to the same dimensions before the next
    /// render; every tile starts dirty.
    pub fn resize_canvas(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        for buffer in self.buffers.values_mut() {
            buffer.resize(width, height);
        }
    }
}

impl LayerBuffers for LayerStack {
    fn buffer_mut(&mut self, id: LayerId) -> Option<&mut LayerBuffer> {
        self.buffers.get_mut(&id)
    }
}

impl LayerSource for LayerStack {
    fn layers(&self) -> &[Layer] {
        &self.layers
    }
}
