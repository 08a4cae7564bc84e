// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Query traits the renderer uses to reach layers and their buffers.
//!
//! The renderer never looks layers up in a global registry. Callers hand it
//! either a [`LayerSource`] (layer list and buffers together, e.g.
//! [`LayerStack`](crate::stack::LayerStack)) or an explicit layer slice plus a
//! [`LayerBuffers`] implementation.

use crate::buffer::LayerBuffer;
use crate::layer::{Layer, LayerId};

/// Gives mutable access to layer buffers by id.
///
/// Mutable access is needed because uploading a layer clears its dirty tiles.
pub trait LayerBuffers {
    /// Returns the buffer of layer `id`, if it exists.
    fn buffer_mut(&mut self, id: LayerId) -> Option<&mut LayerBuffer>;
}

/// An ordered layer list together with the layers' buffers.
pub trait LayerSource: LayerBuffers {
    /// All layers, topmost first.
    fn layers(&self) -> &[Layer];
}
