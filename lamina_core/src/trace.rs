// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the renderer.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! renderer calls as it reallocates the array texture, uploads layers,
//! composites and releases resources. All method bodies default to no-ops, so
//! implementing only the events you care about is fine.
//!
//! Sinks are installed once, when the renderer is built. `lamina_debug` ships
//! a pretty-printer and a binary recorder.

use crate::layer::LayerId;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How a layer's content reached its texture slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UploadKind {
    /// The whole buffer was uploaded and its dirty state reset.
    Full,
    /// Only dirty tiles were uploaded, as individual regions.
    Tiles {
        /// Number of tiles uploaded.
        count: u32,
    },
}

/// Which GPU resource was released.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// The layer array texture.
    ArrayTexture,
    /// The compositing program.
    Pipeline,
    /// The full-viewport vertex buffer.
    VertexBuffer,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when the array texture is (re)allocated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureResizeEvent {
    /// Slice width.
    pub width: u32,
    /// Slice height.
    pub height: u32,
    /// Depth before the reallocation (0 if nothing was allocated).
    pub old_depth: u32,
    /// Depth after the reallocation.
    pub new_depth: u32,
    /// Estimated memory of the previous allocation.
    pub old_bytes: u64,
    /// Estimated memory of the new allocation.
    pub new_bytes: u64,
    /// Whether the reallocation was forced by a canvas resize.
    pub forced: bool,
}

/// Emitted after a layer's content is uploaded to its slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerUploadEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Destination slice (0 = bottommost).
    pub slice: u32,
    /// Uploaded layer.
    pub layer: LayerId,
    /// Full or tile-granular upload.
    pub kind: UploadKind,
    /// Texel bytes sent to the GPU.
    pub bytes: u64,
}

/// Emitted after the composite draw is issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompositeEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Number of slices composited.
    pub layer_count: u32,
}

/// Emitted when the GPU reports an error after a draw. Not fatal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpuErrorEvent<'a> {
    /// Frame counter.
    pub frame_index: u64,
    /// Backend diagnostic text.
    pub message: &'a str,
}

/// Emitted once per GPU resource released on dispose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReleaseEvent {
    /// What was released.
    pub resource: ResourceKind,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the renderer.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when the array texture is reallocated.
    fn on_texture_resize(&mut self, e: &TextureResizeEvent) {
        _ = e;
    }

    /// Called after each layer upload.
    fn on_layer_upload(&mut self, e: &LayerUploadEvent) {
        _ = e;
    }

    /// Called after the composite draw.
    fn on_composite(&mut self, e: &CompositeEvent) {
        _ = e;
    }

    /// Called when a transient GPU error is detected after a draw.
    fn on_gpu_error(&mut self, e: &GpuErrorEvent<'_>) {
        _ = e;
    }

    /// Called for each resource released by dispose.
    fn on_release(&mut self, e: &ReleaseEvent) {
        _ = e;
    }

    /// Called once, after the renderer has been disposed.
    fn on_dispose(&mut self) {}
}

impl<T: TraceSink + ?Sized> TraceSink for &mut T {
    fn on_texture_resize(&mut self, e: &TextureResizeEvent) {
        (**self).on_texture_resize(e);
    }

    fn on_layer_upload(&mut self, e: &LayerUploadEvent) {
        (**self).on_layer_upload(e);
    }

    fn on_composite(&mut self, e: &CompositeEvent) {
        (**self).on_composite(e);
    }

    fn on_gpu_error(&mut self, e: &GpuErrorEvent<'_>) {
        (**self).on_gpu_error(e);
    }

    fn on_release(&mut self, e: &ReleaseEvent) {
        (**self).on_release(e);
    }

    fn on_dispose(&mut self) {
        (**self).on_dispose();
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}
