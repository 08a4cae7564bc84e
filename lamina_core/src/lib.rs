// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer model, tile dirty tracking and diagnostics for the lamina compositor.
//!
//! `lamina_core` holds everything the compositor needs that does not touch a
//! graphics API. It is `no_std` compatible (with `alloc`).
//!
//! # Architecture
//!
//! Edits flow from the editing collaborator into layer buffers; the renderer
//! (in `lamina_render`) later asks which tiles changed and uploads only those:
//!
//! ```text
//!   edit ──► LayerBuffer::fill_rect() ──► TileDirtyTracker::mark_dirty()
//!                                                │
//!                 ┌──────────────────────────────┘
//!                 ▼
//!   LayerSource::layers() ──► Renderer::render() ──► dirty_tiles() / reset
//! ```
//!
//! **[`layer`]**: Layer identity, enabled flag, opacity and [`BlendMode`](layer::BlendMode).
//!
//! **[`tile`]**: Fixed-size square tiles partitioning a buffer, with dirty flags.
//!
//! **[`buffer`]**: Tightly packed RGBA8 [`LayerBuffer`](buffer::LayerBuffer)
//! whose mutations mark the covered tiles dirty.
//!
//! **[`stack`]**: [`LayerStack`](stack::LayerStack), an ordered layer list
//! with one buffer per layer. Implements the [`source`] query traits.
//!
//! **[`source`]**: The traits the renderer uses to read layers and buffers.
//! The renderer never reaches for a global layer registry.
//!
//! **[`pixels`]**: Pure numeric helpers (memory estimation, vertical row
//! flipping) behind the [`PixelOps`](pixels::PixelOps) capability.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! renderer diagnostics.
//!
//! **[`geometry`]**: Integer pixel rectangles.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `parallel` (disabled by default, implies `std`): Adds
//!   [`ParallelPixelOps`](pixels::ParallelPixelOps), which flips rows on the
//!   rayon thread pool.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod buffer;
pub mod geometry;
pub mod layer;
pub mod pixels;
pub mod source;
pub mod stack;
pub mod tile;
pub mod trace;
