// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Array-texture layer compositing for lamina.
//!
//! This crate turns the layer model of [`lamina_core`] into GPU work through a
//! single [`Backend`] seam. It defines:
//!
//! - [`Renderer`]: the orchestrator: selects active layers, keeps the array
//!   texture sized, uploads dirty tiles or whole slices, draws, reads back
//! - [`LayerArrayTexture`]: one 2D-array texture with a slice per layer
//! - [`CompositorPipeline`]: the compositing program and its full-viewport
//!   triangle
//! - [`CompositeUniforms`]: per-slice opacity and blend mode
//! - [`SoftwareBackend`]: a CPU [`Backend`] with the same semantics as the
//!   GPU one, used by tests and as a fallback
//! - [`ResourceKey`]: opaque handle for backend-managed resources
//!
//! The composite math is written down once in [`blend`] and mirrored by the
//! WGSL program in [`shader`].

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

mod backend;
pub mod blend;
mod config;
mod error;
mod pipeline;
mod renderer;
mod resource;
mod select;
pub mod shader;
mod software;
mod texture;
mod uniforms;

pub use backend::{Backend, BackendError, DrawCall, ShaderSource, TextureExtent};
pub use config::RendererConfig;
pub use error::RenderError;
pub use pipeline::{CompositorPipeline, FULLSCREEN_TRIANGLE};
pub use renderer::{FrameReport, Renderer};
pub use resource::{KeyAllocator, ResourceKey};
pub use select::{LayerCapPolicy, select_active};
pub use software::{BackendStats, SoftwareBackend};
pub use texture::LayerArrayTexture;
pub use uniforms::{CompositeUniforms, MAX_SLOTS};
