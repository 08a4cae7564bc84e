// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The graphics-API seam.
//!
//! A [`Backend`] exposes exactly the GPU operations the renderer needs: one
//! 2D-array texture, one compositing program, one vertex buffer, an offscreen
//! surface to draw into, and readback. Everything above this trait is
//! API-independent; [`SoftwareBackend`](crate::SoftwareBackend) and
//! `lamina_backend_wgpu::WgpuBackend` implement it.
//!
//! Resources are addressed by [`ResourceKey`]s the backend assigns. The
//! renderer releases every key it created exactly once.

use alloc::string::String;
use core::fmt;

use lamina_core::geometry::PixelRect;

use crate::resource::ResourceKey;
use crate::uniforms::CompositeUniforms;

/// Size of an array texture allocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextureExtent {
    /// Slice width in pixels.
    pub width: u32,
    /// Slice height in pixels.
    pub height: u32,
    /// Number of slices.
    pub depth: u32,
}

impl TextureExtent {
    /// Creates an extent.
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }
}

/// Source of the compositing program.
#[derive(Clone, Copy, Debug)]
pub struct ShaderSource<'a> {
    /// Debug label.
    pub label: &'a str,
    /// WGSL module with `vs_main` and `fs_main` entry points.
    pub wgsl: &'a str,
}

/// One composite draw.
#[derive(Clone, Copy, Debug)]
pub struct DrawCall<'a> {
    /// Program created by [`Backend::create_pipeline`].
    pub pipeline: ResourceKey,
    /// Vertex buffer created by [`Backend::create_vertex_buffer`].
    pub vertices: ResourceKey,
    /// Number of vertices to draw as a triangle list.
    pub vertex_count: u32,
    /// Array texture bound to the sampler.
    pub texture: ResourceKey,
    /// Layer count, opacities and blend modes.
    pub uniforms: &'a CompositeUniforms,
}

/// Errors reported by a [`Backend`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendError {
    /// A GPU object could not be created.
    ResourceCreation(&'static str),
    /// The shader failed to compile. Carries the diagnostic log.
    ShaderCompile(String),
    /// The program failed to link or validate. Carries the diagnostic log.
    ProgramLink(String),
    /// A key that the backend never issued, or already released.
    UnknownResource(ResourceKey),
    /// The device reported an error.
    Device(String),
    /// Reading back the surface failed.
    Readback(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceCreation(what) => write!(f, "failed to create {what}"),
            Self::ShaderCompile(log) => write!(f, "shader compilation failed: {log}"),
            Self::ProgramLink(log) => write!(f, "program link failed: {log}"),
            Self::UnknownResource(key) => write!(f, "unknown resource {key:?}"),
            Self::Device(message) => write!(f, "device error: {message}"),
            Self::Readback(message) => write!(f, "readback failed: {message}"),
        }
    }
}

impl core::error::Error for BackendError {}

/// GPU operations used by the renderer.
///
/// All calls happen on the thread that owns the graphics context.
pub trait Backend {
    /// Creates an (unallocated) array texture object.
    fn create_array_texture(&mut self) -> Result<ResourceKey, BackendError>;

    /// (Re)allocates storage for `texture`: RGBA8, zero-initialized, nearest
    /// sampling, clamp-to-edge. Previous contents are discarded.
    fn allocate_array_texture(
        &mut self,
        texture: ResourceKey,
        extent: TextureExtent,
    ) -> Result<(), BackendError>;

    /// Replaces `region` of slice `slice` with tightly packed RGBA8 `texels`
    /// (`region.width × region.height × 4` bytes, 1-byte row alignment).
    fn write_array_texture(
        &mut self,
        texture: ResourceKey,
        slice: u32,
        region: PixelRect,
        texels: &[u8],
    ) -> Result<(), BackendError>;

    /// Compiles and links the compositing program.
    ///
    /// Fails with [`BackendError::ShaderCompile`] or
    /// [`BackendError::ProgramLink`] carrying the backend's diagnostic log.
    fn create_pipeline(&mut self, source: &ShaderSource<'_>) -> Result<ResourceKey, BackendError>;

    /// Creates a static buffer of 2D clip-space positions.
    fn create_vertex_buffer(&mut self, vertices: &[[f32; 2]]) -> Result<ResourceKey, BackendError>;

    /// Resizes the surface the composite is drawn into, and the viewport.
    fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), BackendError>;

    /// Clears the surface to transparent and issues the composite draw.
    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), BackendError>;

    /// Reads the surface back as tightly packed RGBA8. `out` must hold
    /// exactly `width × height × 4` bytes of the current surface.
    fn read_pixels(&mut self, out: &mut [u8]) -> Result<(), BackendError>;

    /// Returns and clears the error raised since the last call, if any.
    fn take_error(&mut self) -> Option<BackendError>;

    /// Destroys a resource. Unknown keys are ignored.
    fn release(&mut self, resource: ResourceKey);
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn display_includes_diagnostic_log() {
        let err = BackendError::ShaderCompile("1:3: unexpected token".into());
        assert_eq!(
            err.to_string(),
            "shader compilation failed: 1:3: unexpected token"
        );
        let err = BackendError::UnknownResource(ResourceKey(9));
        assert_eq!(err.to_string(), "unknown resource ResourceKey(9)");
    }
}
