// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU reference backend.
//!
//! [`SoftwareBackend`] implements [`Backend`] in plain memory with the same
//! observable behavior as a GPU backend: zero-initialized slices, tightly
//! packed region writes, a transparent clear before each draw, and the
//! composite math of [`blend`](crate::blend). It counts every call in
//! [`BackendStats`] and lets tests inspect slices, inject a post-draw error,
//! or make program creation fail.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use lamina_core::buffer::{BYTES_PER_PIXEL, byte_len};
use lamina_core::geometry::PixelRect;

use crate::backend::{Backend, BackendError, DrawCall, ShaderSource, TextureExtent};
use crate::blend::{composite_over, quantize};
use crate::resource::{KeyAllocator, ResourceKey};

/// Call counters of a [`SoftwareBackend`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// Array texture storage allocations.
    pub allocations: u64,
    /// Calls to `write_array_texture`.
    pub region_writes: u64,
    /// Texel bytes written to array textures.
    pub bytes_written: u64,
    /// Composite draws.
    pub draws: u64,
    /// Surface readbacks.
    pub readbacks: u64,
    /// Released resources.
    pub releases: u64,
    /// Every `Backend` call, of any kind.
    pub calls: u64,
}

#[derive(Debug)]
enum Resource {
    ArrayTexture {
        extent: TextureExtent,
        texels: Vec<u8>,
    },
    Pipeline,
    VertexBuffer {
        vertex_count: usize,
    },
}

/// A [`Backend`] that composites on the CPU.
#[derive(Debug, Default)]
pub struct SoftwareBackend {
    keys: KeyAllocator,
    resources: BTreeMap<ResourceKey, Resource>,
    surface_width: u32,
    surface_height: u32,
    surface: Vec<u8>,
    stats: BackendStats,
    pending_error: Option<BackendError>,
    pipeline_rejection: Option<String>,
}

impl SoftwareBackend {
    /// Creates a backend with an empty 0×0 surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Call counters so far.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> BackendStats {
        self.stats
    }

    /// Contents of slice `index` of an allocated array texture.
    #[must_use]
    pub fn slice(&self, texture: ResourceKey, index: u32) -> Option<&[u8]> {
        match self.resources.get(&texture)? {
            Resource::ArrayTexture { extent, texels } if index < extent.depth => {
                let len = byte_len(extent.width, extent.height);
                let start = index as usize * len;
                texels.get(start..start + len)
            }
            _ => None,
        }
    }

    /// Extent of an array texture's current allocation.
    #[must_use]
    pub fn texture_extent(&self, texture: ResourceKey) -> Option<TextureExtent> {
        match self.resources.get(&texture)? {
            Resource::ArrayTexture { extent, .. } => Some(*extent),
            _ => None,
        }
    }

    /// The surface as last drawn.
    #[inline]
    #[must_use]
    pub fn surface(&self) -> &[u8] {
        &self.surface
    }

    /// Surface width and height.
    #[inline]
    #[must_use]
    pub const fn surface_size(&self) -> (u32, u32) {
        (self.surface_width, self.surface_height)
    }

    /// Number of resources created and not yet released.
    #[inline]
    #[must_use]
    pub fn live_resources(&self) -> usize {
        self.resources.len()
    }

    /// Makes the next [`take_error`](Backend::take_error) report `error`, as
    /// if the device had flagged it during the last draw.
    pub fn inject_error(&mut self, error: BackendError) {
        self.pending_error = Some(error);
    }

    /// Makes every following `create_pipeline` fail to link with `log`.
    pub fn reject_pipelines(&mut self, log: impl Into<String>) {
        self.pipeline_rejection = Some(log.into());
    }

    fn texture_mut(
        &mut self,
        texture: ResourceKey,
    ) -> Result<(&mut TextureExtent, &mut Vec<u8>), BackendError> {
        match self.resources.get_mut(&texture) {
            Some(Resource::ArrayTexture { extent, texels }) => Ok((extent, texels)),
            _ => Err(BackendError::UnknownResource(texture)),
        }
    }

    fn expect_kind(
        &self,
        key: ResourceKey,
        matches: impl Fn(&Resource) -> bool,
    ) -> Result<&Resource, BackendError> {
        self.resources
            .get(&key)
            .filter(|resource| matches(resource))
            .ok_or(BackendError::UnknownResource(key))
    }
}

impl Backend for SoftwareBackend {
    fn create_array_texture(&mut self) -> Result<ResourceKey, BackendError> {
        self.stats.calls += 1;
        let key = self.keys.next_key();
        self.resources.insert(
            key,
            Resource::ArrayTexture {
                extent: TextureExtent::default(),
                texels: Vec::new(),
            },
        );
        Ok(key)
    }

    fn allocate_array_texture(
        &mut self,
        texture: ResourceKey,
        new_extent: TextureExtent,
    ) -> Result<(), BackendError> {
        self.stats.calls += 1;
        let (extent, texels) = self.texture_mut(texture)?;
        *extent = new_extent;
        texels.clear();
        texels.resize(
            byte_len(new_extent.width, new_extent.height) * new_extent.depth as usize,
            0,
        );
        self.stats.allocations += 1;
        Ok(())
    }

    fn write_array_texture(
        &mut self,
        texture: ResourceKey,
        slice: u32,
        region: PixelRect,
        data: &[u8],
    ) -> Result<(), BackendError> {
        self.stats.calls += 1;
        let (extent, texels) = self.texture_mut(texture)?;
        if slice >= extent.depth
            || !region.fits_within(extent.width, extent.height)
            || data.len() != byte_len(region.width, region.height)
        {
            return Err(BackendError::Device(format!(
                "write of {region:?} to slice {slice} does not fit {extent:?}"
            )));
        }
        let slice_len = byte_len(extent.width, extent.height);
        let row_len = region.width as usize * BYTES_PER_PIXEL;
        let slice_texels = &mut texels[slice as usize * slice_len..][..slice_len];
        for (y, src) in (region.y..).zip(data.chunks_exact(row_len.max(1))) {
            let start = (y as usize * extent.width as usize + region.x as usize) * BYTES_PER_PIXEL;
            slice_texels[start..start + row_len].copy_from_slice(src);
        }
        self.stats.region_writes += 1;
        self.stats.bytes_written += data.len() as u64;
        Ok(())
    }

    fn create_pipeline(&mut self, source: &ShaderSource<'_>) -> Result<ResourceKey, BackendError> {
        self.stats.calls += 1;
        for entry in ["fn vs_main", "fn fs_main"] {
            if !source.wgsl.contains(entry) {
                return Err(BackendError::ShaderCompile(format!(
                    "{}: missing entry point `{entry}`",
                    source.label
                )));
            }
        }
        if let Some(log) = &self.pipeline_rejection {
            return Err(BackendError::ProgramLink(log.clone()));
        }
        let key = self.keys.next_key();
        self.resources.insert(key, Resource::Pipeline);
        Ok(key)
    }

    fn create_vertex_buffer(&mut self, vertices: &[[f32; 2]]) -> Result<ResourceKey, BackendError> {
        self.stats.calls += 1;
        let key = self.keys.next_key();
        self.resources.insert(
            key,
            Resource::VertexBuffer {
                vertex_count: vertices.len(),
            },
        );
        Ok(key)
    }

    fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        self.stats.calls += 1;
        self.surface_width = width;
        self.surface_height = height;
        self.surface = vec![0; byte_len(width, height)];
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), BackendError> {
        self.stats.calls += 1;
        self.expect_kind(call.pipeline, |r| matches!(r, Resource::Pipeline))?;
        let vertex_count = match self.expect_kind(call.vertices, |r| {
            matches!(r, Resource::VertexBuffer { .. })
        })? {
            Resource::VertexBuffer { vertex_count } => *vertex_count,
            _ => 0,
        };
        if (call.vertex_count as usize) > vertex_count {
            return Err(BackendError::Device(format!(
                "draw of {} vertices from a buffer of {vertex_count}",
                call.vertex_count
            )));
        }
        // Field borrow, so the surface below stays writable.
        let Some(Resource::ArrayTexture { extent, texels }) = self.resources.get(&call.texture)
        else {
            return Err(BackendError::UnknownResource(call.texture));
        };
        let layer_count = call.uniforms.layer_count;
        if layer_count > extent.depth {
            return Err(BackendError::Device(format!(
                "{layer_count} layers bound to a texture of depth {}",
                extent.depth
            )));
        }

        let surface = &mut self.surface;
        surface.fill(0);
        if extent.width > 0 && extent.height > 0 {
            let slice_len = byte_len(extent.width, extent.height);
            let row_len = extent.width as usize * BYTES_PER_PIXEL;
            for y in 0..self.surface_height {
                let ty = y.min(extent.height - 1) as usize;
                for x in 0..self.surface_width {
                    let tx = x.min(extent.width - 1) as usize * BYTES_PER_PIXEL;
                    let mut color = [0.0; 4];
                    for slot in 0..layer_count as usize {
                        let at = slot * slice_len + ty * row_len + tx;
                        let mut texel = [0; 4];
                        texel.copy_from_slice(&texels[at..at + BYTES_PER_PIXEL]);
                        color = composite_over(
                            color,
                            texel,
                            call.uniforms.opacities[slot],
                            call.uniforms.blend_mode(slot),
                        );
                    }
                    let out = (y as usize * self.surface_width as usize + x as usize)
                        * BYTES_PER_PIXEL;
                    surface[out..out + BYTES_PER_PIXEL].copy_from_slice(&quantize(color));
                }
            }
        }
        self.stats.draws += 1;
        Ok(())
    }

    fn read_pixels(&mut self, out: &mut [u8]) -> Result<(), BackendError> {
        self.stats.calls += 1;
        if out.len() != self.surface.len() {
            return Err(BackendError::Readback(format!(
                "destination has {} bytes, surface has {}",
                out.len(),
                self.surface.len()
            )));
        }
        out.copy_from_slice(&self.surface);
        self.stats.readbacks += 1;
        Ok(())
    }

    fn take_error(&mut self) -> Option<BackendError> {
        self.stats.calls += 1;
        self.pending_error.take()
    }

    fn release(&mut self, resource: ResourceKey) {
        self.stats.calls += 1;
        if self.resources.remove(&resource).is_some() {
            self.stats.releases += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uniforms::CompositeUniforms;

    #[test]
    fn slices_start_zeroed_and_take_region_writes() {
        let mut backend = SoftwareBackend::new();
        let texture = backend.create_array_texture().unwrap();
        backend
            .allocate_array_texture(texture, TextureExtent::new(2, 2, 2))
            .unwrap();
        backend
            .write_array_texture(texture, 1, PixelRect::new(1, 0, 1, 2), &[5; 8])
            .unwrap();

        assert_eq!(backend.slice(texture, 0).unwrap(), &[0; 16]);
        assert_eq!(
            backend.slice(texture, 1).unwrap(),
            &[0, 0, 0, 0, 5, 5, 5, 5, 0, 0, 0, 0, 5, 5, 5, 5]
        );
        assert!(backend.slice(texture, 2).is_none());
        assert_eq!(backend.stats().bytes_written, 8);
    }

    #[test]
    fn rejects_writes_that_do_not_fit() {
        let mut backend = SoftwareBackend::new();
        let texture = backend.create_array_texture().unwrap();
        backend
            .allocate_array_texture(texture, TextureExtent::new(2, 2, 1))
            .unwrap();
        let err = backend
            .write_array_texture(texture, 0, PixelRect::new(1, 1, 2, 1), &[0; 8])
            .unwrap_err();
        assert!(matches!(err, BackendError::Device(_)));
        assert_eq!(
            backend.write_array_texture(ResourceKey(99), 0, PixelRect::new(0, 0, 1, 1), &[0; 4]),
            Err(BackendError::UnknownResource(ResourceKey(99)))
        );
    }

    #[test]
    fn shader_without_entry_points_fails_to_compile() {
        let mut backend = SoftwareBackend::new();
        let err = backend
            .create_pipeline(&ShaderSource {
                label: "broken",
                wgsl: "fn vs_main() {}",
            })
            .unwrap_err();
        assert_eq!(
            err,
            BackendError::ShaderCompile("broken: missing entry point `fn fs_main`".into())
        );
    }

    #[test]
    fn draw_composites_slices_bottom_up() {
        let mut backend = SoftwareBackend::new();
        let texture = backend.create_array_texture().unwrap();
        let pipeline = backend
            .create_pipeline(&crate::shader::COMPOSITE_SHADER)
            .unwrap();
        let vertices = backend
            .create_vertex_buffer(&crate::pipeline::FULLSCREEN_TRIANGLE)
            .unwrap();
        backend.resize_surface(1, 1).unwrap();
        backend
            .allocate_array_texture(texture, TextureExtent::new(1, 1, 2))
            .unwrap();
        backend
            .write_array_texture(texture, 0, PixelRect::new(0, 0, 1, 1), &[255, 0, 0, 255])
            .unwrap();
        backend
            .write_array_texture(texture, 1, PixelRect::new(0, 0, 1, 1), &[0, 0, 255, 255])
            .unwrap();

        let mut uniforms = CompositeUniforms::default();
        uniforms.layer_count = 2;
        uniforms.opacities[0] = 1.0;
        uniforms.opacities[1] = 1.0;
        backend
            .draw(&DrawCall {
                pipeline,
                vertices,
                vertex_count: 3,
                texture,
                uniforms: &uniforms,
            })
            .unwrap();
        let mut out = [0; 4];
        backend.read_pixels(&mut out).unwrap();
        assert_eq!(out, [0, 0, 255, 255]);

        uniforms.layer_count = 3;
        let err = backend
            .draw(&DrawCall {
                pipeline,
                vertices,
                vertex_count: 3,
                texture,
                uniforms: &uniforms,
            })
            .unwrap_err();
        assert!(matches!(err, BackendError::Device(_)));
    }

    #[test]
    fn injected_error_is_taken_once() {
        let mut backend = SoftwareBackend::new();
        backend.inject_error(BackendError::Device("lost".into()));
        assert_eq!(
            backend.take_error(),
            Some(BackendError::Device("lost".into()))
        );
        assert_eq!(backend.take_error(), None);
    }
}
