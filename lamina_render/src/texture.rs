// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The layer array texture.

use lamina_core::buffer::byte_len;
use lamina_core::geometry::PixelRect;

use crate::backend::{Backend, TextureExtent};
use crate::error::RenderError;
use crate::resource::ResourceKey;

/// One GPU 2D-array texture holding a slice per active layer.
///
/// The handle is created once and released once. Storage is reallocated when
/// the extent changes (or on a forced resize); every reallocation leaves all
/// slices zeroed, so their previous contents must be uploaded again.
#[derive(Debug)]
pub struct LayerArrayTexture {
    handle: Option<ResourceKey>,
    extent: TextureExtent,
    allocations: u64,
}

impl LayerArrayTexture {
    /// Creates the texture object. No storage is allocated yet.
    pub fn new<B: Backend + ?Sized>(backend: &mut B) -> Result<Self, RenderError> {
        Ok(Self {
            handle: Some(backend.create_array_texture()?),
            extent: TextureExtent::default(),
            allocations: 0,
        })
    }

    /// The backend handle, or `None` once released.
    #[inline]
    #[must_use]
    pub const fn handle(&self) -> Option<ResourceKey> {
        self.handle
    }

    /// Current allocation size (all zero before the first allocation).
    #[inline]
    #[must_use]
    pub const fn extent(&self) -> TextureExtent {
        self.extent
    }

    /// Number of allocated slices.
    #[inline]
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.extent.depth
    }

    /// Number of storage (re)allocations performed so far.
    #[inline]
    #[must_use]
    pub const fn allocation_count(&self) -> u64 {
        self.allocations
    }

    /// Reallocates storage unless `(width, height, depth)` is already the
    /// current extent and `force` is false.
    ///
    /// Returns whether a reallocation happened.
    pub fn resize<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        width: u32,
        height: u32,
        depth: u32,
        force: bool,
    ) -> Result<bool, RenderError> {
        let extent = TextureExtent::new(width, height, depth);
        if !force && extent == self.extent {
            return Ok(false);
        }
        let handle = self.live_handle()?;
        backend.allocate_array_texture(handle, extent)?;
        self.extent = extent;
        self.allocations += 1;
        Ok(true)
    }

    /// Replaces slice `slice` with `pixels`, which must be exactly
    /// `width × height × 4` bytes.
    pub fn upload_full<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        slice: u32,
        pixels: &[u8],
    ) -> Result<(), RenderError> {
        let expected = byte_len(self.extent.width, self.extent.height);
        if pixels.len() != expected {
            return Err(RenderError::BufferLength {
                expected,
                actual: pixels.len(),
            });
        }
        let region = PixelRect::from_size(self.extent.width, self.extent.height);
        self.write(backend, slice, region, pixels)
    }

    /// Replaces `region` of slice `slice` with tightly packed `texels`, which
    /// must be exactly `region.width × region.height × 4` bytes.
    pub fn upload_region<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        slice: u32,
        region: PixelRect,
        texels: &[u8],
    ) -> Result<(), RenderError> {
        if !region.fits_within(self.extent.width, self.extent.height)
            || texels.len() != byte_len(region.width, region.height)
        {
            return Err(RenderError::RegionOutOfBounds {
                region,
                width: self.extent.width,
                height: self.extent.height,
            });
        }
        self.write(backend, slice, region, texels)
    }

    /// Destroys the texture. Returns `true` the first time only.
    pub fn release<B: Backend + ?Sized>(&mut self, backend: &mut B) -> bool {
        match self.handle.take() {
            Some(handle) => {
                backend.release(handle);
                self.extent = TextureExtent::default();
                true
            }
            None => false,
        }
    }

    fn write<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        slice: u32,
        region: PixelRect,
        texels: &[u8],
    ) -> Result<(), RenderError> {
        if slice >= self.extent.depth {
            return Err(RenderError::SliceOutOfRange {
                slice,
                depth: self.extent.depth,
            });
        }
        let handle = self.live_handle()?;
        if region.is_empty() {
            return Ok(());
        }
        backend.write_array_texture(handle, slice, region, texels)?;
        Ok(())
    }

    fn live_handle(&self) -> Result<ResourceKey, RenderError> {
        self.handle.ok_or(RenderError::Disposed)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::software::SoftwareBackend;

    fn allocated(width: u32, height: u32, depth: u32) -> (SoftwareBackend, LayerArrayTexture) {
        let mut backend = SoftwareBackend::new();
        let mut texture = LayerArrayTexture::new(&mut backend).unwrap();
        texture
            .resize(&mut backend, width, height, depth, false)
            .unwrap();
        (backend, texture)
    }

    #[test]
    fn identical_resize_is_a_noop_unless_forced() {
        let (mut backend, mut texture) = allocated(4, 4, 2);
        assert!(!texture.resize(&mut backend, 4, 4, 2, false).unwrap());
        assert_eq!(texture.allocation_count(), 1);
        assert!(texture.resize(&mut backend, 4, 4, 2, true).unwrap());
        assert!(texture.resize(&mut backend, 4, 4, 3, false).unwrap());
        assert_eq!(texture.allocation_count(), 3);
        assert_eq!(backend.stats().allocations, 3);
    }

    #[test]
    fn reallocation_zeroes_slices() {
        let (mut backend, mut texture) = allocated(2, 2, 1);
        texture.upload_full(&mut backend, 0, &[9; 16]).unwrap();
        texture.resize(&mut backend, 2, 2, 1, true).unwrap();
        let handle = texture.handle().unwrap();
        assert_eq!(backend.slice(handle, 0).unwrap(), &[0; 16]);
    }

    #[test]
    fn upload_full_checks_length_and_slice() {
        let (mut backend, texture) = allocated(2, 2, 1);
        assert_eq!(
            texture.upload_full(&mut backend, 0, &[0; 12]),
            Err(RenderError::BufferLength {
                expected: 16,
                actual: 12
            })
        );
        assert_eq!(
            texture.upload_full(&mut backend, 1, &[0; 16]),
            Err(RenderError::SliceOutOfRange { slice: 1, depth: 1 })
        );
    }

    #[test]
    fn upload_region_writes_only_the_region() {
        let (mut backend, texture) = allocated(3, 2, 1);
        let region = PixelRect::new(1, 1, 2, 1);
        texture
            .upload_region(&mut backend, 0, region, &[7; 8])
            .unwrap();
        let slice = backend.slice(texture.handle().unwrap(), 0).unwrap();
        let mut expected = vec![0; 24];
        expected[16..24].fill(7);
        assert_eq!(slice, expected.as_slice());

        assert!(matches!(
            texture.upload_region(&mut backend, 0, PixelRect::new(2, 0, 2, 1), &[0; 8]),
            Err(RenderError::RegionOutOfBounds { .. })
        ));
        assert!(matches!(
            texture.upload_region(&mut backend, 0, region, &[0; 4]),
            Err(RenderError::RegionOutOfBounds { .. })
        ));
    }

    #[test]
    fn release_happens_once() {
        let (mut backend, mut texture) = allocated(1, 1, 1);
        assert!(texture.release(&mut backend));
        assert!(!texture.release(&mut backend));
        assert_eq!(backend.stats().releases, 1);
        assert_eq!(
            texture.resize(&mut backend, 2, 2, 1, false),
            Err(RenderError::Disposed)
        );
    }
}
