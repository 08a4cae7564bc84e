// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The compositing orchestrator.
//!
//! ```text
//!   LayerSource ──► select_active() ──► LayerArrayTexture::resize()
//!                                              │
//!        ┌─────────────────────────────────────┘
//!        ▼
//!   per slice: dirty tiles ──► upload_region()    (slice already holds layer)
//!              otherwise   ──► upload_full() + reset_dirty_states()
//!        │
//!        ▼
//!   CompositeUniforms ──► CompositorPipeline::draw() ──► Backend::take_error()
//! ```
//!
//! The renderer owns its [`Backend`] and every resource it creates on it.
//! After [`dispose`](Renderer::dispose) every entry point returns
//! [`RenderError::Disposed`] without touching the backend.

use alloc::boxed::Box;
use alloc::string::ToString;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use lamina_core::buffer::{byte_len, copy_region};
use lamina_core::layer::{Layer, LayerId};
use lamina_core::pixels::{PixelOps, SoftwarePixelOps};
use lamina_core::source::{LayerBuffers, LayerSource};
use lamina_core::trace::{
    CompositeEvent, GpuErrorEvent, LayerUploadEvent, NoopSink, ReleaseEvent, ResourceKind,
    TextureResizeEvent, TraceSink, UploadKind,
};

use crate::backend::{Backend, BackendError};
use crate::config::RendererConfig;
use crate::error::RenderError;
use crate::pipeline::CompositorPipeline;
use crate::select::select_active;
use crate::shader::COMPOSITE_SHADER;
use crate::texture::LayerArrayTexture;
use crate::uniforms::CompositeUniforms;

/// What one [`render`](Renderer::render) call did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Number of layers composited.
    pub layer_count: u32,
    /// Layers uploaded as whole slices.
    pub full_uploads: u32,
    /// Tiles uploaded as regions, over all layers.
    pub tile_uploads: u32,
    /// Error the backend reported after the draw. Not fatal; the frame may
    /// be incomplete.
    pub gpu_error: Option<BackendError>,
}

/// Composites layer buffers through a [`Backend`].
pub struct Renderer<B: Backend> {
    backend: B,
    config: RendererConfig,
    texture: LayerArrayTexture,
    pipeline: CompositorPipeline,
    width: u32,
    height: u32,
    disposed: bool,
    frame_index: u64,
    // Layer each slice last received a full upload for.
    slice_owners: Vec<Option<LayerId>>,
    active: Vec<Layer>,
    uniforms: CompositeUniforms,
    scratch: Vec<u8>,
    sink: Box<dyn TraceSink>,
    pixel_ops: Box<dyn PixelOps>,
}

impl<B: Backend + fmt::Debug> fmt::Debug for Renderer<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("backend", &self.backend)
            .field("config", &self.config)
            .field("texture", &self.texture)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("disposed", &self.disposed)
            .field("frame_index", &self.frame_index)
            .finish_non_exhaustive()
    }
}

impl<B: Backend> Renderer<B> {
    /// Creates the array texture and the compositing program on `backend`.
    ///
    /// The canvas starts at 0×0; call [`resize`](Self::resize) before the
    /// first render. Setup failures carry the backend's diagnostic log.
    pub fn new(mut backend: B, config: RendererConfig) -> Result<Self, RenderError> {
        config.validate()?;
        let mut texture = LayerArrayTexture::new(&mut backend)?;
        let pipeline = match CompositorPipeline::new(&mut backend, &COMPOSITE_SHADER) {
            Ok(pipeline) => pipeline,
            Err(err) => {
                texture.release(&mut backend);
                return Err(err);
            }
        };
        Ok(Self {
            backend,
            config,
            texture,
            pipeline,
            width: 0,
            height: 0,
            disposed: false,
            frame_index: 0,
            slice_owners: Vec::new(),
            active: Vec::with_capacity(config.max_layers),
            uniforms: CompositeUniforms::default(),
            scratch: Vec::new(),
            sink: Box::new(NoopSink),
            pixel_ops: Box::new(SoftwarePixelOps),
        })
    }

    /// Installs a trace sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn TraceSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Installs the numeric pixel helpers (memory estimation, row flipping).
    #[must_use]
    pub fn with_pixel_ops(mut self, pixel_ops: Box<dyn PixelOps>) -> Self {
        self.pixel_ops = pixel_ops;
        self
    }

    /// The backend.
    #[inline]
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// The layer array texture.
    #[inline]
    #[must_use]
    pub const fn texture(&self) -> &LayerArrayTexture {
        &self.texture
    }

    /// The configuration the renderer was built with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &RendererConfig {
        &self.config
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

    /// Estimated memory held by the array texture.
    #[must_use]
    pub fn texture_memory_bytes(&self) -> u64 {
        let extent = self.texture.extent();
        self.pixel_ops
            .estimate_texture_memory_bytes(extent.width, extent.height, extent.depth)
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    #[inline]
    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Resizes the canvas.
    ///
    /// Zero or unchanged dimensions are ignored. Otherwise the surface is
    /// resized and the array texture is reallocated with
    /// `clamp(enabled layers, 1, max_layers)` slices, so every layer is
    /// uploaded in full on the next render.
    pub fn resize(&mut self, width: u32, height: u32, layers: &[Layer]) -> Result<(), RenderError> {
        self.check_live()?;
        if width == 0 || height == 0 || (width, height) == (self.width, self.height) {
            return Ok(());
        }
        self.backend.resize_surface(width, height)?;
        self.width = width;
        self.height = height;
        let enabled = layers.iter().filter(|layer| layer.enabled).count();
        let depth = slot(enabled.clamp(1, self.config.max_layers));
        self.reallocate(depth, true)
    }

    /// Composites the layers of `source`.
    ///
    /// With `only_dirty`, a layer whose slice already holds it uploads just
    /// its dirty tiles; every other layer is uploaded in full. Does nothing
    /// while the canvas is 0×0.
    pub fn render<S: LayerSource + ?Sized>(
        &mut self,
        source: &mut S,
        only_dirty: bool,
    ) -> Result<FrameReport, RenderError> {
        self.check_live()?;
        if self.width == 0 || self.height == 0 {
            return Ok(FrameReport::default());
        }
        select_active(
            source.layers(),
            self.config.max_layers,
            self.config.cap_policy,
            &mut self.active,
        );
        self.render_active(source, only_dirty)
    }

    /// Composites `layers` (topmost first), reading pixels from `buffers`.
    pub fn render_layers<L: LayerBuffers + ?Sized>(
        &mut self,
        layers: &[Layer],
        buffers: &mut L,
        only_dirty: bool,
    ) -> Result<FrameReport, RenderError> {
        self.check_live()?;
        if self.width == 0 || self.height == 0 {
            return Ok(FrameReport::default());
        }
        select_active(
            layers,
            self.config.max_layers,
            self.config.cap_policy,
            &mut self.active,
        );
        self.render_active(buffers, only_dirty)
    }

    /// Renders every layer in full and reads the composite back as tightly
    /// packed RGBA8. Row 0 holds row 0 of the layer buffers. Returns an empty
    /// vector while the canvas is 0×0.
    pub fn read_pixels<S: LayerSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<Vec<u8>, RenderError> {
        self.check_live()?;
        if self.width == 0 || self.height == 0 {
            return Ok(Vec::new());
        }
        self.render(source, false)?;
        let mut pixels = vec![0; byte_len(self.width, self.height)];
        self.backend.read_pixels(&mut pixels)?;
        Ok(pixels)
    }

    /// Like [`read_pixels`](Self::read_pixels), with the rows in reverse order.
    pub fn read_pixels_flipped<S: LayerSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<Vec<u8>, RenderError> {
        let mut pixels = self.read_pixels(source)?;
        if !pixels.is_empty() {
            self.pixel_ops
                .flip_rows_vertically(&mut pixels, self.width, self.height);
        }
        Ok(pixels)
    }

    /// Releases the array texture, the program and the vertex buffer.
    ///
    /// Calling it again does nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if self.texture.release(&mut self.backend) {
            self.sink.on_release(&ReleaseEvent {
                resource: ResourceKind::ArrayTexture,
            });
        }
        let (program, vertices) = self.pipeline.release(&mut self.backend);
        if program {
            self.sink.on_release(&ReleaseEvent {
                resource: ResourceKind::Pipeline,
            });
        }
        if vertices {
            self.sink.on_release(&ReleaseEvent {
                resource: ResourceKind::VertexBuffer,
            });
        }
        self.slice_owners.clear();
        self.disposed = true;
        self.sink.on_dispose();
    }

    fn check_live(&self) -> Result<(), RenderError> {
        if self.disposed {
            Err(RenderError::Disposed)
        } else {
            Ok(())
        }
    }

    fn reallocate(&mut self, depth: u32, forced: bool) -> Result<(), RenderError> {
        let old = self.texture.extent();
        if !self
            .texture
            .resize(&mut self.backend, self.width, self.height, depth, forced)?
        {
            return Ok(());
        }
        self.slice_owners.clear();
        self.slice_owners.resize(depth as usize, None);
        self.sink.on_texture_resize(&TextureResizeEvent {
            width: self.width,
            height: self.height,
            old_depth: old.depth,
            new_depth: depth,
            old_bytes: self
                .pixel_ops
                .estimate_texture_memory_bytes(old.width, old.height, old.depth),
            new_bytes: self
                .pixel_ops
                .estimate_texture_memory_bytes(self.width, self.height, depth),
            forced,
        });
        Ok(())
    }

    fn render_active<L: LayerBuffers + ?Sized>(
        &mut self,
        buffers: &mut L,
        only_dirty: bool,
    ) -> Result<FrameReport, RenderError> {
        self.frame_index += 1;
        let layer_count = slot(self.active.len());
        self.reallocate(layer_count.max(1), false)?;

        let mut report = FrameReport {
            layer_count,
            ..FrameReport::default()
        };
        for index in 0..self.active.len() {
            let layer = self.active[index];
            let slice = slot(index);
            let buffer = buffers
                .buffer_mut(layer.id)
                .ok_or(RenderError::MissingBuffer(layer.id))?;
            if (buffer.width(), buffer.height()) != (self.width, self.height) {
                return Err(RenderError::BufferSize {
                    layer: layer.id,
                    expected: (self.width, self.height),
                    actual: (buffer.width(), buffer.height()),
                });
            }

            let holds_layer = self.slice_owners[index] == Some(layer.id);
            let (pixels, tiles) = buffer.split();
            let (kind, bytes) = if only_dirty && holds_layer && tiles.has_dirty() {
                let mut count = 0;
                let mut bytes = 0;
                for tile_index in 0..tiles.tiles().len() {
                    let tile = tiles.tiles()[tile_index];
                    if !tile.is_dirty() {
                        continue;
                    }
                    copy_region(pixels, self.width, tile.rect(), &mut self.scratch);
                    self.texture.upload_region(
                        &mut self.backend,
                        slice,
                        tile.rect(),
                        &self.scratch,
                    )?;
                    tiles.clear_tile(tile_index);
                    count += 1;
                    bytes += self.scratch.len() as u64;
                }
                report.tile_uploads += count;
                (UploadKind::Tiles { count }, bytes)
            } else {
                self.texture.upload_full(&mut self.backend, slice, pixels)?;
                tiles.reset_dirty_states();
                self.slice_owners[index] = Some(layer.id);
                report.full_uploads += 1;
                (UploadKind::Full, pixels.len() as u64)
            };
            self.sink.on_layer_upload(&LayerUploadEvent {
                frame_index: self.frame_index,
                slice,
                layer: layer.id,
                kind,
                bytes,
            });
        }

        self.uniforms.set_layers(self.active.iter());
        let texture = self.texture.handle().ok_or(RenderError::Disposed)?;
        self.pipeline
            .draw(&mut self.backend, texture, &self.uniforms)?;
        self.sink.on_composite(&CompositeEvent {
            frame_index: self.frame_index,
            layer_count,
        });

        report.gpu_error = self.backend.take_error();
        if let Some(err) = &report.gpu_error {
            let message = err.to_string();
            self.sink.on_gpu_error(&GpuErrorEvent {
                frame_index: self.frame_index,
                message: &message,
            });
        }
        Ok(report)
    }
}

/// Converts a slot index or count, bounded by the configured layer cap, to
/// the backend's `u32`.
#[expect(
    clippy::cast_possible_truncation,
    reason = "slot counts are bounded by MAX_SLOTS"
)]
fn slot(index: usize) -> u32 {
    index as u32
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use core::cell::RefCell;

    use lamina_core::geometry::PixelRect;
    use lamina_core::stack::LayerStack;

    use super::*;
    use crate::software::SoftwareBackend;

    #[derive(Default)]
    struct Log {
        resizes: Vec<TextureResizeEvent>,
        uploads: Vec<LayerUploadEvent>,
        errors: Vec<alloc::string::String>,
        releases: Vec<ResourceKind>,
        disposed: u32,
    }

    struct Shared(Rc<RefCell<Log>>);

    impl TraceSink for Shared {
        fn on_texture_resize(&mut self, e: &TextureResizeEvent) {
            self.0.borrow_mut().resizes.push(*e);
        }

        fn on_layer_upload(&mut self, e: &LayerUploadEvent) {
            self.0.borrow_mut().uploads.push(*e);
        }

        fn on_gpu_error(&mut self, e: &GpuErrorEvent<'_>) {
            self.0.borrow_mut().errors.push(e.message.into());
        }

        fn on_release(&mut self, e: &ReleaseEvent) {
            self.0.borrow_mut().releases.push(e.resource);
        }

        fn on_dispose(&mut self) {
            self.0.borrow_mut().disposed += 1;
        }
    }

    fn traced(stack: &LayerStack) -> (Renderer<SoftwareBackend>, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut renderer = Renderer::new(SoftwareBackend::new(), RendererConfig::default())
            .unwrap()
            .with_sink(Box::new(Shared(log.clone())));
        renderer
            .resize(stack.width(), stack.height(), stack.layers())
            .unwrap();
        (renderer, log)
    }

    #[test]
    fn render_before_resize_is_a_noop() {
        let mut stack = LayerStack::new(4, 4);
        stack.push_layer();
        let mut renderer = Renderer::new(SoftwareBackend::new(), RendererConfig::default()).unwrap();
        let before = renderer.backend().stats();
        assert_eq!(
            renderer.render(&mut stack, true).unwrap(),
            FrameReport::default()
        );
        assert!(renderer.read_pixels(&mut stack).unwrap().is_empty());
        assert_eq!(renderer.backend().stats(), before);
    }

    #[test]
    fn invalid_config_fails_construction() {
        let config = RendererConfig::default().with_max_layers(17);
        assert!(matches!(
            Renderer::new(SoftwareBackend::new(), config),
            Err(RenderError::InvalidConfig(_))
        ));
    }

    #[test]
    fn resize_traces_reallocation() {
        let mut stack = LayerStack::new(8, 4);
        stack.push_layer();
        stack.push_layer();
        let (mut renderer, log) = traced(&stack);
        let event = log.borrow().resizes[0];
        assert_eq!((event.old_depth, event.new_depth), (0, 2));
        assert_eq!(event.new_bytes, 8 * 4 * 2 * 4);
        assert!(event.forced);
        assert_eq!(renderer.texture_memory_bytes(), 256);

        renderer.resize(8, 4, stack.layers()).unwrap();
        renderer.resize(0, 4, stack.layers()).unwrap();
        assert_eq!(log.borrow().resizes.len(), 1);
    }

    #[test]
    fn first_incremental_render_uploads_in_full() {
        let mut stack = LayerStack::with_tile_size(8, 8, 4);
        let id = stack.push_layer();
        stack
            .buffer_mut(id)
            .unwrap()
            .fill_rect(PixelRect::new(0, 0, 1, 1), [1, 2, 3, 4]);
        let (mut renderer, log) = traced(&stack);

        let report = renderer.render(&mut stack, true).unwrap();
        assert_eq!((report.full_uploads, report.tile_uploads), (1, 0));
        assert_eq!(log.borrow().uploads[0].kind, UploadKind::Full);
        assert!(!stack.buffer(id).unwrap().tiles().has_dirty());

        stack
            .buffer_mut(id)
            .unwrap()
            .fill_rect(PixelRect::new(5, 5, 2, 2), [9, 9, 9, 9]);
        let report = renderer.render(&mut stack, true).unwrap();
        assert_eq!((report.full_uploads, report.tile_uploads), (0, 1));
        let upload = log.borrow().uploads[1];
        assert_eq!(upload.kind, UploadKind::Tiles { count: 1 });
        assert_eq!(upload.bytes, 4 * 4 * 4);
    }

    #[test]
    fn gpu_error_is_reported_not_fatal() {
        let mut stack = LayerStack::new(2, 2);
        stack.push_layer();
        let (mut renderer, log) = traced(&stack);
        assert!(renderer.render(&mut stack, false).unwrap().gpu_error.is_none());

        renderer
            .backend
            .inject_error(BackendError::Device("out of memory".into()));
        let report = renderer.render(&mut stack, false).unwrap();
        assert_eq!(
            report.gpu_error,
            Some(BackendError::Device("out of memory".into()))
        );
        assert_eq!(log.borrow().errors, ["device error: out of memory"]);
        assert!(renderer.render(&mut stack, false).unwrap().gpu_error.is_none());
    }

    #[test]
    fn missing_and_mismatched_buffers_fail() {
        let mut stack = LayerStack::new(4, 4);
        let id = stack.push_layer();
        let (mut renderer, _) = traced(&stack);

        let stranger = [Layer::new(LayerId(77))];
        assert_eq!(
            renderer.render_layers(&stranger, &mut stack, false),
            Err(RenderError::MissingBuffer(LayerId(77)))
        );

        stack.resize_canvas(5, 4);
        assert_eq!(
            renderer.render(&mut stack, false),
            Err(RenderError::BufferSize {
                layer: id,
                expected: (4, 4),
                actual: (5, 4),
            })
        );
    }

    #[test]
    fn dispose_releases_everything_once() {
        let mut stack = LayerStack::new(2, 2);
        stack.push_layer();
        let (mut renderer, log) = traced(&stack);
        renderer.dispose();
        renderer.dispose();

        assert!(renderer.is_disposed());
        assert_eq!(renderer.backend().live_resources(), 0);
        assert_eq!(
            log.borrow().releases,
            [
                ResourceKind::ArrayTexture,
                ResourceKind::Pipeline,
                ResourceKind::VertexBuffer
            ]
        );
        assert_eq!(log.borrow().disposed, 1);
    }

    #[test]
    fn failed_pipeline_fails_construction() {
        let mut backend = SoftwareBackend::new();
        backend.reject_pipelines("link error");
        assert!(matches!(
            Renderer::new(backend, RendererConfig::default()),
            Err(RenderError::Backend(BackendError::ProgramLink(_)))
        ));
    }
}
