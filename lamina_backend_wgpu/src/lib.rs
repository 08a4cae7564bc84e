// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! wgpu backend for lamina.
//!
//! [`WgpuBackend`] implements [`Backend`] on a wgpu device:
//!
//! - array textures are `Rgba8Unorm` 2D arrays with
//!   `COPY_DST | TEXTURE_BINDING` usage, sampled with nearest filtering and
//!   clamp-to-edge addressing
//! - the surface is an offscreen `Rgba8Unorm` render target, cleared to
//!   transparent before every composite
//! - readback copies the surface into a `MAP_READ` staging buffer and strips
//!   the 256-byte row padding
//! - device errors are captured through the device's uncaptured-error
//!   handler and surface from [`Backend::take_error`]
//!
//! ```no_run
//! use lamina_backend_wgpu::WgpuBackend;
//! use lamina_render::{Renderer, RendererConfig};
//!
//! let backend = WgpuBackend::headless().expect("no GPU adapter");
//! let renderer = Renderer::new(backend, RendererConfig::default()).unwrap();
//! # drop(renderer);
//! ```

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use lamina_core::buffer::byte_len;
use lamina_core::geometry::PixelRect;
use lamina_render::{
    Backend, BackendError, CompositeUniforms, DrawCall, KeyAllocator, ResourceKey, ShaderSource,
    TextureExtent,
};
use wgpu::util::DeviceExt;

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Row pitch alignment required for texture-to-buffer copies.
const COPY_ROW_ALIGNMENT: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct TextureStorage {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

#[derive(Debug)]
enum Resource {
    /// `None` until allocated, and for zero-area extents.
    ArrayTexture {
        extent: TextureExtent,
        storage: Option<TextureStorage>,
    },
    Pipeline(wgpu::RenderPipeline),
    VertexBuffer {
        buffer: wgpu::Buffer,
        vertex_count: u32,
    },
}

#[derive(Debug)]
struct Surface {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

// ---------------------------------------------------------------------------
// WgpuBackend
// ---------------------------------------------------------------------------

/// A [`Backend`] that composites on a wgpu device.
#[derive(Debug)]
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    keys: KeyAllocator,
    resources: HashMap<ResourceKey, Resource>,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniforms: wgpu::Buffer,
    surface: Option<Surface>,
    /// First uncaptured device error since the last `take_error`.
    errors: Arc<Mutex<Option<String>>>,
}

impl WgpuBackend {
    /// Wraps an existing device and queue.
    ///
    /// Installs an uncaptured-error handler on `device`, replacing any
    /// handler set before.
    #[must_use]
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let errors = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&errors);
        device.on_uncaptured_error(Arc::new(move |error: wgpu::Error| {
            if let Ok(mut slot) = slot.lock() {
                slot.get_or_insert_with(|| error.to_string());
            }
        }));

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lamina composite bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(CompositeUniforms::SIZE as u64),
                    },
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("lamina layer sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..wgpu::SamplerDescriptor::default()
        });

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lamina composite uniforms"),
            size: CompositeUniforms::SIZE as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            device,
            queue,
            keys: KeyAllocator::new(),
            resources: HashMap::new(),
            bind_group_layout,
            sampler,
            uniforms,
            surface: None,
            errors,
        }
    }

    /// Requests an adapter and device with no surface attached.
    pub fn headless() -> Result<Self, BackendError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|err| BackendError::Device(format!("no GPU adapter: {err}")))?;
        let (device, queue) =
            pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
                label: Some("lamina device"),
                ..wgpu::DeviceDescriptor::default()
            }))
            .map_err(|err| BackendError::Device(format!("device request failed: {err}")))?;
        Ok(Self::new(device, queue))
    }

    /// The wgpu device.
    #[inline]
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The wgpu queue.
    #[inline]
    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// The offscreen render target, once the surface has a non-zero size.
    ///
    /// Usable as a copy source, for example to present the composite.
    #[must_use]
    pub fn surface_texture(&self) -> Option<&wgpu::Texture> {
        self.surface.as_ref().map(|surface| &surface.texture)
    }

    fn take_device_error(&self) -> Option<String> {
        self.errors.lock().ok()?.take()
    }

    fn storage(&self, texture: ResourceKey) -> Result<Option<&TextureStorage>, BackendError> {
        match self.resources.get(&texture) {
            Some(Resource::ArrayTexture { storage, .. }) => Ok(storage.as_ref()),
            _ => Err(BackendError::UnknownResource(texture)),
        }
    }
}

/// Formats shader diagnostics one per line, with `line:column` when known.
fn compilation_log(label: &str, info: &wgpu::CompilationInfo) -> Option<String> {
    let errors: Vec<String> = info
        .messages
        .iter()
        .filter(|message| message.message_type == wgpu::CompilationMessageType::Error)
        .map(|message| match message.location {
            Some(at) => format!(
                "{label}:{}:{}: {}",
                at.line_number, at.line_position, message.message
            ),
            None => format!("{label}: {}", message.message),
        })
        .collect();
    (!errors.is_empty()).then(|| errors.join("\n"))
}

impl Backend for WgpuBackend {
    fn create_array_texture(&mut self) -> Result<ResourceKey, BackendError> {
        let key = self.keys.next_key();
        self.resources.insert(
            key,
            Resource::ArrayTexture {
                extent: TextureExtent::default(),
                storage: None,
            },
        );
        Ok(key)
    }

    fn allocate_array_texture(
        &mut self,
        texture: ResourceKey,
        new_extent: TextureExtent,
    ) -> Result<(), BackendError> {
        let Some(Resource::ArrayTexture { extent, storage }) = self.resources.get_mut(&texture)
        else {
            return Err(BackendError::UnknownResource(texture));
        };
        if let Some(old) = storage.take() {
            old.texture.destroy();
        }
        *extent = new_extent;
        if new_extent.width == 0 || new_extent.height == 0 || new_extent.depth == 0 {
            return Ok(());
        }
        // New textures are zero-initialized by wgpu.
        let allocated = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("lamina layer array"),
            size: wgpu::Extent3d {
                width: new_extent.width,
                height: new_extent.height,
                depth_or_array_layers: new_extent.depth,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = allocated.create_view(&wgpu::TextureViewDescriptor {
            label: Some("lamina layer array view"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..wgpu::TextureViewDescriptor::default()
        });
        *storage = Some(TextureStorage {
            texture: allocated,
            view,
        });
        Ok(())
    }

    fn write_array_texture(
        &mut self,
        texture: ResourceKey,
        slice: u32,
        region: PixelRect,
        texels: &[u8],
    ) -> Result<(), BackendError> {
        let Some(Resource::ArrayTexture { extent, storage }) = self.resources.get(&texture) else {
            return Err(BackendError::UnknownResource(texture));
        };
        if slice >= extent.depth
            || !region.fits_within(extent.width, extent.height)
            || texels.len() != byte_len(region.width, region.height)
        {
            return Err(BackendError::Device(format!(
                "write of {region:?} to slice {slice} does not fit {extent:?}"
            )));
        }
        let Some(storage) = storage else {
            return Ok(());
        };
        if region.width == 0 || region.height == 0 {
            return Ok(());
        }
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &storage.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: region.x,
                    y: region.y,
                    z: slice,
                },
                aspect: wgpu::TextureAspect::All,
            },
            texels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(region.width * 4),
                rows_per_image: Some(region.height),
            },
            wgpu::Extent3d {
                width: region.width,
                height: region.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn create_pipeline(&mut self, source: &ShaderSource<'_>) -> Result<ResourceKey, BackendError> {
        // Drop anything unrelated so the checks below only see this program.
        _ = self.take_device_error();

        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(source.label),
                source: wgpu::ShaderSource::Wgsl(source.wgsl.into()),
            });
        let info = pollster::block_on(shader.get_compilation_info());
        if let Some(log) = compilation_log(source.label, &info) {
            _ = self.take_device_error();
            return Err(BackendError::ShaderCompile(log));
        }

        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(source.label),
                bind_group_layouts: &[&self.bind_group_layout],
                immediate_size: 0,
            });
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(source.label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: size_of::<[f32; 2]>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &[wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 0,
                            format: wgpu::VertexFormat::Float32x2,
                        }],
                    }],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    // The program composites itself; the target is replaced.
                    targets: &[Some(wgpu::ColorTargetState {
                        format: FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..wgpu::PrimitiveState::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });
        if let Some(log) = self.take_device_error() {
            return Err(BackendError::ProgramLink(log));
        }

        let key = self.keys.next_key();
        self.resources.insert(key, Resource::Pipeline(pipeline));
        Ok(key)
    }

    fn create_vertex_buffer(&mut self, vertices: &[[f32; 2]]) -> Result<ResourceKey, BackendError> {
        let vertex_count = u32::try_from(vertices.len())
            .map_err(|_| BackendError::ResourceCreation("vertex buffer"))?;
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("lamina vertices"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let key = self.keys.next_key();
        self.resources.insert(
            key,
            Resource::VertexBuffer {
                buffer,
                vertex_count,
            },
        );
        Ok(key)
    }

    fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        if let Some(old) = self.surface.take() {
            old.texture.destroy();
        }
        if width == 0 || height == 0 {
            return Ok(());
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("lamina surface"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.surface = Some(Surface {
            texture,
            view,
            width,
            height,
        });
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), BackendError> {
        let Some(Resource::Pipeline(pipeline)) = self.resources.get(&call.pipeline) else {
            return Err(BackendError::UnknownResource(call.pipeline));
        };
        let Some(Resource::VertexBuffer {
            buffer,
            vertex_count,
        }) = self.resources.get(&call.vertices)
        else {
            return Err(BackendError::UnknownResource(call.vertices));
        };
        if call.vertex_count > *vertex_count {
            return Err(BackendError::Device(format!(
                "draw of {} vertices from a buffer of {vertex_count}",
                call.vertex_count
            )));
        }
        let storage = self.storage(call.texture)?;
        let (Some(surface), Some(storage)) = (&self.surface, storage) else {
            // Nothing to draw into, or nothing to sample.
            return Ok(());
        };

        self.queue
            .write_buffer(&self.uniforms, 0, call.uniforms.as_bytes());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lamina composite bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&storage.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.uniforms.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lamina composite"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("lamina composite pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                ..wgpu::RenderPassDescriptor::default()
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_vertex_buffer(0, buffer.slice(..));
            pass.draw(0..call.vertex_count, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn read_pixels(&mut self, out: &mut [u8]) -> Result<(), BackendError> {
        let Some(surface) = &self.surface else {
            return if out.is_empty() {
                Ok(())
            } else {
                Err(BackendError::Readback(format!(
                    "destination has {} bytes, surface is empty",
                    out.len()
                )))
            };
        };
        let row_len = surface.width * 4;
        if out.len() != byte_len(surface.width, surface.height) {
            return Err(BackendError::Readback(format!(
                "destination has {} bytes, surface has {}",
                out.len(),
                byte_len(surface.width, surface.height)
            )));
        }
        let padded_row = row_len.div_ceil(COPY_ROW_ALIGNMENT) * COPY_ROW_ALIGNMENT;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lamina readback"),
            size: u64::from(padded_row) * u64::from(surface.height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lamina readback"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &surface.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(surface.height),
                },
            },
            wgpu::Extent3d {
                width: surface.width,
                height: surface.height,
                depth_or_array_layers: 1,
            },
        );
        let submission = self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: Some(submission),
                timeout: None,
            })
            .map_err(|err| BackendError::Readback(err.to_string()))?;
        rx.recv()
            .map_err(|err| BackendError::Readback(err.to_string()))?
            .map_err(|err| BackendError::Readback(err.to_string()))?;

        {
            let mapped = slice.get_mapped_range();
            for (dst, src) in out
                .chunks_exact_mut(row_len as usize)
                .zip(mapped.chunks_exact(padded_row as usize))
            {
                dst.copy_from_slice(&src[..row_len as usize]);
            }
        }
        staging.unmap();
        Ok(())
    }

    fn take_error(&mut self) -> Option<BackendError> {
        self.take_device_error().map(BackendError::Device)
    }

    fn release(&mut self, resource: ResourceKey) {
        match self.resources.remove(&resource) {
            Some(Resource::ArrayTexture {
                storage: Some(storage),
                ..
            }) => storage.texture.destroy(),
            Some(Resource::VertexBuffer { buffer, .. }) => buffer.destroy(),
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
