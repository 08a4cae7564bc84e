// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The compositing program and its geometry.

use crate::backend::{Backend, DrawCall, ShaderSource};
use crate::error::RenderError;
use crate::resource::ResourceKey;
use crate::uniforms::CompositeUniforms;

/// One oversized clip-space triangle that covers the whole viewport.
pub const FULLSCREEN_TRIANGLE: [[f32; 2]; 3] = [[-1.0, -1.0], [3.0, -1.0], [-1.0, 3.0]];

/// Owns the compositing program and the full-viewport vertex buffer.
#[derive(Debug)]
pub struct CompositorPipeline {
    program: Option<ResourceKey>,
    vertices: Option<ResourceKey>,
}

impl CompositorPipeline {
    /// Builds the program from `source` and uploads the triangle.
    ///
    /// Compile and link failures carry the backend's diagnostic log. If the
    /// vertex buffer cannot be created, the program is released again.
    pub fn new<B: Backend + ?Sized>(
        backend: &mut B,
        source: &ShaderSource<'_>,
    ) -> Result<Self, RenderError> {
        let program = backend.create_pipeline(source)?;
        let vertices = match backend.create_vertex_buffer(&FULLSCREEN_TRIANGLE) {
            Ok(vertices) => vertices,
            Err(err) => {
                backend.release(program);
                return Err(err.into());
            }
        };
        Ok(Self {
            program: Some(program),
            vertices: Some(vertices),
        })
    }

    /// The program handle, or `None` once released.
    #[inline]
    #[must_use]
    pub const fn program(&self) -> Option<ResourceKey> {
        self.program
    }

    /// Composites the first `uniforms.layer_count` slices of `texture`
    /// (slice 0 at the bottom) into the backend's surface.
    pub fn draw<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        texture: ResourceKey,
        uniforms: &CompositeUniforms,
    ) -> Result<(), RenderError> {
        let (Some(pipeline), Some(vertices)) = (self.program, self.vertices) else {
            return Err(RenderError::Disposed);
        };
        backend.draw(&DrawCall {
            pipeline,
            vertices,
            vertex_count: 3,
            texture,
            uniforms,
        })?;
        Ok(())
    }

    /// Releases the program and the vertex buffer. Returns what was released
    /// as `(program, vertices)`; both are `false` after the first call.
    pub fn release<B: Backend + ?Sized>(&mut self, backend: &mut B) -> (bool, bool) {
        let mut released = (false, false);
        if let Some(program) = self.program.take() {
            backend.release(program);
            released.0 = true;
        }
        if let Some(vertices) = self.vertices.take() {
            backend.release(vertices);
            released.1 = true;
        }
        released
    }
}
