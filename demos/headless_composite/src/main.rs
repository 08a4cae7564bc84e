// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless compositing demo.
//!
//! Paints three layers, composites them on a wgpu device (or the software
//! backend when no adapter is available), then paints a few brush dabs and
//! re-renders only the dirty tiles. Events go to a
//! [`PrettyPrintSink`](lamina_debug::pretty::PrettyPrintSink) and a
//! [`RecorderSink`](lamina_debug::recorder::RecorderSink); the recording is
//! exported as JSON at the end.

use std::fs::File;
use std::io::BufWriter;

use lamina_backend_wgpu::WgpuBackend;
use lamina_core::geometry::PixelRect;
use lamina_core::layer::BlendMode;
use lamina_core::stack::LayerStack;
use lamina_core::trace::{
    CompositeEvent, GpuErrorEvent, LayerUploadEvent, ReleaseEvent, TextureResizeEvent, TraceSink,
};
use lamina_debug::pretty::PrettyPrintSink;
use lamina_debug::recorder::RecorderSink;
use lamina_render::{Backend, Renderer, RendererConfig, SoftwareBackend};

const WIDTH: u32 = 256;
const HEIGHT: u32 = 192;
const DAB: u32 = 12;

/// Forwards every event to two sinks.
struct Tee<A, B>(A, B);

impl<A: TraceSink, B: TraceSink> TraceSink for Tee<A, B> {
    fn on_texture_resize(&mut self, e: &TextureResizeEvent) {
        self.0.on_texture_resize(e);
        self.1.on_texture_resize(e);
    }

    fn on_layer_upload(&mut self, e: &LayerUploadEvent) {
        self.0.on_layer_upload(e);
        self.1.on_layer_upload(e);
    }

    fn on_composite(&mut self, e: &CompositeEvent) {
        self.0.on_composite(e);
        self.1.on_composite(e);
    }

    fn on_gpu_error(&mut self, e: &GpuErrorEvent<'_>) {
        self.0.on_gpu_error(e);
        self.1.on_gpu_error(e);
    }

    fn on_release(&mut self, e: &ReleaseEvent) {
        self.0.on_release(e);
        self.1.on_release(e);
    }

    fn on_dispose(&mut self) {
        self.0.on_dispose();
        self.1.on_dispose();
    }
}

fn main() {
    let recorder = RecorderSink::new();

    match WgpuBackend::headless() {
        Ok(backend) => {
            println!("compositing on wgpu");
            run(backend, &recorder);
        }
        Err(err) => {
            println!("{err}; compositing on the software backend");
            run(SoftwareBackend::new(), &recorder);
        }
    }

    // -- export ------------------------------------------------------------
    let path = "lamina_trace.json";
    let file = File::create(path).expect("failed to create lamina_trace.json");
    let mut writer = BufWriter::new(file);
    lamina_debug::json::export(&recorder.to_bytes(), &mut writer).expect("failed to write trace");
    println!("Wrote {path} ({} bytes recorded)", recorder.len());
}

fn run<B: Backend>(backend: B, recorder: &RecorderSink) {
    let mut stack = paint_scene();

    let sink = Tee(
        PrettyPrintSink::new(Box::new(std::io::stdout())),
        recorder.clone(),
    );
    let mut renderer = Renderer::new(backend, RendererConfig::default())
        .expect("failed to build renderer")
        .with_sink(Box::new(sink));
    renderer
        .resize(stack.width(), stack.height(), stack.layers())
        .expect("resize failed");

    let report = renderer.render(&mut stack, false).expect("render failed");
    println!("first frame: {report:?}");

    // A short diagonal stroke on the top layer.
    let top = stack.layers()[0].id;
    for step in 0..8 {
        let at = PixelRect::new(40 + step * 14, 30 + step * 10, DAB, DAB);
        let buffer = stack.buffer_mut(top).expect("top layer has a buffer");
        buffer.fill_rect(at, [250, 220, 60, 255]);
        let report = renderer.render(&mut stack, true).expect("render failed");
        println!(
            "dab {step}: {} tiles, {} full uploads",
            report.tile_uploads, report.full_uploads
        );
        if let Some(err) = report.gpu_error {
            println!("  GPU reported: {err}");
        }
    }

    let pixels = renderer
        .read_pixels_flipped(&mut stack)
        .expect("readback failed");
    let center = ((HEIGHT / 2 * WIDTH + WIDTH / 2) * 4) as usize;
    println!(
        "{}x{} composite, {} bytes of texture, center pixel {:?}",
        renderer.width(),
        renderer.height(),
        renderer.texture_memory_bytes(),
        &pixels[center..center + 4]
    );

    renderer.dispose();
}

/// Background, a multiplied gradient, and an empty screen-blended layer.
fn paint_scene() -> LayerStack {
    let mut stack = LayerStack::new(WIDTH, HEIGHT);

    let background = stack.push_layer();
    stack
        .buffer_mut(background)
        .expect("new layer has a buffer")
        .fill_rect(PixelRect::from_size(WIDTH, HEIGHT), [240, 236, 228, 255]);

    let gradient = stack.push_layer();
    stack
        .buffer_mut(gradient)
        .expect("new layer has a buffer")
        .edit(PixelRect::new(16, 16, WIDTH - 32, HEIGHT - 32), |row, bytes| {
            for (x, texel) in bytes.chunks_exact_mut(4).enumerate() {
                let r = u8::try_from(x % 256).unwrap_or(u8::MAX);
                let g = u8::try_from(row % 256).unwrap_or(u8::MAX);
                texel.copy_from_slice(&[r, g, 160, 255]);
            }
        })
        .expect("region fits the canvas");
    stack.set_blend_mode(gradient, BlendMode::Multiply);
    stack.set_opacity(gradient, 0.8);

    let ink = stack.push_layer();
    stack.set_blend_mode(ink, BlendMode::Screen);

    stack
}
