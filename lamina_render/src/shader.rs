// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! WGSL source of the compositing program.

use crate::backend::ShaderSource;

/// Vertex and fragment stages of the layer compositor.
///
/// The vertex stage passes clip-space positions through. The fragment stage
/// samples every active slice of the array texture at the fragment's pixel
/// and folds them bottom-up with per-slice opacity and blend mode, matching
/// [`composite_over`](crate::blend::composite_over). Row 0 of the surface is
/// row 0 of every slice.
pub const COMPOSITE_WGSL: &str = r"
struct Composite {
    layer_count: u32,
    opacities: array<vec4<f32>, 4>,
    blend_modes: array<vec4<i32>, 4>,
}

@group(0) @binding(0) var layers: texture_2d_array<f32>;
@group(0) @binding(1) var layer_sampler: sampler;
@group(0) @binding(2) var<uniform> composite: Composite;

@vertex
fn vs_main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position, 0.0, 1.0);
}

fn blend(mode: i32, cb: vec3<f32>, cs: vec3<f32>) -> vec3<f32> {
    switch mode {
        case 1: {
            return cb * cs;
        }
        case 2: {
            return cb + cs - cb * cs;
        }
        default: {
            return cs;
        }
    }
}

@fragment
fn fs_main(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {
    let dims = vec2<f32>(textureDimensions(layers));
    let uv = frag.xy / dims;
    var color = vec3<f32>(0.0);
    var alpha = 0.0;
    for (var i = 0u; i < composite.layer_count; i++) {
        let texel = textureSampleLevel(layers, layer_sampler, uv, i32(i), 0.0);
        let opacity = composite.opacities[i / 4u][i % 4u];
        let mode = composite.blend_modes[i / 4u][i % 4u];
        let src_alpha = texel.a * opacity;
        let out_alpha = src_alpha + alpha * (1.0 - src_alpha);
        if out_alpha > 0.0 {
            let mixed = (1.0 - alpha) * texel.rgb + alpha * blend(mode, color, texel.rgb);
            color = (src_alpha * mixed + alpha * (1.0 - src_alpha) * color) / out_alpha;
        } else {
            color = vec3<f32>(0.0);
        }
        alpha = out_alpha;
    }
    return vec4<f32>(color, alpha);
}
";

/// The compositing program as a [`ShaderSource`].
pub const COMPOSITE_SHADER: ShaderSource<'static> = ShaderSource {
    label: "lamina composite",
    wgsl: COMPOSITE_WGSL,
};
