// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.

use std::io::{self, Write};

use lamina_core::trace::{
    CompositeEvent, GpuErrorEvent, LayerUploadEvent, ReleaseEvent, TextureResizeEvent, TraceSink,
    UploadKind,
};

/// A [`TraceSink`] that writes one line per event.
///
/// Write errors are ignored; tracing never interrupts rendering.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    out: W,
}

impl<W: Write> core::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Writes to standard error.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            out: Box::new(io::stderr()),
        }
    }
}

impl Default for PrettyPrintSink {
    fn default() -> Self {
        Self::stderr()
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Writes to `out`.
    #[must_use]
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_texture_resize(&mut self, e: &TextureResizeEvent) {
        _ = writeln!(
            self.out,
            "texture resize {}x{} depth {} -> {} ({} -> {} bytes){}",
            e.width,
            e.height,
            e.old_depth,
            e.new_depth,
            e.old_bytes,
            e.new_bytes,
            if e.forced { " forced" } else { "" },
        );
    }

    fn on_layer_upload(&mut self, e: &LayerUploadEvent) {
        let kind = match e.kind {
            UploadKind::Full => "full".to_owned(),
            UploadKind::Tiles { count } => format!("{count} tiles"),
        };
        _ = writeln!(
            self.out,
            "[frame {}] upload {:?} -> slice {}: {kind}, {} bytes",
            e.frame_index, e.layer, e.slice, e.bytes,
        );
    }

    fn on_composite(&mut self, e: &CompositeEvent) {
        _ = writeln!(
            self.out,
            "[frame {}] composite {} layers",
            e.frame_index, e.layer_count,
        );
    }

    fn on_gpu_error(&mut self, e: &GpuErrorEvent<'_>) {
        _ = writeln!(
            self.out,
            "[frame {}] GPU error: {}",
            e.frame_index, e.message
        );
    }

    fn on_release(&mut self, e: &ReleaseEvent) {
        _ = writeln!(self.out, "release {:?}", e.resource);
    }

    fn on_dispose(&mut self) {
        _ = writeln!(self.out, "disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_core::layer::LayerId;
    use lamina_core::trace::ResourceKind;

    fn printed(f: impl FnOnce(&mut PrettyPrintSink<Vec<u8>>)) -> String {
        let mut sink = PrettyPrintSink::new(Vec::new());
        f(&mut sink);
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn one_line_per_event() {
        let text = printed(|sink| {
            sink.on_layer_upload(&LayerUploadEvent {
                frame_index: 2,
                slice: 1,
                layer: LayerId(7),
                kind: UploadKind::Tiles { count: 3 },
                bytes: 12_288,
            });
            sink.on_composite(&CompositeEvent {
                frame_index: 2,
                layer_count: 2,
            });
            sink.on_release(&ReleaseEvent {
                resource: ResourceKind::ArrayTexture,
            });
            sink.on_dispose();
        });
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "[frame 2] upload LayerId(7) -> slice 1: 3 tiles, 12288 bytes",
                "[frame 2] composite 2 layers",
                "release ArrayTexture",
                "disposed",
            ]
        );
    }

    #[test]
    fn forced_resize_is_marked() {
        let text = printed(|sink| {
            sink.on_texture_resize(&TextureResizeEvent {
                width: 4,
                height: 2,
                old_depth: 1,
                new_depth: 1,
                old_bytes: 32,
                new_bytes: 32,
                forced: true,
            });
        });
        assert_eq!(text, "texture resize 4x2 depth 1 -> 1 (32 -> 32 bytes) forced\n");
    }
}
