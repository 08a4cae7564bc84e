// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON export of recorded sessions.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes them as a JSON array, one object per event, each tagged with an
//! `"event"` name.

use std::io::{self, Write};

use serde_json::{Value, json};

use lamina_core::trace::UploadKind;

use crate::recorder::{RecordedEvent, decode};

/// Converts one decoded event to its JSON object.
#[must_use]
pub fn to_value(event: &RecordedEvent) -> Value {
    match event {
        RecordedEvent::TextureResize(e) => json!({
            "event": "TextureResize",
            "width": e.width,
            "height": e.height,
            "old_depth": e.old_depth,
            "new_depth": e.new_depth,
            "old_bytes": e.old_bytes,
            "new_bytes": e.new_bytes,
            "forced": e.forced,
        }),
        RecordedEvent::LayerUpload(e) => {
            let (kind, tiles) = match e.kind {
                UploadKind::Full => ("full", None),
                UploadKind::Tiles { count } => ("tiles", Some(count)),
            };
            json!({
                "event": "LayerUpload",
                "frame_index": e.frame_index,
                "slice": e.slice,
                "layer": e.layer.0,
                "kind": kind,
                "tiles": tiles,
                "bytes": e.bytes,
            })
        }
        RecordedEvent::Composite(e) => json!({
            "event": "Composite",
            "frame_index": e.frame_index,
            "layer_count": e.layer_count,
        }),
        RecordedEvent::GpuError {
            frame_index,
            message,
        } => json!({
            "event": "GpuError",
            "frame_index": frame_index,
            "message": message,
        }),
        RecordedEvent::Release(e) => json!({
            "event": "Release",
            "resource": format!("{:?}", e.resource),
        }),
        RecordedEvent::Dispose => json!({ "event": "Dispose" }),
    }
}

/// Exports recorded events as a pretty-printed JSON array.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let events: Vec<Value> = decode(bytes).map(|e| to_value(&e)).collect();
    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use lamina_core::layer::LayerId;
    use lamina_core::trace::{
        CompositeEvent, GpuErrorEvent, LayerUploadEvent, ReleaseEvent, ResourceKind, TraceSink,
    };

    fn exported(rec: &RecorderSink) -> Vec<Value> {
        let mut out = Vec::new();
        export(&rec.to_bytes(), &mut out).unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_layer_upload(&LayerUploadEvent {
            frame_index: 0,
            slice: 0,
            layer: LayerId(2),
            kind: UploadKind::Tiles { count: 4 },
            bytes: 1024,
        });
        rec.on_composite(&CompositeEvent {
            frame_index: 0,
            layer_count: 1,
        });
        rec.on_gpu_error(&GpuErrorEvent {
            frame_index: 0,
            message: "validation error",
        });
        rec.on_release(&ReleaseEvent {
            resource: ResourceKind::VertexBuffer,
        });

        let parsed = exported(&rec);
        assert_eq!(parsed.len(), 4, "one object per event");

        assert_eq!(parsed[0]["event"], "LayerUpload");
        assert_eq!(parsed[0]["kind"], "tiles");
        assert_eq!(parsed[0]["tiles"], 4);
        assert_eq!(parsed[0]["layer"], 2);

        assert_eq!(parsed[1]["event"], "Composite");
        assert_eq!(parsed[1]["layer_count"], 1);

        assert_eq!(parsed[2]["message"], "validation error");
        assert_eq!(parsed[3]["resource"], "VertexBuffer");
    }

    #[test]
    fn full_upload_has_null_tiles() {
        let mut rec = RecorderSink::new();
        rec.on_layer_upload(&LayerUploadEvent {
            frame_index: 3,
            slice: 1,
            layer: LayerId(1),
            kind: UploadKind::Full,
            bytes: 64,
        });
        let parsed = exported(&rec);
        assert_eq!(parsed[0]["kind"], "full");
        assert!(parsed[0]["tiles"].is_null(), "full uploads carry no tile count");
    }

    #[test]
    fn export_empty_recording() {
        let parsed = exported(&RecorderSink::new());
        assert!(parsed.is_empty(), "nothing recorded, empty array");
    }
}
