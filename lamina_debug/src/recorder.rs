// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a byte
//! buffer as tagged little-endian records. [`decode`] reads them back as an
//! iterator of [`RecordedEvent`].
//!
//! Clones of a recorder share one buffer, so a clone can be boxed into the
//! renderer's sink while the original stays with the caller for reading.

use std::cell::RefCell;
use std::rc::Rc;

use lamina_core::layer::LayerId;
use lamina_core::trace::{
    CompositeEvent, GpuErrorEvent, LayerUploadEvent, ReleaseEvent, ResourceKind,
    TextureResizeEvent, TraceSink, UploadKind,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_TEXTURE_RESIZE: u8 = 1;
const TAG_LAYER_UPLOAD: u8 = 2;
const TAG_COMPOSITE: u8 = 3;
const TAG_GPU_ERROR: u8 = 4;
const TAG_RELEASE: u8 = 5;
const TAG_DISPOSE: u8 = 6;

// Upload kind sub-tags.
const UPLOAD_FULL: u8 = 0;
const UPLOAD_TILES: u8 = 1;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Clone, Debug, Default)]
pub struct RecorderSink {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.buf.borrow().clone()
    }

    /// Number of bytes recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.borrow().len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.borrow().is_empty()
    }

    /// Drops everything recorded so far, for all clones.
    pub fn clear(&self) {
        self.buf.borrow_mut().clear();
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&self, v: u8) {
        self.buf.borrow_mut().push(v);
    }

    fn write_u32(&self, v: u32) {
        self.buf.borrow_mut().extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&self, v: u64) {
        self.buf.borrow_mut().extend_from_slice(&v.to_le_bytes());
    }

    fn write_str(&self, s: &str) {
        // Messages longer than u32::MAX bytes are cut at a char boundary.
        let mut end = s.len().min(u32::MAX as usize);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "end is capped at u32::MAX above"
        )]
        self.write_u32(end as u32);
        self.buf.borrow_mut().extend_from_slice(&s.as_bytes()[..end]);
    }

    fn write_resource(&self, r: ResourceKind) {
        self.write_u8(match r {
            ResourceKind::ArrayTexture => 0,
            ResourceKind::Pipeline => 1,
            ResourceKind::VertexBuffer => 2,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_texture_resize(&mut self, e: &TextureResizeEvent) {
        self.write_u8(TAG_TEXTURE_RESIZE);
        self.write_u32(e.width);
        self.write_u32(e.height);
        self.write_u32(e.old_depth);
        self.write_u32(e.new_depth);
        self.write_u64(e.old_bytes);
        self.write_u64(e.new_bytes);
        self.write_u8(u8::from(e.forced));
    }

    fn on_layer_upload(&mut self, e: &LayerUploadEvent) {
        self.write_u8(TAG_LAYER_UPLOAD);
        self.write_u64(e.frame_index);
        self.write_u32(e.slice);
        self.write_u32(e.layer.0);
        match e.kind {
            UploadKind::Full => {
                self.write_u8(UPLOAD_FULL);
                self.write_u32(0);
            }
            UploadKind::Tiles { count } => {
                self.write_u8(UPLOAD_TILES);
                self.write_u32(count);
            }
        }
        self.write_u64(e.bytes);
    }

    fn on_composite(&mut self, e: &CompositeEvent) {
        self.write_u8(TAG_COMPOSITE);
        self.write_u64(e.frame_index);
        self.write_u32(e.layer_count);
    }

    fn on_gpu_error(&mut self, e: &GpuErrorEvent<'_>) {
        self.write_u8(TAG_GPU_ERROR);
        self.write_u64(e.frame_index);
        self.write_str(e.message);
    }

    fn on_release(&mut self, e: &ReleaseEvent) {
        self.write_u8(TAG_RELEASE);
        self.write_resource(e.resource);
    }

    fn on_dispose(&mut self) {
        self.write_u8(TAG_DISPOSE);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedEvent {
    /// A [`TextureResizeEvent`].
    TextureResize(TextureResizeEvent),
    /// A [`LayerUploadEvent`].
    LayerUpload(LayerUploadEvent),
    /// A [`CompositeEvent`].
    Composite(CompositeEvent),
    /// A [`GpuErrorEvent`], with the message owned.
    GpuError {
        /// Frame counter.
        frame_index: u64,
        /// Backend diagnostic text.
        message: String,
    },
    /// A [`ReleaseEvent`].
    Release(ReleaseEvent),
    /// The renderer was disposed.
    Dispose,
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first unknown tag or truncated record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take(&mut self, n: usize) -> Option<&[u8]> {
        let end = self.pos.checked_add(n)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.take(4)?.try_into().ok()?))
    }

    fn read_u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.take(8)?.try_into().ok()?))
    }

    fn read_string(&mut self) -> Option<String> {
        let len = usize::try_from(self.read_u32()?).ok()?;
        let bytes = self.take(len)?;
        Some(String::from_utf8_lossy(bytes).into_owned())
    }

    fn read_resource(&mut self) -> Option<ResourceKind> {
        Some(match self.read_u8()? {
            0 => ResourceKind::ArrayTexture,
            1 => ResourceKind::Pipeline,
            2 => ResourceKind::VertexBuffer,
            _ => return None,
        })
    }

    fn decode_texture_resize(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::TextureResize(TextureResizeEvent {
            width: self.read_u32()?,
            height: self.read_u32()?,
            old_depth: self.read_u32()?,
            new_depth: self.read_u32()?,
            old_bytes: self.read_u64()?,
            new_bytes: self.read_u64()?,
            forced: self.read_u8()? != 0,
        }))
    }

    fn decode_layer_upload(&mut self) -> Option<RecordedEvent> {
        let frame_index = self.read_u64()?;
        let slice = self.read_u32()?;
        let layer = LayerId(self.read_u32()?);
        let sub_tag = self.read_u8()?;
        let count = self.read_u32()?;
        let kind = match sub_tag {
            UPLOAD_FULL => UploadKind::Full,
            UPLOAD_TILES => UploadKind::Tiles { count },
            _ => return None,
        };
        Some(RecordedEvent::LayerUpload(LayerUploadEvent {
            frame_index,
            slice,
            layer,
            kind,
            bytes: self.read_u64()?,
        }))
    }

    fn decode_composite(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Composite(CompositeEvent {
            frame_index: self.read_u64()?,
            layer_count: self.read_u32()?,
        }))
    }

    fn decode_gpu_error(&mut self) -> Option<RecordedEvent> {
        let frame_index = self.read_u64()?;
        let message = self.read_string()?;
        Some(RecordedEvent::GpuError {
            frame_index,
            message,
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_u8()? {
            TAG_TEXTURE_RESIZE => self.decode_texture_resize(),
            TAG_LAYER_UPLOAD => self.decode_layer_upload(),
            TAG_COMPOSITE => self.decode_composite(),
            TAG_GPU_ERROR => self.decode_gpu_error(),
            TAG_RELEASE => Some(RecordedEvent::Release(ReleaseEvent {
                resource: self.read_resource()?,
            })),
            TAG_DISPOSE => Some(RecordedEvent::Dispose),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_resize() -> TextureResizeEvent {
        TextureResizeEvent {
            width: 640,
            height: 480,
            old_depth: 0,
            new_depth: 3,
            old_bytes: 0,
            new_bytes: 640 * 480 * 4 * 3,
            forced: false,
        }
    }

    fn tile_upload(frame_index: u64) -> LayerUploadEvent {
        LayerUploadEvent {
            frame_index,
            slice: 2,
            layer: LayerId(9),
            kind: UploadKind::Tiles { count: 5 },
            bytes: 5 * 32 * 32 * 4,
        }
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        assert_eq!(decode(&[]).count(), 0, "no bytes, no events");
    }

    #[test]
    fn recorded_frame_decodes_in_order() {
        let mut rec = RecorderSink::new();
        rec.on_texture_resize(&sample_resize());
        rec.on_layer_upload(&LayerUploadEvent {
            frame_index: 1,
            slice: 0,
            layer: LayerId(3),
            kind: UploadKind::Full,
            bytes: 640 * 480 * 4,
        });
        rec.on_layer_upload(&tile_upload(1));
        rec.on_composite(&CompositeEvent {
            frame_index: 1,
            layer_count: 3,
        });

        let events: Vec<_> = decode(&rec.to_bytes()).collect();
        assert_eq!(events.len(), 4, "every event is decoded");
        assert_eq!(events[0], RecordedEvent::TextureResize(sample_resize()));
        match &events[1] {
            RecordedEvent::LayerUpload(e) => {
                assert_eq!(e.layer, LayerId(3), "layer id survives");
                assert_eq!(e.kind, UploadKind::Full, "full upload kind survives");
            }
            other => panic!("expected LayerUpload, got {other:?}"),
        }
        assert_eq!(events[2], RecordedEvent::LayerUpload(tile_upload(1)));
        assert_eq!(
            events[3],
            RecordedEvent::Composite(CompositeEvent {
                frame_index: 1,
                layer_count: 3
            })
        );
    }

    #[test]
    fn gpu_error_message_is_kept() {
        let mut rec = RecorderSink::new();
        rec.on_gpu_error(&GpuErrorEvent {
            frame_index: 12,
            message: "device lost: out of memory",
        });
        rec.on_dispose();

        let events: Vec<_> = decode(&rec.to_bytes()).collect();
        assert_eq!(
            events,
            vec![
                RecordedEvent::GpuError {
                    frame_index: 12,
                    message: "device lost: out of memory".into(),
                },
                RecordedEvent::Dispose,
            ]
        );
    }

    #[test]
    fn clones_share_the_buffer() {
        let rec = RecorderSink::new();
        let mut installed = rec.clone();
        installed.on_release(&ReleaseEvent {
            resource: ResourceKind::Pipeline,
        });
        assert!(!rec.is_empty(), "writes through a clone are visible");
        assert_eq!(
            decode(&rec.to_bytes()).next(),
            Some(RecordedEvent::Release(ReleaseEvent {
                resource: ResourceKind::Pipeline
            }))
        );
        rec.clear();
        assert!(installed.is_empty(), "clear affects every clone");
    }

    #[test]
    fn truncated_record_stops_iteration() {
        let mut rec = RecorderSink::new();
        rec.on_layer_upload(&tile_upload(4));
        rec.on_layer_upload(&tile_upload(5));
        let bytes = rec.to_bytes();
        let cut = &bytes[..bytes.len() - 3];
        let events: Vec<_> = decode(cut).collect();
        assert_eq!(events, vec![RecordedEvent::LayerUpload(tile_upload(4))]);
    }

    #[test]
    fn unknown_tag_stops_iteration() {
        let mut rec = RecorderSink::new();
        rec.on_dispose();
        let mut bytes = rec.to_bytes();
        bytes.push(0xEE);
        bytes.push(TAG_DISPOSE);
        assert_eq!(decode(&bytes).count(), 1, "decoding halts at 0xEE");
    }
}
