// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Renderer errors.

use core::fmt;

use lamina_core::geometry::PixelRect;
use lamina_core::layer::LayerId;

use crate::backend::BackendError;

/// Errors returned by the renderer and its GPU resource wrappers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderError {
    /// The renderer was disposed. No work was done.
    Disposed,
    /// The configuration is out of range.
    InvalidConfig(&'static str),
    /// A backend operation failed.
    Backend(BackendError),
    /// A full-slice upload did not match the texture's slice size.
    BufferLength {
        /// Bytes required.
        expected: usize,
        /// Bytes provided.
        actual: usize,
    },
    /// The slice index is outside the allocated depth.
    SliceOutOfRange {
        /// Requested slice.
        slice: u32,
        /// Allocated depth.
        depth: u32,
    },
    /// A region upload does not fit inside the slice, or its texel count is
    /// not `width × height × 4`.
    RegionOutOfBounds {
        /// Requested region.
        region: PixelRect,
        /// Slice width.
        width: u32,
        /// Slice height.
        height: u32,
    },
    /// The layer source has no buffer for an active layer.
    MissingBuffer(LayerId),
    /// An active layer's buffer does not match the renderer's canvas size.
    BufferSize {
        /// The offending layer.
        layer: LayerId,
        /// Canvas size.
        expected: (u32, u32),
        /// Buffer size.
        actual: (u32, u32),
    },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disposed => f.write_str("renderer has been disposed"),
            Self::InvalidConfig(reason) => write!(f, "invalid renderer config: {reason}"),
            Self::Backend(err) => write!(f, "backend error: {err}"),
            Self::BufferLength { expected, actual } => {
                write!(f, "pixel buffer has {actual} bytes, expected {expected}")
            }
            Self::SliceOutOfRange { slice, depth } => {
                write!(f, "slice {slice} out of range for depth {depth}")
            }
            Self::RegionOutOfBounds {
                region,
                width,
                height,
            } => write!(f, "region {region:?} does not fit a {width}x{height} slice"),
            Self::MissingBuffer(id) => write!(f, "no buffer for {id:?}"),
            Self::BufferSize {
                layer,
                expected,
                actual,
            } => write!(
                f,
                "buffer of {layer:?} is {}x{}, canvas is {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
        }
    }
}

impl core::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BackendError> for RenderError {
    fn from(err: BackendError) -> Self {
        Self::Backend(err)
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use core::error::Error;

    use super::*;

    #[test]
    fn backend_errors_are_wrapped_with_source() {
        let err = RenderError::from(BackendError::ProgramLink("bad entry".into()));
        assert_eq!(err.to_string(), "backend error: program link failed: bad entry");
        assert!(err.source().is_some());
        assert!(RenderError::Disposed.source().is_none());
    }
}
