// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Construction-time renderer configuration.

use crate::error::RenderError;
use crate::select::LayerCapPolicy;
use crate::uniforms::MAX_SLOTS;

/// Configuration for a [`Renderer`](crate::Renderer).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RendererConfig {
    /// Maximum number of layers composited per frame, in `1..=MAX_SLOTS`.
    ///
    /// Also caps the depth of the array texture.
    pub max_layers: usize,
    /// Which layers survive when more than `max_layers` are supplied.
    pub cap_policy: LayerCapPolicy,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl RendererConfig {
    /// 16 layers, keeping the bottommost ones.
    pub const DEFAULT: Self = Self {
        max_layers: MAX_SLOTS,
        cap_policy: LayerCapPolicy::KeepBottommost,
    };

    /// Returns the config with a different layer cap.
    #[must_use]
    pub const fn with_max_layers(mut self, max_layers: usize) -> Self {
        self.max_layers = max_layers;
        self
    }

    /// Returns the config with a different cap policy.
    #[must_use]
    pub const fn with_cap_policy(mut self, cap_policy: LayerCapPolicy) -> Self {
        self.cap_policy = cap_policy;
        self
    }

    /// Checks that the values are usable.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.max_layers == 0 {
            return Err(RenderError::InvalidConfig("max_layers must be at least 1"));
        }
        if self.max_layers > MAX_SLOTS {
            return Err(RenderError::InvalidConfig(
                "max_layers exceeds the shader's 16 uniform slots",
            ));
        }
        Ok(())
    }
}
