// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Active-layer selection.
//!
//! Input layers arrive topmost first. The selection caps them to the
//! configured maximum, drops disabled layers, and returns the survivors
//! bottom-up, which is slice order: the first selected layer goes to slice 0.
//!
//! The cap counts *positions*, before disabled layers are filtered out, so a
//! disabled layer inside the window still uses up a place.

use alloc::vec::Vec;

use lamina_core::layer::Layer;

/// Which end of the stack survives when more layers than the cap are given.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LayerCapPolicy {
    /// Keep the `max` bottommost positions.
    #[default]
    KeepBottommost,
    /// Keep the `max` topmost positions.
    KeepTopmost,
}

/// Fills `out` with the active layers of `layers` (topmost first) in
/// bottom-up order.
pub fn select_active(layers: &[Layer], max: usize, policy: LayerCapPolicy, out: &mut Vec<Layer>) {
    out.clear();
    match policy {
        LayerCapPolicy::KeepTopmost => {
            let window = &layers[..layers.len().min(max)];
            out.extend(window.iter().rev().filter(|layer| layer.enabled).copied());
        }
        LayerCapPolicy::KeepBottommost => {
            out.extend(
                layers
                    .iter()
                    .rev()
                    .take(max)
                    .filter(|layer| layer.enabled)
                    .copied(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use lamina_core::layer::LayerId;

    use super::*;

    fn stack(count: u32) -> Vec<Layer> {
        (0..count).map(|i| Layer::new(LayerId(i))).collect()
    }

    fn ids(layers: &[Layer]) -> Vec<u32> {
        layers.iter().map(|layer| layer.id.0).collect()
    }

    #[test]
    fn reverses_to_bottom_up_and_drops_disabled() {
        let mut layers = stack(4);
        layers[1].enabled = false;
        let mut out = Vec::new();
        select_active(&layers, 16, LayerCapPolicy::KeepTopmost, &mut out);
        assert_eq!(ids(&out), [3, 2, 0]);
    }

    #[test]
    fn keep_topmost_takes_first_positions() {
        let layers = stack(20);
        let mut out = Vec::new();
        select_active(&layers, 16, LayerCapPolicy::KeepTopmost, &mut out);
        assert_eq!(ids(&out), (0..16).rev().collect::<Vec<_>>());
    }

    #[test]
    fn keep_bottommost_takes_last_positions() {
        let layers = stack(20);
        let mut out = Vec::new();
        select_active(&layers, 16, LayerCapPolicy::KeepBottommost, &mut out);
        assert_eq!(ids(&out), (4..20).rev().collect::<Vec<_>>());
    }

    #[test]
    fn default_policy_keeps_bottommost() {
        let layers = stack(20);
        let mut out = Vec::new();
        select_active(&layers, 16, LayerCapPolicy::default(), &mut out);
        let kept: Vec<Layer> = layers.iter().rev().take(16).copied().collect();
        assert_eq!(out, kept);
    }

    #[test]
    fn cap_counts_disabled_positions() {
        let mut layers = stack(5);
        layers[0].enabled = false;
        let mut out = Vec::new();
        select_active(&layers, 2, LayerCapPolicy::KeepTopmost, &mut out);
        assert_eq!(ids(&out), [1]);
    }
}
