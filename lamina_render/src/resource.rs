// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Opaque keys for backend-managed GPU resources.

use core::fmt;

/// An opaque handle to a backend-managed resource (array texture, program,
/// vertex buffer).
///
/// Keys are assigned by the [`Backend`](crate::Backend) and handed back to it
/// without interpretation by the renderer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKey(pub u64);

impl fmt::Debug for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceKey({})", self.0)
    }
}

/// Hands out increasing [`ResourceKey`]s, starting at 1.
#[derive(Clone, Debug, Default)]
pub struct KeyAllocator {
    last: u64,
}

impl KeyAllocator {
    /// Creates an allocator whose first key is `ResourceKey(1)`.
    #[must_use]
    pub const fn new() -> Self {
        Self { last: 0 }
    }

    /// Returns a key that has not been handed out before.
    pub fn next_key(&mut self) -> ResourceKey {
        self.last += 1;
        ResourceKey(self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_unique_and_nonzero() {
        let mut keys = KeyAllocator::new();
        let a = keys.next_key();
        let b = keys.next_key();
        assert_eq!(a, ResourceKey(1));
        assert_ne!(a, b);
    }
}
