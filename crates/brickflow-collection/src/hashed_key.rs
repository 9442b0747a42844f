//! An explicit `(key, hash)` pair for shuffle grouping.
//!
//! Regridding needs to force co-location of fragments by a *custom*
//! hash derived from the destination grid cell, not whatever `Hash`
//! impl the key type happens to have. Rather than relying on a default
//! collection hash (which `group_by_key` would use if `K` implemented
//! `Hash` directly), callers wrap their key in a [`HashedKey`] that
//! carries its own hash alongside the key's equality.

use std::hash::{Hash, Hasher};

/// A key paired with an explicit hash value, used so [`super::Collection::group_by_key`]
/// groups by a caller-chosen hash rather than the key type's own `Hash`
/// impl.
#[derive(Clone, Debug)]
pub struct HashedKey<K> {
    pub key: K,
    hash: u64,
}

impl<K> HashedKey<K> {
    #[must_use]
    pub fn new(key: K, hash: u64) -> Self {
        Self { key, hash }
    }

    #[must_use]
    pub fn hash_value(&self) -> u64 {
        self.hash
    }
}

impl<K: PartialEq> PartialEq for HashedKey<K> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<K: Eq> Eq for HashedKey<K> {}

impl<K> Hash for HashedKey<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}
