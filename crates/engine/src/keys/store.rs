//! [`KeyStore`]: thread-safe mapping from key identity to raw key bytes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use common::DEFAULT_KEY_ID;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Raw key material for one key identity.
///
/// The bytes are zeroed when the last reference is dropped, and `Debug`
/// never prints them.
#[derive(Clone)]
pub struct RawKey(Zeroizing<Vec<u8>>);

impl RawKey {
    /// Take ownership of `bytes` as key material.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Borrow the key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Key length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for a zero-length key.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short, non-reversible identifier for logs: the first 8 bytes of
    /// SHA-256 over the key, hex-encoded.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.as_bytes());
        digest[..8].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for RawKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material, not even in debug builds.
        write!(f, "RawKey([REDACTED; {} bytes])", self.len())
    }
}

/// Thread-safe store of keys by identity.
///
/// Backed by [`ArcSwap`] over an immutable map: lookups are lock-free
/// snapshot reads, and `add`/`remove` install a whole new map atomically,
/// so a reader sees either the old store or the new one and never a mix.
/// A key handed out before a mutation stays valid for as long as the caller
/// holds it.
#[derive(Clone)]
pub struct KeyStore {
    inner: Arc<ArcSwap<HashMap<String, Arc<RawKey>>>>,
}

impl KeyStore {
    /// Create a new, empty [`KeyStore`].
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(HashMap::new())),
        }
    }

    /// Resolve `key_id` to its key.
    ///
    /// An exact match wins. Otherwise, if `key_id` is the canonical default
    /// identity and the store is non-empty, the entry with the
    /// lexicographically smallest identity stands in, so a single configured
    /// key can serve as the default.
    pub fn get(&self, key_id: &str) -> Option<Arc<RawKey>> {
        let keys = self.inner.load();
        if let Some(key) = keys.get(key_id) {
            return Some(Arc::clone(key));
        }
        if key_id != DEFAULT_KEY_ID {
            return None;
        }
        keys.iter()
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(_, key)| Arc::clone(key))
    }

    /// Store (or replace) the key for `key_id`.
    pub fn add(&self, key_id: &str, key: RawKey) {
        let key = Arc::new(key);
        self.inner.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(key_id.to_owned(), Arc::clone(&key));
            next
        });
    }

    /// Remove the key for `key_id`. Removing an absent key is a no-op.
    ///
    /// Returns `true` if a key was removed.
    pub fn remove(&self, key_id: &str) -> bool {
        if !self.inner.load().contains_key(key_id) {
            return false;
        }
        let mut removed = false;
        self.inner.rcu(|current| {
            let mut next = HashMap::clone(current);
            removed = next.remove(key_id).is_some();
            next
        });
        removed
    }

    /// Whether an exact entry exists for `key_id`.
    pub fn contains(&self, key_id: &str) -> bool {
        self.inner.load().contains_key(key_id)
    }

    /// Sorted list of stored identities.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.load().keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    /// Returns `true` if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore").field("ids", &self.ids()).finish()
    }
}
