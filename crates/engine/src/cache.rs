//! Look-aside cache of encrypt/decrypt results.
//!
//! Entries are keyed by (algorithm, key identity, input text) and hold output
//! text only, never key bytes. Each direction has its own bounded,
//! time-expiring map. Eviction runs on access: expired entries are dropped
//! when read, and an insert that pushes a map past capacity first sweeps
//! expired entries, then evicts the oldest.
//!
//! While enabled, repeated AEAD encryption of the same input under the same
//! key returns the cached token instead of a freshly-nonced one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::Algorithm;
use dashmap::DashMap;

/// Composite cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Algorithm selector of the call.
    pub algorithm: Algorithm,
    /// Key identity of the call.
    pub key_id: String,
    /// Literal input text.
    pub input: String,
}

impl CacheKey {
    /// Build a key from borrowed parts.
    pub fn new(algorithm: Algorithm, key_id: &str, input: &str) -> Self {
        Self {
            algorithm,
            key_id: key_id.to_owned(),
            input: input.to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    inserted_at: Instant,
}

/// One direction's bounded, expiring map.
#[derive(Debug)]
struct TextCache {
    entries: DashMap<CacheKey, CacheEntry>,
    max_size: usize,
    ttl: Duration,
}

impl TextCache {
    fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_size,
            ttl,
        }
    }

    fn get(&self, key: &CacheKey) -> Option<String> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &CacheKey, now: Instant) -> Option<String> {
        // Copy out before touching the map again; a live guard would
        // deadlock `remove_if` on the same shard.
        let (value, inserted_at) = self
            .entries
            .get(key)
            .map(|e| (e.value.clone(), e.inserted_at))?;
        if now.duration_since(inserted_at) < self.ttl {
            return Some(value);
        }
        let ttl = self.ttl;
        self.entries
            .remove_if(key, |_, e| now.duration_since(e.inserted_at) >= ttl);
        None
    }

    fn put(&self, key: CacheKey, value: String) {
        self.put_at(key, value, Instant::now());
    }

    fn put_at(&self, key: CacheKey, value: String, now: Instant) {
        if self.max_size == 0 {
            return;
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
            },
        );
        if self.entries.len() > self.max_size {
            self.evict(now);
        }
    }

    fn evict(&self, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, e| now.duration_since(e.inserted_at) < ttl);
        while self.entries.len() > self.max_size {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|e| e.inserted_at)
                .map(|e| e.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&self) {
        self.entries.clear();
    }
}

/// Encrypt- and decrypt-direction result caches owned by one manager.
///
/// Cloning shares the underlying maps.
#[derive(Debug, Clone)]
pub struct ResultCache {
    encrypted: Arc<TextCache>,
    decrypted: Arc<TextCache>,
}

impl ResultCache {
    /// Create both caches with the same bounds.
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            encrypted: Arc::new(TextCache::new(max_size, ttl)),
            decrypted: Arc::new(TextCache::new(max_size, ttl)),
        }
    }

    /// Cached token for a previous encryption of `key.input`.
    pub fn get_encrypted(&self, key: &CacheKey) -> Option<String> {
        self.encrypted.get(key)
    }

    /// Remember the token produced for `key.input`.
    pub fn put_encrypted(&self, key: CacheKey, token: String) {
        self.encrypted.put(key, token);
    }

    /// Cached plaintext for a previous decryption of `key.input`.
    pub fn get_decrypted(&self, key: &CacheKey) -> Option<String> {
        self.decrypted.get(key)
    }

    /// Remember the plaintext recovered from `key.input`.
    pub fn put_decrypted(&self, key: CacheKey, plaintext: String) {
        self.decrypted.put(key, plaintext);
    }

    /// Entry counts as `(encrypt, decrypt)`.
    pub fn len(&self) -> (usize, usize) {
        (self.encrypted.len(), self.decrypted.len())
    }

    /// Returns `true` if both directions are empty.
    pub fn is_empty(&self) -> bool {
        self.len() == (0, 0)
    }

    /// Drop every entry in both directions. Clearing an empty cache is a no-op.
    pub fn clear(&self) {
        self.encrypted.clear();
        self.decrypted.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(input: &str) -> CacheKey {
        CacheKey::new(Algorithm::AesGcm, "default", input)
    }

    #[test]
    fn directions_are_independent() {
        let cache = ResultCache::new(10, Duration::from_secs(60));
        cache.put_encrypted(key("hello"), "ENC(AES-GCM):x".into());
        assert_eq!(cache.get_encrypted(&key("hello")).as_deref(), Some("ENC(AES-GCM):x"));
        assert!(cache.get_decrypted(&key("hello")).is_none());
        assert_eq!(cache.len(), (1, 0));
    }

    #[test]
    fn key_components_all_matter() {
        let cache = ResultCache::new(10, Duration::from_secs(60));
        cache.put_encrypted(key("hello"), "t".into());
        assert!(cache
            .get_encrypted(&CacheKey::new(Algorithm::Sm4Gcm, "default", "hello"))
            .is_none());
        assert!(cache
            .get_encrypted(&CacheKey::new(Algorithm::AesGcm, "users", "hello"))
            .is_none());
        assert!(cache.get_encrypted(&key("hello!")).is_none());
    }

    #[test]
    fn entries_expire() {
        let cache = TextCache::new(10, Duration::from_secs(5));
        let t0 = Instant::now();
        cache.put_at(key("a"), "1".into(), t0);
        assert_eq!(cache.get_at(&key("a"), t0 + Duration::from_secs(4)).as_deref(), Some("1"));
        assert!(cache.get_at(&key("a"), t0 + Duration::from_secs(5)).is_none());
        // Expired entry is dropped on read.
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let cache = TextCache::new(2, Duration::from_secs(60));
        let t0 = Instant::now();
        cache.put_at(key("a"), "1".into(), t0);
        cache.put_at(key("b"), "2".into(), t0 + Duration::from_millis(1));
        cache.put_at(key("c"), "3".into(), t0 + Duration::from_millis(2));
        assert_eq!(cache.len(), 2);
        let now = t0 + Duration::from_millis(3);
        assert!(cache.get_at(&key("a"), now).is_none());
        assert!(cache.get_at(&key("b"), now).is_some());
        assert!(cache.get_at(&key("c"), now).is_some());
    }

    #[test]
    fn capacity_sweep_prefers_expired_entries() {
        let cache = TextCache::new(2, Duration::from_secs(5));
        let t0 = Instant::now();
        cache.put_at(key("old"), "1".into(), t0);
        cache.put_at(key("b"), "2".into(), t0 + Duration::from_secs(4));
        cache.put_at(key("c"), "3".into(), t0 + Duration::from_secs(6));
        assert_eq!(cache.len(), 2);
        let now = t0 + Duration::from_secs(6);
        assert!(cache.get_at(&key("b"), now).is_some());
        assert!(cache.get_at(&key("c"), now).is_some());
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let cache = TextCache::new(0, Duration::from_secs(60));
        cache.put(key("a"), "1".into());
        assert_eq!(cache.len(), 0);
        assert!(cache.get(&key("a")).is_none());
    }

    #[test]
    fn clear_empties_both_directions() {
        let cache = ResultCache::new(10, Duration::from_secs(60));
        cache.clear();
        cache.put_encrypted(key("a"), "1".into());
        cache.put_decrypted(key("b"), "2".into());
        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_get_put() {
        let cache = ResultCache::new(64, Duration::from_secs(60));
        std::thread::scope(|s| {
            for t in 0..8 {
                let cache = cache.clone();
                s.spawn(move || {
                    for i in 0..500 {
                        let k = key(&format!("{t}-{i}"));
                        cache.put_encrypted(k.clone(), format!("v{i}"));
                        if let Some(v) = cache.get_encrypted(&k) {
                            assert_eq!(v, format!("v{i}"));
                        }
                    }
                });
            }
        });
        assert!(cache.len().0 <= 64);
    }
}
