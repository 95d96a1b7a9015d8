//! [`EncryptionManager`]: the facade persistence layers call.
//!
//! Each call runs the same pipeline: blank passthrough, cache lookup, key
//! resolution, strategy dispatch, cache store. Any failure after the cache
//! lookup is returned wrapped in [`CryptoError::Encrypt`] or
//! [`CryptoError::Decrypt`] with the original cause attached.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use common::{Algorithm, CryptoError, FieldCipher, DEFAULT_KEY_ID};
use tracing::{debug, info};

use crate::cache::{CacheKey, ResultCache};
use crate::config::EncryptionConfig;
use crate::crypto::{EncryptionStrategy, StrategyRegistry};
use crate::keys::{self, KeyStore, RawKey};

/// Thread-safe encryption facade.
///
/// Owns its key store, strategy registry and (optional) result cache; two
/// managers never share state. Share one between threads with an `Arc`.
#[derive(Debug)]
pub struct EncryptionManager {
    keys: KeyStore,
    strategies: StrategyRegistry,
    cache: Option<ResultCache>,
    default_algorithm: Algorithm,
    enabled: bool,
    log_enabled: bool,
}

impl EncryptionManager {
    /// Build a manager from validated configuration with the standard
    /// strategy wiring.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation or a key cannot
    /// be decoded.
    pub fn new(cfg: &EncryptionConfig) -> Result<Self> {
        Self::with_registry(cfg, StrategyRegistry::standard())
    }

    /// Build a manager with a caller-supplied strategy registry.
    ///
    /// # Errors
    ///
    /// As for [`EncryptionManager::new`], plus the registry must cover the
    /// configured default algorithm.
    pub fn with_registry(cfg: &EncryptionConfig, strategies: StrategyRegistry) -> Result<Self> {
        cfg.validate().context("invalid encryption configuration")?;
        if !strategies.contains(cfg.default_algorithm) {
            anyhow::bail!(
                "no strategy registered for the default algorithm {}",
                cfg.default_algorithm
            );
        }

        let store = KeyStore::new();
        keys::populate(cfg, &store).context("failed to load configured keys")?;

        let cache = cfg.cache_enabled.then(|| {
            ResultCache::new(
                cfg.cache_max_size,
                Duration::from_secs(cfg.cache_expire_seconds),
            )
        });

        info!(
            enabled = cfg.enabled,
            default_algorithm = %cfg.default_algorithm,
            cache_enabled = cfg.cache_enabled,
            keys = store.len(),
            "encryption manager initialised"
        );

        Ok(Self {
            keys: store,
            strategies,
            cache,
            default_algorithm: cfg.default_algorithm,
            enabled: cfg.enabled,
            log_enabled: cfg.log_enabled,
        })
    }

    /// Load configuration from the environment and build a manager.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or construction fails.
    pub fn from_env() -> Result<Self> {
        let cfg = EncryptionConfig::from_env()?;
        Self::new(&cfg)
    }

    /// Algorithm used by [`encrypt`](Self::encrypt) and [`decrypt`](Self::decrypt).
    pub fn default_algorithm(&self) -> Algorithm {
        self.default_algorithm
    }

    /// Whether the manager transforms values at all.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Key identity used when a caller does not specify one.
    pub fn default_key_id(&self) -> &'static str {
        DEFAULT_KEY_ID
    }

    /// Encrypt with the default algorithm.
    ///
    /// # Errors
    ///
    /// See [`encrypt_with`](Self::encrypt_with).
    pub fn encrypt(&self, plaintext: &str, key_id: &str) -> Result<String, CryptoError> {
        self.encrypt_with(plaintext, key_id, self.default_algorithm)
    }

    /// Encrypt `plaintext` under `key_id` with `algorithm`.
    ///
    /// Blank input, and input already encrypted by `algorithm`, come back
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Encrypt`] wrapping [`CryptoError::InvalidKey`]
    /// if no key resolves or its size is wrong,
    /// [`CryptoError::UnsupportedAlgorithm`] if no strategy is registered, or
    /// the cipher's own failure.
    pub fn encrypt_with(
        &self,
        plaintext: &str,
        key_id: &str,
        algorithm: Algorithm,
    ) -> Result<String, CryptoError> {
        if !self.enabled || plaintext.trim().is_empty() {
            return Ok(plaintext.to_owned());
        }

        let cache_key = self.cache.as_ref().map(|_| CacheKey::new(algorithm, key_id, plaintext));
        if let (Some(cache), Some(cache_key)) = (&self.cache, &cache_key) {
            if let Some(hit) = cache.get_encrypted(cache_key) {
                if self.log_enabled {
                    debug!(key_id, %algorithm, "encrypt cache hit");
                }
                return Ok(hit);
            }
        }

        let (key, strategy) = self
            .resolve(key_id, algorithm)
            .map_err(CryptoError::into_encrypt)?;
        let token = strategy
            .encrypt(plaintext, key.as_bytes(), algorithm)
            .map_err(CryptoError::into_encrypt)?;

        if let (Some(cache), Some(cache_key)) = (&self.cache, cache_key) {
            cache.put_encrypted(cache_key, token.clone());
        }
        if self.log_enabled {
            debug!(key_id, %algorithm, input_len = plaintext.len(), "field encrypted");
        }
        Ok(token)
    }

    /// Decrypt with the default algorithm.
    ///
    /// # Errors
    ///
    /// See [`decrypt_with`](Self::decrypt_with).
    pub fn decrypt(&self, ciphertext: &str, key_id: &str) -> Result<String, CryptoError> {
        self.decrypt_with(ciphertext, key_id, self.default_algorithm)
    }

    /// Decrypt `ciphertext` under `key_id` with `algorithm`.
    ///
    /// Blank input, and input that `algorithm`'s strategy does not recognise
    /// as its own token, come back unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Decrypt`] wrapping the cause: a missing or
    /// wrong-size key, an unregistered algorithm, a malformed token, or a
    /// token that fails verification.
    pub fn decrypt_with(
        &self,
        ciphertext: &str,
        key_id: &str,
        algorithm: Algorithm,
    ) -> Result<String, CryptoError> {
        if !self.enabled || ciphertext.trim().is_empty() {
            return Ok(ciphertext.to_owned());
        }

        let cache_key = self.cache.as_ref().map(|_| CacheKey::new(algorithm, key_id, ciphertext));
        if let (Some(cache), Some(cache_key)) = (&self.cache, &cache_key) {
            if let Some(hit) = cache.get_decrypted(cache_key) {
                if self.log_enabled {
                    debug!(key_id, %algorithm, "decrypt cache hit");
                }
                return Ok(hit);
            }
        }

        let (key, strategy) = self
            .resolve(key_id, algorithm)
            .map_err(CryptoError::into_decrypt)?;
        if !strategy.is_encrypted(ciphertext) {
            return Ok(ciphertext.to_owned());
        }
        let plaintext = strategy
            .decrypt(ciphertext, key.as_bytes(), algorithm)
            .map_err(CryptoError::into_decrypt)?;

        if let (Some(cache), Some(cache_key)) = (&self.cache, cache_key) {
            cache.put_decrypted(cache_key, plaintext.clone());
        }
        if self.log_enabled {
            debug!(key_id, %algorithm, input_len = ciphertext.len(), "field decrypted");
        }
        Ok(plaintext)
    }

    /// Whether `text` starts with any known token prefix.
    pub fn is_encrypted(&self, text: &str) -> bool {
        !text.trim().is_empty() && Algorithm::from_token(text).is_some()
    }

    /// Store (or replace) the key for `key_id`.
    ///
    /// Calls already holding the previous key finish with it. Also clears the
    /// result cache.
    pub fn add_key(&self, key_id: &str, key: Vec<u8>) {
        let key = RawKey::new(key);
        info!(key_id, key_len = key.len(), fingerprint = %key.fingerprint(), "key added");
        self.keys.add(key_id, key);
        self.clear_cache();
    }

    /// Remove the key for `key_id`. Removing an absent key is a no-op.
    ///
    /// Also clears the result cache when a key was removed.
    pub fn remove_key(&self, key_id: &str) {
        if self.keys.remove(key_id) {
            info!(key_id, "key removed");
            self.clear_cache();
        }
    }

    /// Sorted identities of the stored keys.
    pub fn key_ids(&self) -> Vec<String> {
        self.keys.ids()
    }

    /// Drop every cached result. A no-op when the cache is disabled or empty.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
            debug!("encryption result cache cleared");
        }
    }

    /// Entry counts `(encrypt, decrypt)`, or `None` when the cache is disabled.
    pub fn cache_len(&self) -> Option<(usize, usize)> {
        self.cache.as_ref().map(ResultCache::len)
    }

    fn resolve(
        &self,
        key_id: &str,
        algorithm: Algorithm,
    ) -> Result<(Arc<RawKey>, Arc<dyn EncryptionStrategy>), CryptoError> {
        let key = self
            .keys
            .get(key_id)
            .ok_or_else(|| CryptoError::InvalidKey(format!("no key registered for `{key_id}`")))?;
        let strategy = self.strategies.get(algorithm)?;
        Ok((key, strategy))
    }
}

impl FieldCipher for EncryptionManager {
    fn encrypt(&self, text: &str, key_id: &str) -> Result<String, CryptoError> {
        EncryptionManager::encrypt(self, text, key_id)
    }

    fn decrypt(&self, text: &str, key_id: &str) -> Result<String, CryptoError> {
        EncryptionManager::decrypt(self, text, key_id)
    }

    fn is_encrypted(&self, text: &str) -> bool {
        EncryptionManager::is_encrypted(self, text)
    }
}
