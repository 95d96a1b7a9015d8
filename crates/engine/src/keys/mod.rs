//! Key material: the identity-keyed store, start-up population, and generation.
//!
//! # Lifecycle
//!
//! 1. At construction, [`populate`] decodes the configured keys into the
//!    [`KeyStore`]: the default key under `"default"`, then every named key.
//! 2. If nothing was configured and `generate_key_on_startup` is set, a
//!    throwaway key for the default algorithm is generated under `"default"`.
//! 3. Administrative calls may add or remove keys at runtime; each mutation
//!    swaps in a complete new map.
//!
//! # Security invariants
//!
//! - Key bytes are **never** logged, cached, or included in error messages.
//!   Logs carry the key id, its length and a SHA-256 fingerprint prefix.
//! - Key buffers are zeroed on drop.

pub mod generate;
pub mod store;

pub use generate::{generate_base64_key, generate_base64_key_bits, generate_key, generate_key_bits};
pub use store::{KeyStore, RawKey};

use anyhow::{Context, Result};
use common::DEFAULT_KEY_ID;
use tracing::{info, warn};

use crate::config::{decode_key, EncryptionConfig};

/// Decode every configured key into `store`.
///
/// Returns the number of keys stored.
///
/// # Errors
///
/// Returns an error if a configured key value is not valid base64.
pub fn populate(cfg: &EncryptionConfig, store: &KeyStore) -> Result<usize> {
    let mut loaded = 0;

    if let Some(default_key) = cfg.default_key.as_deref().filter(|v| !v.trim().is_empty()) {
        let bytes = decode_key(default_key).context("DEFAULT_KEY is not valid base64")?;
        store.add(DEFAULT_KEY_ID, RawKey::new(bytes));
        loaded += 1;
    }

    for key in cfg.keys.iter().filter(|k| !k.value.trim().is_empty()) {
        let bytes = key.decode()?;
        store.add(&key.id, RawKey::new(bytes));
        loaded += 1;
    }

    if store.is_empty() && cfg.generate_key_on_startup {
        let key = generate_key(cfg.default_algorithm);
        warn!(
            algorithm = %cfg.default_algorithm,
            fingerprint = %key.fingerprint(),
            "no keys configured; generated a throwaway default key (non-production use only)"
        );
        store.add(DEFAULT_KEY_ID, key);
        loaded += 1;
    }

    info!(count = loaded, ids = ?store.ids(), "key store populated");
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use common::Algorithm;

    use super::*;
    use crate::config::KeyConfig;

    #[test]
    fn loads_default_and_named_keys() {
        let cfg = EncryptionConfig {
            default_key: Some(STANDARD.encode([1u8; 32])),
            keys: vec![KeyConfig {
                id: "phone".into(),
                value: STANDARD.encode([2u8; 16]),
                algorithm: Algorithm::Sm4Cbc,
                description: None,
            }],
            ..EncryptionConfig::default()
        };
        let store = KeyStore::new();
        assert_eq!(populate(&cfg, &store).unwrap(), 2);
        assert_eq!(store.get("default").unwrap().as_bytes(), &[1u8; 32]);
        assert_eq!(store.get("phone").unwrap().as_bytes(), &[2u8; 16]);
    }

    #[test]
    fn named_default_replaces_default_key() {
        let cfg = EncryptionConfig {
            default_key: Some(STANDARD.encode([1u8; 32])),
            keys: vec![KeyConfig {
                id: "default".into(),
                value: STANDARD.encode([3u8; 32]),
                algorithm: Algorithm::AesGcm,
                description: None,
            }],
            ..EncryptionConfig::default()
        };
        let store = KeyStore::new();
        populate(&cfg, &store).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("default").unwrap().as_bytes(), &[3u8; 32]);
    }

    #[test]
    fn blank_values_are_skipped() {
        let cfg = EncryptionConfig {
            default_key: Some("   ".into()),
            keys: vec![KeyConfig {
                id: "pending".into(),
                value: String::new(),
                algorithm: Algorithm::AesGcm,
                description: None,
            }],
            ..EncryptionConfig::default()
        };
        assert!(cfg.validate().is_ok());
        let store = KeyStore::new();
        assert_eq!(populate(&cfg, &store).unwrap(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn generates_throwaway_key_only_when_empty() {
        let cfg = EncryptionConfig {
            default_algorithm: Algorithm::Sm4Gcm,
            generate_key_on_startup: true,
            ..EncryptionConfig::default()
        };
        let store = KeyStore::new();
        assert_eq!(populate(&cfg, &store).unwrap(), 1);
        assert_eq!(store.get("default").unwrap().len(), 16);

        let cfg = EncryptionConfig {
            default_key: Some(STANDARD.encode([1u8; 32])),
            generate_key_on_startup: true,
            ..EncryptionConfig::default()
        };
        let store = KeyStore::new();
        populate(&cfg, &store).unwrap();
        assert_eq!(store.get("default").unwrap().as_bytes(), &[1u8; 32]);
    }

    #[test]
    fn rejects_undecodable_key() {
        let cfg = EncryptionConfig {
            default_key: Some("%%%".into()),
            ..EncryptionConfig::default()
        };
        assert!(populate(&cfg, &KeyStore::new()).is_err());
    }
}
