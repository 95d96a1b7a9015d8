//! Transparent field-level encryption.
//!
//! [`EncryptionManager`] turns plaintext strings into self-describing tokens
//! (`ENC(<ALGO>):<base64>`) and back, under named keys held in memory. It is
//! synchronous, `Send + Sync`, and meant to be shared behind an `Arc` by the
//! persistence layer. [`FieldSet`] wires it to the sensitive fields of a
//! record type.
//!
//! # Logging
//!
//! Events go through `tracing`; installing a subscriber is the host's job.
//! No event ever carries plaintext, ciphertext or key bytes. Per-call
//! `debug` events (enabled by `log_enabled`) carry the key id, algorithm and
//! input length only.

pub mod cache;
pub mod config;
pub mod crypto;
pub mod fields;
pub mod keys;
pub mod manager;

pub use common::{Algorithm, CipherFamily, CryptoError, FieldCipher, DEFAULT_KEY_ID};
pub use config::{EncryptionConfig, KeyConfig};
pub use fields::{DecryptOutcome, FieldBinding, FieldSet};
pub use manager::EncryptionManager;
