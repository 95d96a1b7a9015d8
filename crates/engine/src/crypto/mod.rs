//! Cipher strategies, token framing, and algorithm dispatch.
//!
//! This module is free of key storage and caching concerns; strategies
//! receive key bytes from the caller and never retain them.
//!
//! # Token format
//!
//! ```text
//! ENC(<TAG>):<base64(nonce_or_iv || ciphertext [|| auth_tag])>
//! ```
//!
//! | Tag       | Layout                        |
//! |-----------|-------------------------------|
//! | `AES-GCM` | 12-byte nonce, 16-byte tag    |
//! | `SM4-GCM` | 12-byte nonce, 16-byte tag    |
//! | `AES-CBC` | 16-byte IV, PKCS#7, no tag    |
//! | `SM4-CBC` | 16-byte IV, PKCS#7, no tag    |

pub mod cbc;
pub mod framing;
pub mod gcm;
pub mod registry;
pub mod strategy;

pub use self::cbc::CbcStrategy;
pub use framing::CipherToken;
pub use gcm::GcmStrategy;
pub use registry::StrategyRegistry;
pub use strategy::EncryptionStrategy;

#[cfg(test)]
pub use strategy::MockEncryptionStrategy;
