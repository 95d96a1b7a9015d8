//! Contract between the engine and the persistence layer that calls it.
//!
//! The interception layer decides which fields to pass through these calls
//! and which key identity each one uses; the engine knows nothing about
//! records or fields.

use crate::error::CryptoError;

/// Canonical key identity used when a field does not name one.
pub const DEFAULT_KEY_ID: &str = "default";

/// String-in, string-out field encryption as seen by a persistence layer.
///
/// Implementations must be safe to share between threads.
pub trait FieldCipher: Send + Sync {
    /// Encrypt `text` under `key_id` with the configured default algorithm.
    ///
    /// Empty input and text that is already a token come back unchanged.
    fn encrypt(&self, text: &str, key_id: &str) -> Result<String, CryptoError>;

    /// Decrypt `text` under `key_id` with the configured default algorithm.
    ///
    /// Text that is not a token comes back unchanged.
    fn decrypt(&self, text: &str, key_id: &str) -> Result<String, CryptoError>;

    /// Whether `text` carries any known token prefix.
    fn is_encrypted(&self, text: &str) -> bool;

    /// Key identity used when a caller does not specify one.
    fn default_key_id(&self) -> &str {
        DEFAULT_KEY_ID
    }
}
