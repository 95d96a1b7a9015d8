//! The per-family strategy contract and the checks every strategy shares.

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use common::{Algorithm, CryptoError};

/// One algorithm family's encrypt/decrypt implementation.
///
/// Strategies are stateless apart from the algorithm they were built for and
/// are shared between threads behind an `Arc`.
#[cfg_attr(test, mockall::automock)]
pub trait EncryptionStrategy: Send + Sync {
    /// Whether this strategy implements `algorithm`'s declared transformation.
    fn supports(&self, algorithm: Algorithm) -> bool;

    /// Whether `text` is a token produced by this strategy's family.
    fn is_encrypted(&self, text: &str) -> bool;

    /// Encrypt `plaintext` into a framed token.
    ///
    /// Empty input and input that is already a token of this family are
    /// returned unchanged. Every other call draws a fresh nonce/IV.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::UnsupportedAlgorithm`] if `algorithm` is not this strategy's.
    /// - [`CryptoError::InvalidKey`] if `key` does not match the declared key size.
    /// - [`CryptoError::Cipher`] if the primitive fails.
    fn encrypt(&self, plaintext: &str, key: &[u8], algorithm: Algorithm) -> Result<String, CryptoError>;

    /// Decrypt a framed token back to text.
    ///
    /// Empty input and input that is not a token of this family are returned
    /// unchanged.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::UnsupportedAlgorithm`] / [`CryptoError::InvalidKey`] as for `encrypt`.
    /// - [`CryptoError::Decrypt`] if the token does not unframe or fails
    ///   verification, padding or UTF-8 decoding.
    fn decrypt(&self, token: &str, key: &[u8], algorithm: Algorithm) -> Result<String, CryptoError>;
}

/// Reject `algorithm` unless `supported` is true.
pub(crate) fn ensure_supported(supported: bool, algorithm: Algorithm) -> Result<(), CryptoError> {
    if supported {
        Ok(())
    } else {
        Err(CryptoError::UnsupportedAlgorithm(algorithm.name().to_owned()))
    }
}

/// Reject a key whose length does not match `algorithm`'s declared size.
pub(crate) fn check_key(key: &[u8], algorithm: Algorithm) -> Result<(), CryptoError> {
    if key.len() != algorithm.key_len() {
        return Err(CryptoError::InvalidKey(format!(
            "{algorithm} requires a {}-bit key, got {} bits",
            algorithm.key_size_bits(),
            key.len() * 8
        )));
    }
    Ok(())
}

/// Fill a fresh buffer from the OS CSPRNG.
pub(crate) fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    OsRng.fill_bytes(&mut buf);
    buf
}
