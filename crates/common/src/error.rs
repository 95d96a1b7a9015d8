//! Error taxonomy shared by the engine and its collaborators.

use thiserror::Error;

/// Errors produced by key resolution, strategy dispatch, and the cipher layer.
///
/// The manager surfaces every failure of an operation wrapped in
/// [`CryptoError::Encrypt`] or [`CryptoError::Decrypt`]; use
/// [`CryptoError::root_cause`] to branch on the underlying kind.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The key is absent or its length does not match the algorithm.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// No strategy is registered for the requested algorithm.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The token does not unframe: unknown tag, bad base64, or too short.
    #[error("malformed ciphertext")]
    MalformedCiphertext,

    /// The cipher rejected the input.
    ///
    /// Covers authentication tag mismatch, invalid padding and non-UTF-8
    /// output alike; the message never says which.
    #[error("ciphertext could not be decrypted")]
    Integrity,

    /// The cipher primitive failed while encrypting.
    #[error("cipher operation failed")]
    Cipher,

    /// An encryption call failed.
    #[error("encryption failed: {source}")]
    Encrypt {
        /// Underlying cause.
        #[source]
        source: Box<CryptoError>,
    },

    /// A decryption call failed.
    #[error("decryption failed: {source}")]
    Decrypt {
        /// Underlying cause.
        #[source]
        source: Box<CryptoError>,
    },
}

impl CryptoError {
    /// Wrap `self` as an encryption failure, unless it already is one.
    pub fn into_encrypt(self) -> Self {
        match self {
            CryptoError::Encrypt { .. } => self,
            other => CryptoError::Encrypt {
                source: Box::new(other),
            },
        }
    }

    /// Wrap `self` as a decryption failure, unless it already is one.
    pub fn into_decrypt(self) -> Self {
        match self {
            CryptoError::Decrypt { .. } => self,
            other => CryptoError::Decrypt {
                source: Box::new(other),
            },
        }
    }

    /// The innermost error beneath any `Encrypt`/`Decrypt` wrappers.
    pub fn root_cause(&self) -> &CryptoError {
        match self {
            CryptoError::Encrypt { source } | CryptoError::Decrypt { source } => {
                source.root_cause()
            }
            other => other,
        }
    }

    /// Returns `true` for failures caused by configuration rather than input.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.root_cause(),
            CryptoError::InvalidKey(_) | CryptoError::UnsupportedAlgorithm(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapping_is_not_nested_twice() {
        let e = CryptoError::MalformedCiphertext.into_decrypt().into_decrypt();
        match &e {
            CryptoError::Decrypt { source } => {
                assert!(matches!(**source, CryptoError::MalformedCiphertext));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn root_cause_unwraps_wrappers() {
        let e = CryptoError::InvalidKey("no key registered for `x`".into()).into_encrypt();
        assert!(matches!(e.root_cause(), CryptoError::InvalidKey(_)));
        assert!(e.is_configuration());
        assert!(!CryptoError::Integrity.into_decrypt().is_configuration());
    }

    #[test]
    fn display_includes_cause() {
        let e = CryptoError::UnsupportedAlgorithm("DES".into()).into_encrypt();
        let msg = e.to_string();
        assert!(msg.starts_with("encryption failed"));
        assert!(msg.contains("DES"));
    }

    #[test]
    fn integrity_message_is_opaque() {
        let msg = CryptoError::Integrity.into_decrypt().to_string();
        assert!(!msg.contains("tag"));
        assert!(!msg.contains("padding"));
    }
}
