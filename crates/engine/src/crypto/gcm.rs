//! Authenticated encryption: AES-256-GCM and SM4-GCM.
//!
//! A random 96-bit nonce is generated per call via the OS CSPRNG. GCM nonce
//! reuse under one key breaks both confidentiality and authentication, so a
//! nonce is never derived from the input.

use aes_gcm::{
    aead::{consts::U12, generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm, AesGcm,
};
use common::{Algorithm, CryptoError};
use sm4::Sm4;

use super::framing::CipherToken;
use super::strategy::{check_key, ensure_supported, random_bytes, EncryptionStrategy};

/// SM4 in GCM mode with a 96-bit nonce and 128-bit tag.
type Sm4Gcm = AesGcm<Sm4, U12>;

/// GCM strategy bound to one authenticated [`Algorithm`].
#[derive(Debug, Clone, Copy)]
pub struct GcmStrategy {
    algorithm: Algorithm,
}

impl GcmStrategy {
    /// AES-256-GCM.
    pub fn aes() -> Self {
        Self {
            algorithm: Algorithm::AesGcm,
        }
    }

    /// SM4-GCM.
    pub fn sm4() -> Self {
        Self {
            algorithm: Algorithm::Sm4Gcm,
        }
    }

    /// Build a GCM strategy for `algorithm`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::UnsupportedAlgorithm`] for a non-authenticated selector.
    pub fn new(algorithm: Algorithm) -> Result<Self, CryptoError> {
        ensure_supported(algorithm.is_authenticated(), algorithm)?;
        Ok(Self { algorithm })
    }

    fn seal(&self, key: &[u8], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self.algorithm {
            Algorithm::AesGcm => seal_with::<Aes256Gcm>(key, nonce, plaintext),
            Algorithm::Sm4Gcm => seal_with::<Sm4Gcm>(key, nonce, plaintext),
            other => Err(CryptoError::UnsupportedAlgorithm(other.name().to_owned())),
        }
    }

    fn open(&self, key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self.algorithm {
            Algorithm::AesGcm => open_with::<Aes256Gcm>(key, nonce, ciphertext),
            Algorithm::Sm4Gcm => open_with::<Sm4Gcm>(key, nonce, ciphertext),
            other => Err(CryptoError::UnsupportedAlgorithm(other.name().to_owned())),
        }
    }
}

impl EncryptionStrategy for GcmStrategy {
    fn supports(&self, algorithm: Algorithm) -> bool {
        algorithm == self.algorithm
    }

    fn is_encrypted(&self, text: &str) -> bool {
        text.starts_with(self.algorithm.token_prefix())
    }

    fn encrypt(&self, plaintext: &str, key: &[u8], algorithm: Algorithm) -> Result<String, CryptoError> {
        if plaintext.is_empty() || self.is_encrypted(plaintext) {
            return Ok(plaintext.to_owned());
        }
        ensure_supported(self.supports(algorithm), algorithm)?;
        check_key(key, algorithm)?;

        let nonce = random_bytes(algorithm.nonce_len());
        let ciphertext = self.seal(key, &nonce, plaintext.as_bytes())?;
        Ok(CipherToken::new(algorithm, nonce, ciphertext)?.encode())
    }

    fn decrypt(&self, token: &str, key: &[u8], algorithm: Algorithm) -> Result<String, CryptoError> {
        if token.is_empty() || !self.is_encrypted(token) {
            return Ok(token.to_owned());
        }
        ensure_supported(self.supports(algorithm), algorithm)?;
        check_key(key, algorithm)?;

        let parsed = CipherToken::parse_as(token, algorithm).map_err(CryptoError::into_decrypt)?;
        let plaintext = self
            .open(key, &parsed.nonce, &parsed.ciphertext)
            .map_err(CryptoError::into_decrypt)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::Integrity.into_decrypt())
    }
}

fn seal_with<C: KeyInit + Aead>(key: &[u8], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = C::new_from_slice(key).map_err(|_| CryptoError::InvalidKey("key length rejected by cipher".into()))?;
    cipher
        .encrypt(GenericArray::from_slice(nonce), plaintext)
        .map_err(|_| CryptoError::Cipher)
}

fn open_with<C: KeyInit + Aead>(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = C::new_from_slice(key).map_err(|_| CryptoError::InvalidKey("key length rejected by cipher".into()))?;
    cipher
        .decrypt(GenericArray::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Integrity)
}
