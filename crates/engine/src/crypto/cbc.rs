//! Non-authenticated block encryption: AES-256-CBC and SM4-CBC, PKCS#7 padded.
//!
//! CBC tokens carry no authentication tag. A modified token either fails
//! padding or decrypts to altered text, so prefer the GCM selectors for new
//! data; these exist for compatibility with stored values.

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use common::{algorithm::CBC_IV_LEN, Algorithm, CryptoError};
use sm4::Sm4;

use super::framing::CipherToken;
use super::strategy::{check_key, ensure_supported, random_bytes, EncryptionStrategy};

/// CBC strategy bound to one non-authenticated [`Algorithm`].
#[derive(Debug, Clone, Copy)]
pub struct CbcStrategy {
    algorithm: Algorithm,
}

impl CbcStrategy {
    /// AES-256-CBC.
    pub fn aes() -> Self {
        Self {
            algorithm: Algorithm::AesCbc,
        }
    }

    /// SM4-CBC.
    pub fn sm4() -> Self {
        Self {
            algorithm: Algorithm::Sm4Cbc,
        }
    }

    /// Build a CBC strategy for `algorithm`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::UnsupportedAlgorithm`] for an authenticated selector.
    pub fn new(algorithm: Algorithm) -> Result<Self, CryptoError> {
        ensure_supported(!algorithm.is_authenticated(), algorithm)?;
        Ok(Self { algorithm })
    }

    fn seal(&self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self.algorithm {
            Algorithm::AesCbc => seal_with::<cbc::Encryptor<Aes256>>(key, iv, plaintext),
            Algorithm::Sm4Cbc => seal_with::<cbc::Encryptor<Sm4>>(key, iv, plaintext),
            other => Err(CryptoError::UnsupportedAlgorithm(other.name().to_owned())),
        }
    }

    fn open(&self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        // Whole blocks only; anything else cannot have come from this layout.
        if ciphertext.is_empty() || ciphertext.len() % CBC_IV_LEN != 0 {
            return Err(CryptoError::Integrity);
        }
        match self.algorithm {
            Algorithm::AesCbc => open_with::<cbc::Decryptor<Aes256>>(key, iv, ciphertext),
            Algorithm::Sm4Cbc => open_with::<cbc::Decryptor<Sm4>>(key, iv, ciphertext),
            other => Err(CryptoError::UnsupportedAlgorithm(other.name().to_owned())),
        }
    }
}

impl EncryptionStrategy for CbcStrategy {
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

        let iv = random_bytes(algorithm.nonce_len());
        let ciphertext = self.seal(key, &iv, plaintext.as_bytes())?;
        Ok(CipherToken::new(algorithm, iv, ciphertext)?.encode())
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

fn seal_with<C: KeyIvInit + BlockEncryptMut>(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = C::new_from_slices(key, iv).map_err(|_| CryptoError::InvalidKey("key length rejected by cipher".into()))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

fn open_with<C: KeyIvInit + BlockDecryptMut>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = C::new_from_slices(key, iv).map_err(|_| CryptoError::InvalidKey("key length rejected by cipher".into()))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::Integrity)
}
