//! Self-describing ciphertext tokens.
//!
//! ```text
//! ENC(<TAG>):<base64(nonce || ciphertext [|| auth tag])>
//! ```
//!
//! The tag selects the layout: GCM tokens carry a 12-byte nonce and end with
//! the 16-byte authentication tag, CBC tokens carry a 16-byte IV and no tag.
//! Base64 is the standard padded alphabet so that tokens written by earlier
//! deployments keep decoding.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{Algorithm, CryptoError};

/// A parsed ciphertext token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherToken {
    /// Algorithm named by the token prefix.
    pub algorithm: Algorithm,
    /// Raw nonce (GCM) or IV (CBC) bytes.
    pub nonce: Vec<u8>,
    /// Raw ciphertext bytes; for GCM this includes the trailing tag.
    pub ciphertext: Vec<u8>,
}

impl CipherToken {
    /// Assemble a token from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MalformedCiphertext`] if `nonce` does not have
    /// the length the algorithm's layout requires.
    pub fn new(algorithm: Algorithm, nonce: Vec<u8>, ciphertext: Vec<u8>) -> Result<Self, CryptoError> {
        if nonce.len() != algorithm.nonce_len() {
            return Err(CryptoError::MalformedCiphertext);
        }
        Ok(Self {
            algorithm,
            nonce,
            ciphertext,
        })
    }

    /// Encode to the persisted text form.
    pub fn encode(&self) -> String {
        let mut framed = Vec::with_capacity(self.nonce.len() + self.ciphertext.len());
        framed.extend_from_slice(&self.nonce);
        framed.extend_from_slice(&self.ciphertext);
        format!("{}{}", self.algorithm.token_prefix(), STANDARD.encode(framed))
    }

    /// Parse a token, taking the layout from its prefix.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MalformedCiphertext`] if the prefix is unknown,
    /// the body is not valid base64, or the decoded bytes are shorter than
    /// the nonce/IV prefix.
    pub fn parse(text: &str) -> Result<Self, CryptoError> {
        let algorithm = Algorithm::from_token(text).ok_or(CryptoError::MalformedCiphertext)?;
        Self::parse_as(text, algorithm)
    }

    /// Parse a token that must carry `algorithm`'s prefix.
    ///
    /// # Errors
    ///
    /// Same as [`CipherToken::parse`], plus a prefix belonging to any other
    /// algorithm is rejected.
    pub fn parse_as(text: &str, algorithm: Algorithm) -> Result<Self, CryptoError> {
        let body = text
            .strip_prefix(algorithm.token_prefix())
            .ok_or(CryptoError::MalformedCiphertext)?;
        let mut framed = STANDARD
            .decode(body.trim())
            .map_err(|_| CryptoError::MalformedCiphertext)?;

        let nonce_len = algorithm.nonce_len();
        if framed.len() < nonce_len {
            return Err(CryptoError::MalformedCiphertext);
        }
        let ciphertext = framed.split_off(nonce_len);
        Ok(Self {
            algorithm,
            nonce: framed,
            ciphertext,
        })
    }
}
