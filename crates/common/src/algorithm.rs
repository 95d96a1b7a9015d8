//! Algorithm selectors and the framing properties each one implies.
//!
//! Every [`Algorithm`] owns a literal token tag (`ENC(AES-GCM):` and friends).
//! The tag alone identifies the cipher family and the framing layout, so a
//! stored token can be classified without knowing which key produced it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// Nonce length for the authenticated (GCM) layout: 96 bits.
pub const GCM_NONCE_LEN: usize = 12;

/// Authentication tag length appended by the GCM primitive: 128 bits.
pub const GCM_TAG_LEN: usize = 16;

/// IV length for the CBC layout: one 128-bit block.
pub const CBC_IV_LEN: usize = 16;

/// Underlying block cipher of an [`Algorithm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CipherFamily {
    /// AES (FIPS-197).
    Aes,
    /// SM4 (GB/T 32907-2016).
    Sm4,
}

impl CipherFamily {
    /// Canonical cipher name, e.g. `"AES"`.
    pub fn name(self) -> &'static str {
        match self {
            CipherFamily::Aes => "AES",
            CipherFamily::Sm4 => "SM4",
        }
    }
}

impl fmt::Display for CipherFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CipherFamily {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AES" => Ok(CipherFamily::Aes),
            "SM4" => Ok(CipherFamily::Sm4),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_owned())),
        }
    }
}

/// Closed set of supported field encryption algorithms.
///
/// Deserialises from the configuration spelling (`AES_GCM`) as well as the
/// token tag spelling (`AES-GCM`), case-insensitively via [`FromStr`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    /// AES-256 in GCM mode. Authenticated; the default.
    #[default]
    #[serde(alias = "AES-GCM", alias = "aes-gcm", alias = "aes_gcm")]
    AesGcm,
    /// AES-256 in CBC mode with PKCS#7 padding.
    #[serde(alias = "AES-CBC", alias = "aes-cbc", alias = "aes_cbc")]
    AesCbc,
    /// SM4 in CBC mode with PKCS#7 padding.
    #[serde(alias = "SM4-CBC", alias = "sm4-cbc", alias = "sm4_cbc")]
    Sm4Cbc,
    /// SM4 in GCM mode. Authenticated.
    #[serde(alias = "SM4-GCM", alias = "sm4-gcm", alias = "sm4_gcm")]
    Sm4Gcm,
}

impl Algorithm {
    /// All selectors, in registration order.
    pub const ALL: [Algorithm; 4] = [
        Algorithm::AesGcm,
        Algorithm::AesCbc,
        Algorithm::Sm4Cbc,
        Algorithm::Sm4Gcm,
    ];

    /// Declared cipher transformation, e.g. `"AES/GCM/NoPadding"`.
    pub fn transformation(self) -> &'static str {
        match self {
            Algorithm::AesGcm => "AES/GCM/NoPadding",
            Algorithm::AesCbc => "AES/CBC/PKCS5Padding",
            Algorithm::Sm4Cbc => "SM4/CBC/PKCS5Padding",
            Algorithm::Sm4Gcm => "SM4/GCM/NoPadding",
        }
    }

    /// Underlying block cipher.
    pub fn family(self) -> CipherFamily {
        match self {
            Algorithm::AesGcm | Algorithm::AesCbc => CipherFamily::Aes,
            Algorithm::Sm4Cbc | Algorithm::Sm4Gcm => CipherFamily::Sm4,
        }
    }

    /// Declared key size in bits.
    pub fn key_size_bits(self) -> usize {
        match self.family() {
            CipherFamily::Aes => 256,
            CipherFamily::Sm4 => 128,
        }
    }

    /// Declared key size in bytes.
    pub fn key_len(self) -> usize {
        self.key_size_bits() / 8
    }

    /// Whether the mode authenticates its ciphertext (GCM).
    pub fn is_authenticated(self) -> bool {
        matches!(self, Algorithm::AesGcm | Algorithm::Sm4Gcm)
    }

    /// Length of the nonce/IV prefix in a framed token.
    pub fn nonce_len(self) -> usize {
        if self.is_authenticated() {
            GCM_NONCE_LEN
        } else {
            CBC_IV_LEN
        }
    }

    /// Short tag used inside the token prefix, e.g. `"AES-GCM"`.
    pub fn tag(self) -> &'static str {
        match self {
            Algorithm::AesGcm => "AES-GCM",
            Algorithm::AesCbc => "AES-CBC",
            Algorithm::Sm4Cbc => "SM4-CBC",
            Algorithm::Sm4Gcm => "SM4-GCM",
        }
    }

    /// Full literal prefix of every token this algorithm produces.
    pub fn token_prefix(self) -> &'static str {
        match self {
            Algorithm::AesGcm => "ENC(AES-GCM):",
            Algorithm::AesCbc => "ENC(AES-CBC):",
            Algorithm::Sm4Cbc => "ENC(SM4-CBC):",
            Algorithm::Sm4Gcm => "ENC(SM4-GCM):",
        }
    }

    /// Classify `text` by its token prefix.
    ///
    /// Returns `None` for anything that does not start with a known prefix.
    pub fn from_token(text: &str) -> Option<Algorithm> {
        Algorithm::ALL
            .into_iter()
            .find(|alg| text.starts_with(alg.token_prefix()))
    }

    /// Configuration spelling, e.g. `"AES_GCM"`.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::AesGcm => "AES_GCM",
            Algorithm::AesCbc => "AES_CBC",
            Algorithm::Sm4Cbc => "SM4_CBC",
            Algorithm::Sm4Gcm => "SM4_GCM",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_ascii_uppercase().replace('-', "_");
        Algorithm::ALL
            .into_iter()
            .find(|alg| alg.name() == normalised)
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm(s.to_owned()))
    }
}
