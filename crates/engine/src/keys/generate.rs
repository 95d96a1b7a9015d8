//! Random key generation for provisioning new key identities.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{Algorithm, CipherFamily, CryptoError};

use super::store::RawKey;
use crate::crypto::strategy::random_bytes;

/// Key sizes (bits) each cipher family accepts.
pub fn supported_bits(family: CipherFamily) -> &'static [usize] {
    match family {
        CipherFamily::Aes => &[128, 192, 256],
        CipherFamily::Sm4 => &[128],
    }
}

/// Generate a key of `algorithm`'s declared size.
pub fn generate_key(algorithm: Algorithm) -> RawKey {
    RawKey::new(random_bytes(algorithm.key_len()))
}

/// Generate a key of `bits` for `family`.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKey`] if `family` does not accept `bits`.
pub fn generate_key_bits(family: CipherFamily, bits: usize) -> Result<RawKey, CryptoError> {
    if !supported_bits(family).contains(&bits) {
        return Err(CryptoError::InvalidKey(format!(
            "{family} does not support {bits}-bit keys (supported: {:?})",
            supported_bits(family)
        )));
    }
    Ok(RawKey::new(random_bytes(bits / 8)))
}

/// Generate a key of `algorithm`'s declared size, base64-encoded.
pub fn generate_base64_key(algorithm: Algorithm) -> String {
    STANDARD.encode(generate_key(algorithm).as_bytes())
}

/// Generate a key of `bits` for `family`, base64-encoded.
///
/// # Errors
///
/// Same as [`generate_key_bits`].
pub fn generate_base64_key_bits(family: CipherFamily, bits: usize) -> Result<String, CryptoError> {
    Ok(STANDARD.encode(generate_key_bits(family, bits)?.as_bytes()))
}
