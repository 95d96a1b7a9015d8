//! Shared types for `fieldcrypt` crates: algorithm selectors, the error
//! taxonomy, and the collaborator contract.

pub mod algorithm;
pub mod error;
pub mod protocol;

pub use algorithm::{Algorithm, CipherFamily};
pub use error::CryptoError;
pub use protocol::{FieldCipher, DEFAULT_KEY_ID};
