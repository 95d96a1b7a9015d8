//! Explicit field registration for persistence layers.
//!
//! A [`FieldSet`] lists which string fields of a record type are sensitive
//! and which key identity protects each. Callers run
//! [`FieldSet::encrypt_fields`] before a write and
//! [`FieldSet::decrypt_fields`] after a read.

use std::fmt;

use common::{CryptoError, FieldCipher};
use tracing::warn;

/// Accessor from a record to one of its optional string fields.
pub type FieldAccessor<T> = fn(&mut T) -> &mut Option<String>;

/// One sensitive field.
pub struct FieldBinding<T> {
    name: &'static str,
    key_id: String,
    accessor: FieldAccessor<T>,
}

impl<T> FieldBinding<T> {
    /// Field name, used only in log events.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Key identity protecting this field.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

impl<T> Clone for FieldBinding<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            key_id: self.key_id.clone(),
            accessor: self.accessor,
        }
    }
}

impl<T> fmt::Debug for FieldBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("name", &self.name)
            .field("key_id", &self.key_id)
            .finish()
    }
}

/// Result of a lenient decrypt pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecryptOutcome {
    /// Fields replaced with their plaintext.
    pub decrypted: usize,
    /// Fields left as stored because decryption failed.
    pub failed: usize,
}

impl DecryptOutcome {
    /// Returns `true` if every encrypted field was recovered.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    fn merge(&mut self, other: DecryptOutcome) {
        self.decrypted += other.decrypted;
        self.failed += other.failed;
    }
}

/// The sensitive fields of record type `T`.
pub struct FieldSet<T> {
    bindings: Vec<FieldBinding<T>>,
}

impl<T> Default for FieldSet<T> {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }
}

impl<T> Clone for FieldSet<T> {
    fn clone(&self) -> Self {
        Self {
            bindings: self.bindings.clone(),
        }
    }
}

impl<T> fmt::Debug for FieldSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.bindings).finish()
    }
}

impl<T> FieldSet<T> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` under `key_id`.
    pub fn field(mut self, name: &'static str, key_id: impl Into<String>, accessor: FieldAccessor<T>) -> Self {
        self.bindings.push(FieldBinding {
            name,
            key_id: key_id.into(),
            accessor,
        });
        self
    }

    /// Register `name` under the `"default"` key identity.
    pub fn default_field(self, name: &'static str, accessor: FieldAccessor<T>) -> Self {
        self.field(name, common::DEFAULT_KEY_ID, accessor)
    }

    /// Registered bindings, in registration order.
    pub fn bindings(&self) -> &[FieldBinding<T>] {
        &self.bindings
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if no field is registered.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Encrypt every bound field that holds a value not already encrypted.
    ///
    /// Returns the number of fields changed.
    ///
    /// # Errors
    ///
    /// Stops at the first failure and returns it. Fields encrypted before the
    /// failure keep their new value.
    pub fn encrypt_fields<C>(&self, cipher: &C, record: &mut T) -> Result<usize, CryptoError>
    where
        C: FieldCipher + ?Sized,
    {
        let mut changed = 0;
        for binding in &self.bindings {
            let slot = (binding.accessor)(record);
            let Some(value) = slot.as_deref() else {
                continue;
            };
            if value.trim().is_empty() || cipher.is_encrypted(value) {
                continue;
            }
            let token = cipher.encrypt(value, &binding.key_id)?;
            *slot = Some(token);
            changed += 1;
        }
        Ok(changed)
    }

    /// Decrypt every bound field holding an encrypted value.
    ///
    /// A field that fails to decrypt, or comes back still encrypted (a token
    /// the cipher's default algorithm does not handle), keeps its stored
    /// value and is counted in [`DecryptOutcome::failed`].
    pub fn decrypt_fields<C>(&self, cipher: &C, record: &mut T) -> DecryptOutcome
    where
        C: FieldCipher + ?Sized,
    {
        let mut outcome = DecryptOutcome::default();
        for binding in &self.bindings {
            let slot = (binding.accessor)(record);
            let Some(value) = slot.as_deref() else {
                continue;
            };
            if !cipher.is_encrypted(value) {
                continue;
            }
            match cipher.decrypt(value, &binding.key_id) {
                Ok(plaintext) if plaintext != value && !cipher.is_encrypted(&plaintext) => {
                    *slot = Some(plaintext);
                    outcome.decrypted += 1;
                }
                Ok(_) => {
                    warn!(
                        field = binding.name,
                        key_id = %binding.key_id,
                        "field still encrypted after decryption; keeping stored value"
                    );
                    outcome.failed += 1;
                }
                Err(e) => {
                    warn!(
                        field = binding.name,
                        key_id = %binding.key_id,
                        error = %e.root_cause(),
                        "field decryption failed; keeping stored value"
                    );
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }

    /// [`encrypt_fields`](Self::encrypt_fields) over a batch.
    ///
    /// # Errors
    ///
    /// Stops at the first failing record.
    pub fn encrypt_all<C>(&self, cipher: &C, records: &mut [T]) -> Result<usize, CryptoError>
    where
        C: FieldCipher + ?Sized,
    {
        let mut changed = 0;
        for record in records.iter_mut() {
            changed += self.encrypt_fields(cipher, record)?;
        }
        Ok(changed)
    }

    /// [`decrypt_fields`](Self::decrypt_fields) over a batch.
    pub fn decrypt_all<C>(&self, cipher: &C, records: &mut [T]) -> DecryptOutcome
    where
        C: FieldCipher + ?Sized,
    {
        let mut outcome = DecryptOutcome::default();
        for record in records.iter_mut() {
            outcome.merge(self.decrypt_fields(cipher, record));
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use common::Algorithm;
    use mockall::predicate::eq;

    use super::*;
    use crate::config::{EncryptionConfig, KeyConfig};
    use crate::manager::EncryptionManager;

    mockall::mock! {
        Cipher {}
        impl FieldCipher for Cipher {
            fn encrypt(&self, text: &str, key_id: &str) -> Result<String, CryptoError>;
            fn decrypt(&self, text: &str, key_id: &str) -> Result<String, CryptoError>;
            fn is_encrypted(&self, text: &str) -> bool;
        }
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Customer {
        name: Option<String>,
        phone: Option<String>,
        id_card: Option<String>,
        note: Option<String>,
    }

    fn customer_fields() -> FieldSet<Customer> {
        FieldSet::<Customer>::new()
            .default_field("name", |c| &mut c.name)
            .field("phone", "phone", |c| &mut c.phone)
            .field("id_card", "sm4", |c| &mut c.id_card)
    }

    fn manager() -> EncryptionManager {
        EncryptionManager::new(&EncryptionConfig {
            default_key: Some(STANDARD.encode([7u8; 32])),
            keys: vec![
                KeyConfig {
                    id: "phone".into(),
                    value: STANDARD.encode([8u8; 32]),
                    algorithm: Algorithm::AesGcm,
                    description: None,
                },
                KeyConfig {
                    id: "sm4".into(),
                    value: STANDARD.encode([9u8; 16]),
                    algorithm: Algorithm::Sm4Gcm,
                    description: None,
                },
            ],
            ..EncryptionConfig::default()
        })
        .unwrap()
    }

    fn sample() -> Customer {
        Customer {
            name: Some("Alice".into()),
            phone: Some("13800000000".into()),
            id_card: None,
            note: Some("not sensitive".into()),
        }
    }

    #[test]
    fn builder_records_bindings() {
        let fields = customer_fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields.bindings()[0].key_id(), "default");
        assert_eq!(fields.bindings()[1].name(), "phone");
        assert!(FieldSet::<Customer>::new().is_empty());
    }

    #[test]
    fn round_trip_through_manager() {
        let mgr = manager();
        let fields = customer_fields();
        let mut record = sample();

        assert_eq!(fields.encrypt_fields(&mgr, &mut record).unwrap(), 2);
        assert!(mgr.is_encrypted(record.name.as_deref().unwrap()));
        assert!(mgr.is_encrypted(record.phone.as_deref().unwrap()));
        assert!(record.id_card.is_none());
        assert_eq!(record.note.as_deref(), Some("not sensitive"));

        // Second pass leaves tokens alone.
        assert_eq!(fields.encrypt_fields(&mgr, &mut record).unwrap(), 0);

        let outcome = fields.decrypt_fields(&mgr, &mut record);
        assert_eq!(outcome, DecryptOutcome { decrypted: 2, failed: 0 });
        assert_eq!(record, sample());
    }

    #[test]
    fn fields_use_their_own_keys() {
        let mgr = manager();
        let fields = customer_fields();
        let mut record = sample();
        fields.encrypt_fields(&mgr, &mut record).unwrap();

        let phone = record.phone.clone().unwrap();
        assert!(mgr.decrypt(&phone, "default").is_err());
        assert_eq!(mgr.decrypt(&phone, "phone").unwrap(), "13800000000");
    }

    #[test]
    fn decrypt_failure_keeps_stored_value() {
        let mgr = manager();
        let fields = customer_fields();
        let mut record = sample();
        fields.encrypt_fields(&mgr, &mut record).unwrap();

        let corrupted = "ENC(AES-GCM):AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".to_owned();
        record.phone = Some(corrupted.clone());

        let outcome = fields.decrypt_fields(&mgr, &mut record);
        assert_eq!(outcome, DecryptOutcome { decrypted: 1, failed: 1 });
        assert!(!outcome.is_clean());
        assert_eq!(record.name.as_deref(), Some("Alice"));
        assert_eq!(record.phone, Some(corrupted));
    }

    #[test]
    fn foreign_family_token_is_reported_not_recovered() {
        let mgr = manager();
        let fields = customer_fields();
        let cbc = mgr.encrypt_with("13800000000", "phone", Algorithm::AesCbc).unwrap();
        let mut record = Customer {
            phone: Some(cbc.clone()),
            ..sample()
        };
        fields.encrypt_fields(&mgr, &mut record).unwrap();

        let outcome = fields.decrypt_fields(&mgr, &mut record);
        assert_eq!(outcome, DecryptOutcome { decrypted: 1, failed: 1 });
        assert!(!outcome.is_clean());
        assert_eq!(record.name.as_deref(), Some("Alice"));
        assert_eq!(record.phone, Some(cbc));
    }

    #[test]
    fn encrypt_failure_is_fatal() {
        let mut cipher = MockCipher::new();
        cipher.expect_is_encrypted().returning(|_| false);
        cipher
            .expect_encrypt()
            .with(eq("Alice"), eq("default"))
            .times(1)
            .returning(|_, _| Err(CryptoError::InvalidKey("missing".into()).into_encrypt()));

        let mut record = sample();
        let err = customer_fields().encrypt_fields(&cipher, &mut record).unwrap_err();
        assert!(matches!(err.root_cause(), CryptoError::InvalidKey(_)));
        assert_eq!(record, sample());
    }

    #[test]
    fn skips_blank_and_unset_fields() {
        let mut cipher = MockCipher::new();
        cipher.expect_is_encrypted().returning(|_| false);
        cipher.expect_encrypt().never();
        cipher.expect_decrypt().never();

        let mut record = Customer {
            name: Some("   ".into()),
            ..Customer::default()
        };
        let fields = customer_fields();
        assert_eq!(fields.encrypt_fields(&cipher, &mut record).unwrap(), 0);
        assert_eq!(fields.decrypt_fields(&cipher, &mut record), DecryptOutcome::default());
    }

    #[test]
    fn decrypt_only_touches_encrypted_values() {
        let mut cipher = MockCipher::new();
        cipher
            .expect_is_encrypted()
            .returning(|text| text.starts_with("ENC("));
        cipher
            .expect_decrypt()
            .with(eq("ENC(X):1"), eq("phone"))
            .times(1)
            .returning(|_, _| Ok("13800000000".into()));

        let mut record = Customer {
            name: Some("Alice".into()),
            phone: Some("ENC(X):1".into()),
            ..Customer::default()
        };
        let outcome = customer_fields().decrypt_fields(&cipher, &mut record);
        assert_eq!(outcome.decrypted, 1);
        assert_eq!(record.phone.as_deref(), Some("13800000000"));
        assert_eq!(record.name.as_deref(), Some("Alice"));
    }

    #[test]
    fn batches() {
        let mgr = manager();
        let fields = customer_fields();
        let mut records = vec![sample(), sample(), Customer::default()];

        assert_eq!(fields.encrypt_all(&mgr, &mut records).unwrap(), 4);
        let outcome = fields.decrypt_all(&mgr, &mut records);
        assert_eq!(outcome, DecryptOutcome { decrypted: 4, failed: 0 });
        assert_eq!(records, vec![sample(), sample(), Customer::default()]);
    }

    #[test]
    fn works_through_trait_object() {
        let mgr = manager();
        let cipher: &dyn FieldCipher = &mgr;
        let mut record = sample();
        customer_fields().encrypt_fields(cipher, &mut record).unwrap();
        assert!(customer_fields().decrypt_fields(cipher, &mut record).is_clean());
        assert_eq!(record, sample());
    }
}
