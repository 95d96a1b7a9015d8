//! [`StrategyRegistry`]: algorithm selector → strategy instance.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use common::{Algorithm, CryptoError};

use super::cbc::CbcStrategy;
use super::gcm::GcmStrategy;
use super::strategy::EncryptionStrategy;

/// Fixed mapping from every [`Algorithm`] to the strategy implementing it.
///
/// Populated once at construction and read-only afterwards, so lookups need
/// no locking.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<Algorithm, Arc<dyn EncryptionStrategy>>,
}

impl StrategyRegistry {
    /// Create a registry with no strategies.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in wiring: each selector to its own transformation.
    pub fn standard() -> Self {
        let builtin: [(Algorithm, Arc<dyn EncryptionStrategy>); 4] = [
            (Algorithm::AesGcm, Arc::new(GcmStrategy::aes())),
            (Algorithm::AesCbc, Arc::new(CbcStrategy::aes())),
            (Algorithm::Sm4Cbc, Arc::new(CbcStrategy::sm4())),
            (Algorithm::Sm4Gcm, Arc::new(GcmStrategy::sm4())),
        ];
        Self {
            strategies: builtin.into_iter().collect(),
        }
    }

    /// Register `strategy` for `algorithm`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::UnsupportedAlgorithm`] if the strategy does not
    /// implement `algorithm`; a selector is never wired to a foreign strategy.
    pub fn register(
        &mut self,
        algorithm: Algorithm,
        strategy: Arc<dyn EncryptionStrategy>,
    ) -> Result<(), CryptoError> {
        if !strategy.supports(algorithm) {
            return Err(CryptoError::UnsupportedAlgorithm(format!(
                "strategy does not implement {}",
                algorithm.transformation()
            )));
        }
        self.strategies.insert(algorithm, strategy);
        Ok(())
    }

    /// Look up the strategy for `algorithm`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::UnsupportedAlgorithm`] if nothing is registered.
    pub fn get(&self, algorithm: Algorithm) -> Result<Arc<dyn EncryptionStrategy>, CryptoError> {
        self.strategies
            .get(&algorithm)
            .cloned()
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm(algorithm.name().to_owned()))
    }

    /// Whether a strategy is registered for `algorithm`.
    pub fn contains(&self, algorithm: Algorithm) -> bool {
        self.strategies.contains_key(&algorithm)
    }

    /// Number of registered selectors.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut algorithms: Vec<&str> = self.strategies.keys().map(|a| a.name()).collect();
        algorithms.sort_unstable();
        f.debug_struct("StrategyRegistry")
            .field("algorithms", &algorithms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::strategy::MockEncryptionStrategy;

    #[test]
    fn standard_covers_every_selector() {
        let registry = StrategyRegistry::standard();
        assert_eq!(registry.len(), Algorithm::ALL.len());
        for alg in Algorithm::ALL {
            let strategy = registry.get(alg).unwrap();
            assert!(strategy.supports(alg), "{alg} wired to a foreign strategy");
        }
    }

    #[test]
    fn standard_wiring_matches_declared_layout() {
        let registry = StrategyRegistry::standard();
        for alg in Algorithm::ALL {
            let key = vec![0x11u8; alg.key_len()];
            let token = registry.get(alg).unwrap().encrypt("probe", &key, alg).unwrap();
            assert!(token.starts_with(alg.token_prefix()));
            let parsed = crate::crypto::CipherToken::parse(&token).unwrap();
            assert_eq!(parsed.nonce.len(), alg.nonce_len());
        }
    }

    #[test]
    fn no_selector_routes_to_another_family() {
        let registry = StrategyRegistry::standard();
        for alg in Algorithm::ALL {
            let strategy = registry.get(alg).unwrap();
            for other in Algorithm::ALL.into_iter().filter(|o| *o != alg) {
                assert!(!strategy.supports(other));
            }
        }
    }

    #[test]
    fn empty_registry_reports_unsupported() {
        let registry = StrategyRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.get(Algorithm::AesGcm),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn register_rejects_mismatched_strategy() {
        let mut registry = StrategyRegistry::new();
        let err = registry
            .register(Algorithm::AesCbc, Arc::new(GcmStrategy::aes()))
            .unwrap_err();
        assert!(err.to_string().contains("AES/CBC/PKCS5Padding"));
        assert!(!registry.contains(Algorithm::AesCbc));
    }

    #[test]
    fn register_accepts_custom_strategy() {
        let mut mock = MockEncryptionStrategy::new();
        mock.expect_supports()
            .returning(|alg| alg == Algorithm::Sm4Gcm);
        let mut registry = StrategyRegistry::new();
        registry.register(Algorithm::Sm4Gcm, Arc::new(mock)).unwrap();
        assert!(registry.contains(Algorithm::Sm4Gcm));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn debug_lists_algorithms() {
        let dbg = format!("{:?}", StrategyRegistry::standard());
        assert!(dbg.contains("AES_GCM"));
        assert!(dbg.contains("SM4_CBC"));
    }
}
