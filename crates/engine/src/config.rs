//! Configuration loading and validation for the encryption engine.
//!
//! Values come from an optional JSON file layered under environment
//! variables prefixed `ENCRYPTION__` (e.g. `ENCRYPTION__CACHE_ENABLED=true`).
//! Invalid configuration fails construction with a descriptive error rather
//! than surfacing later as per-call failures.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{Algorithm, DEFAULT_KEY_ID};
use serde::{Deserialize, Serialize};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "ENCRYPTION";

/// Separator between nested keys in environment variable names.
pub const ENV_SEPARATOR: &str = "__";

/// One named key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Key identity.
    #[serde(default = "default_key_id")]
    pub id: String,

    /// Base64-encoded key bytes.
    pub value: String,

    /// Algorithm this key is provisioned for; its length is checked against it.
    #[serde(default)]
    pub algorithm: Algorithm,

    /// Free-form operator note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl KeyConfig {
    /// Decode the base64 key value.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is not valid standard base64.
    pub fn decode(&self) -> Result<Vec<u8>> {
        decode_key(&self.value).with_context(|| format!("key `{}` is not valid base64", self.id))
    }
}

/// Validated engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EncryptionConfig {
    /// When `false` the manager passes values through untouched.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Algorithm used when a call does not name one.
    #[serde(default)]
    pub default_algorithm: Algorithm,

    /// Base64 key stored under the `"default"` identity.
    #[serde(default)]
    pub default_key: Option<String>,

    /// Named keys.
    #[serde(default)]
    pub keys: Vec<KeyConfig>,

    /// Generate a throwaway default key when none is configured.
    /// Non-production use only.
    #[serde(default)]
    pub generate_key_on_startup: bool,

    /// Emit a `debug` event per encrypt/decrypt call.
    #[serde(default)]
    pub log_enabled: bool,

    /// Enable the look-aside result cache.
    #[serde(default)]
    pub cache_enabled: bool,

    /// Maximum entries per cache direction.
    #[serde(default = "default_cache_max_size")]
    pub cache_max_size: usize,

    /// Entry time-to-live in seconds.
    #[serde(default = "default_cache_expire_seconds")]
    pub cache_expire_seconds: u64,
}

fn default_true() -> bool {
    true
}
fn default_key_id() -> String {
    DEFAULT_KEY_ID.into()
}
fn default_cache_max_size() -> usize {
    1000
}
fn default_cache_expire_seconds() -> u64 {
    300
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_algorithm: Algorithm::default(),
            default_key: None,
            keys: Vec::new(),
            generate_key_on_startup: false,
            log_enabled: false,
            cache_enabled: false,
            cache_max_size: default_cache_max_size(),
            cache_expire_seconds: default_cache_expire_seconds(),
        }
    }
}

impl EncryptionConfig {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or validation fails.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load a JSON file, then overlay environment variables, then validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or validation fails.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::load(Some(path))
    }

    fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).format(config::FileFormat::Json));
        }
        let cfg = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR),
            )
            .build()
            .context("failed to build encryption configuration")?;

        let c: EncryptionConfig = cfg
            .try_deserialize()
            .context("failed to deserialise encryption configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    ///
    /// # Errors
    ///
    /// Returns an error for empty or duplicate key ids, undecodable keys, key
    /// lengths that do not match their algorithm, or unusable cache bounds.
    /// Keys with a blank value are skipped.
    pub fn validate(&self) -> Result<()> {
        if let Some(default_key) = &self.default_key {
            if !default_key.trim().is_empty() {
                let bytes = decode_key(default_key).context("DEFAULT_KEY is not valid base64")?;
                ensure_key_len(&bytes, self.default_algorithm, "DEFAULT_KEY")?;
            }
        }

        let mut seen = HashSet::new();
        for key in &self.keys {
            if key.id.trim().is_empty() {
                anyhow::bail!("key ids must not be empty");
            }
            if !seen.insert(key.id.as_str()) {
                anyhow::bail!("key `{}` is configured more than once", key.id);
            }
            // Blank values are placeholders and are not loaded.
            if key.value.trim().is_empty() {
                continue;
            }
            let bytes = key.decode()?;
            ensure_key_len(&bytes, key.algorithm, &format!("key `{}`", key.id))?;
        }

        if self.cache_enabled {
            if self.cache_max_size == 0 {
                anyhow::bail!("CACHE_MAX_SIZE must be > 0 when the cache is enabled");
            }
            if self.cache_expire_seconds == 0 {
                anyhow::bail!("CACHE_EXPIRE_SECONDS must be > 0 when the cache is enabled");
            }
        }
        Ok(())
    }
}

/// Decode a standard base64 key value.
pub(crate) fn decode_key(value: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(value.trim())?)
}

fn ensure_key_len(bytes: &[u8], algorithm: Algorithm, name: &str) -> Result<()> {
    if bytes.len() != algorithm.key_len() {
        anyhow::bail!(
            "{name} must be {} bits for {algorithm}, got {} bits",
            algorithm.key_size_bits(),
            bytes.len() * 8
        );
    }
    Ok(())
}
