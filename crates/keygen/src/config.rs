//! Command-line configuration for the keygen tool.

use anyhow::Result;
use clap::Parser;
use common::Algorithm;
use engine::keys::generate::supported_bits;

/// Generate random keys for the field-encryption engine.
#[derive(Debug, Clone, Parser)]
#[command(name = "keygen", about = "Generate base64 keys for the field-encryption engine")]
pub struct Config {
    /// Algorithm the keys are for (AES_GCM, AES_CBC, SM4_CBC, SM4_GCM).
    #[arg(long, short, default_value = "AES_GCM", env = "KEYGEN_ALGORITHM")]
    pub algorithm: Algorithm,

    /// Key size in bits. Defaults to the algorithm's declared size.
    #[arg(long, short)]
    pub bits: Option<usize>,

    /// Number of keys to generate.
    #[arg(long, short, default_value_t = 1)]
    pub count: usize,

    /// Key identity for `--json` output. Suffixed `-1`, `-2`, ... when
    /// `--count` is above one.
    #[arg(long)]
    pub id: Option<String>,

    /// Print key configuration entries as JSON instead of bare base64.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn", env = "KEYGEN_LOG_LEVEL")]
    pub log_level: String,
}

impl Config {
    /// Key size to generate.
    pub fn bits(&self) -> usize {
        self.bits.unwrap_or_else(|| self.algorithm.key_size_bits())
    }

    /// Identity of the `index`-th (zero-based) generated key.
    pub fn key_id(&self, index: usize) -> String {
        match (&self.id, self.count) {
            (Some(id), 1) => id.clone(),
            (None, 1) => common::DEFAULT_KEY_ID.into(),
            (Some(id), _) => format!("{id}-{}", index + 1),
            (None, _) => format!("key-{}", index + 1),
        }
    }

    /// Reject argument combinations that cannot produce usable keys.
    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            anyhow::bail!("--count must be at least 1");
        }
        let family = self.algorithm.family();
        let bits = self.bits();
        if !supported_bits(family).contains(&bits) {
            anyhow::bail!(
                "{family} does not support {bits}-bit keys (supported: {:?})",
                supported_bits(family)
            );
        }
        if self.json && bits != self.algorithm.key_size_bits() {
            anyhow::bail!(
                "--json entries are loaded as {} keys, which must be {} bits",
                self.algorithm,
                self.algorithm.key_size_bits()
            );
        }
        if self.id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            anyhow::bail!("--id must not be empty");
        }
        Ok(())
    }
}
