//! `keygen`: generate keys for the field-encryption engine.
//!
//! Startup sequence:
//! 1. Parse and validate [`Config`](config::Config) from the command line.
//! 2. Initialise structured JSON logging on stderr.
//! 3. Generate the keys and print them to stdout, one base64 key per line or
//!    as a JSON array of key configuration entries.

mod config;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use engine::keys::generate_base64_key_bits;
use engine::KeyConfig;
use tracing::info;

fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = config::Config::parse();
    cfg.validate().map_err(|e| {
        eprintln!("ERROR: keygen arguments invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;

    // -----------------------------------------------------------------------
    // 3. Generate
    // -----------------------------------------------------------------------
    let entries = generate(&cfg)?;
    info!(
        algorithm = %cfg.algorithm,
        bits = cfg.bits(),
        count = entries.len(),
        "keys generated"
    );
    println!("{}", render(&entries, cfg.json)?);
    Ok(())
}

fn generate(cfg: &config::Config) -> Result<Vec<KeyConfig>> {
    (0..cfg.count)
        .map(|i| {
            let value = generate_base64_key_bits(cfg.algorithm.family(), cfg.bits())
                .context("key generation failed")?;
            Ok(KeyConfig {
                id: cfg.key_id(i),
                value,
                algorithm: cfg.algorithm,
                description: None,
            })
        })
        .collect()
}

fn render(entries: &[KeyConfig], json: bool) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(entries).context("failed to serialise key entries");
    }
    Ok(entries
        .iter()
        .map(|e| e.value.as_str())
        .collect::<Vec<_>>()
        .join("\n"))
}
