//! `shield verify`: re-verify an exported proof bundle offline.

use anyhow::{Context, Result};
use shield_console::{verify_bundle, ProofBundle, VerificationReport};
use std::io::Read;
use std::path::Path;

/// Parse and verify a bundle from raw JSON.
pub fn verify_json(raw: &str) -> Result<VerificationReport> {
    let bundle: ProofBundle = serde_json::from_str(raw).context("not a proof bundle")?;
    verify_bundle(&bundle).context("bundle is not well-formed")
}

/// Verify the bundle at `source`, or stdin when it is `-`.
pub fn run(source: &Path) -> Result<VerificationReport> {
    let raw = if source == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("failed to read {}", source.display()))?
    };
    verify_json(&raw)
}
