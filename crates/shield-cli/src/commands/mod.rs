//! Subcommand implementations.

pub mod block;
pub mod proof;
pub mod verify;
pub mod watch;

use anyhow::{Context, Result};
use shield_console::{ProofBundle, VerificationReport};
use std::path::Path;

/// Print a verification report to stdout.
pub fn print_report(report: &VerificationReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to encode report")?;
    println!("{json}");
    Ok(())
}

/// Write a bundle as pretty JSON.
pub fn write_bundle(path: &Path, bundle: &ProofBundle) -> Result<()> {
    let json = serde_json::to_string_pretty(bundle).context("failed to encode bundle")?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}
