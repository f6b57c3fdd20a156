//! `shield proof` and `shield mesh-proof`: fetch a bundle and verify it.

use anyhow::{Context, Result};
use shield_console::{verify_bundle, ConsoleConfig, HttpOffsecApi, OffsecApi, VerificationReport};
use std::path::Path;
use tracing::info;

use super::write_bundle;

/// Where to fetch the bundle from.
pub enum ProofSource<'a> {
    Local { id: &'a str },
    Mesh { peer: &'a str, receipt: &'a str },
}

pub async fn run(
    config: &ConsoleConfig,
    source: ProofSource<'_>,
    out: Option<&Path>,
) -> Result<VerificationReport> {
    let api = HttpOffsecApi::new(config).context("failed to build API client")?;
    let bundle = match source {
        ProofSource::Local { id } => api
            .fetch_proof(id)
            .await
            .with_context(|| format!("failed to fetch proof {id}"))?,
        ProofSource::Mesh { peer, receipt } => api
            .fetch_mesh_proof(peer, receipt)
            .await
            .with_context(|| format!("failed to fetch proof {receipt} from {peer}"))?,
    };

    let report = verify_bundle(&bundle).context("bundle is not well-formed")?;
    if let Some(path) = out {
        write_bundle(path, &bundle)?;
        info!(path = %path.display(), "[shield] Bundle written");
    }
    Ok(report)
}
