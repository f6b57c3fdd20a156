//! `shield block`: submit the operator block action.

use anyhow::{Context, Result};
use shield_console::{ActionSubmission, ConsoleConfig, HttpOffsecApi, OffsecApi};
use tracing::info;

pub async fn run(config: &ConsoleConfig, ip: &str, guardian: Option<String>) -> Result<()> {
    let api = HttpOffsecApi::new(config).context("failed to build API client")?;
    let submission = ActionSubmission::block_ip(ip, guardian);
    info!(
        action_id = %submission.action_id,
        ip,
        "[shield] Submitting block action"
    );

    let body = api
        .apply_action(&submission)
        .await
        .with_context(|| format!("block {ip} was rejected"))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&body).context("failed to encode response")?
    );
    Ok(())
}
