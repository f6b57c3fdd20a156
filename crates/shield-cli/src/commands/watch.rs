//! `shield watch`: run the console headless and log every change.

use anyhow::{Context, Result};
use shield_console::{
    ChangeKind, ConsoleApi, ConsoleConfig, ConsoleService, ConsoleSnapshot, HttpOffsecApi,
    WsFeedTransport,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// One-line summary of the state behind a change notice.
pub fn summarize(kind: ChangeKind, snapshot: &ConsoleSnapshot) -> String {
    match kind {
        ChangeKind::Event => match snapshot.events.first() {
            Some(e) => format!(
                "event {} {:?} {} from {}",
                e.id, e.severity, e.event_type, e.source
            ),
            None => "event".to_string(),
        },
        ChangeKind::Action => match snapshot.actions.first() {
            Some(a) => format!("action {} {} {}", a.id, a.action_type, a.status),
            None => "action".to_string(),
        },
        ChangeKind::Receipt => format!("receipts stored: {}", snapshot.receipts.len()),
        ChangeKind::Anchor => match &snapshot.last_anchor {
            Some(a) => format!("anchor {} {:?}", a.root, a.status),
            None => "anchor".to_string(),
        },
        ChangeKind::MeshRoot => format!("mesh peers: {}", snapshot.mesh_roots.len()),
        ChangeKind::MeshProof => match snapshot.mesh_proofs.first() {
            Some(p) => format!("mesh proof {} from {}", p.receipt_id, p.peer_id),
            None => "mesh proof".to_string(),
        },
        ChangeKind::CurrentRoot => format!(
            "current root {}",
            snapshot.current_root.as_deref().unwrap_or("-")
        ),
        ChangeKind::ActiveDefense => format!("active defense {}", snapshot.active_defense),
        ChangeKind::Connection => format!("connection {:?}", snapshot.connection),
        ChangeKind::Scope => format!("scope {:?}", snapshot.scope),
    }
}

pub async fn run(config: ConsoleConfig, guardian: Option<String>) -> Result<()> {
    let api = Arc::new(HttpOffsecApi::new(&config).context("failed to build API client")?);
    let transport = Arc::new(WsFeedTransport::new());
    let (service, handle) =
        ConsoleService::new(&config, transport, api).context("failed to start console")?;

    let mut notices = handle.subscribe();
    let task = tokio::spawn(service.run());
    if let Some(id) = guardian {
        handle
            .select_scope(shield_console::GuardianScope::Only(id))
            .await
            .context("failed to select scope")?;
    }
    info!(ws = %config.ws_url, "[shield] Watching live feed, Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("[shield] Interrupted");
                break;
            }
            notice = notices.recv() => match notice {
                Ok(notice) => {
                    let snapshot = handle.snapshot().await?;
                    info!(version = notice.version, "[shield] {}", summarize(notice.kind, &snapshot));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "[shield] Change notices lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    handle.shutdown().await.ok();
    task.await.context("console service panicked")?;
    Ok(())
}
