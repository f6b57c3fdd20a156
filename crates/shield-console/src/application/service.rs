//! # Console Service
//!
//! Drives the engine from one sequential loop. Feed events, operator
//! commands, fetch results and the refresh tick are all handled by the
//! same `tokio::select!`, so the engine is never touched concurrently.
//!
//! Fetches run as spawned tasks and report back through an mpsc channel.
//! Their results are applied only while the engine is live.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::algorithms::verify_bundle;
use crate::application::connection::{ConnectionManager, FeedEvent};
use crate::application::engine::{ConsoleEngine, Liveness};
use crate::application::mesh_tracker;
use crate::config::ConsoleConfig;
use crate::domain::{
    ActionSubmission, ChangeNotice, ConsoleError, ConsoleSnapshot, GuardianScope, InspectedProof,
    ProofBundle, Receipt, VerificationReport,
};
use crate::ports::inbound::ConsoleApi;
use crate::ports::outbound::{FeedTransport, OffsecApi};

const FEED_BUFFER: usize = 256;
const COMMAND_BUFFER: usize = 64;

type Reply<T> = oneshot::Sender<Result<T, ConsoleError>>;

enum Command {
    Snapshot(oneshot::Sender<ConsoleSnapshot>),
    Submit(ActionSubmission, Reply<serde_json::Value>),
    FetchProof(String, Reply<(ProofBundle, VerificationReport)>),
    InspectMesh {
        peer_id: String,
        receipt_id: String,
        reply: Reply<InspectedProof>,
    },
    VerifyReceipt(String, Reply<VerificationReport>),
    ExportReceipt(String, Reply<ProofBundle>),
    SelectScope(GuardianScope, oneshot::Sender<()>),
    ResetActiveDefense(Reply<()>),
    Reconnect(oneshot::Sender<bool>),
    Shutdown(oneshot::Sender<()>),
}

enum FetchResult {
    Root(Result<String, ConsoleError>),
    Receipts(Result<Vec<Receipt>, ConsoleError>),
}

/// Owner of the engine, the connection manager and the API port.
pub struct ConsoleService {
    engine: ConsoleEngine,
    connection: ConnectionManager,
    api: Arc<dyn OffsecApi>,
    feed_rx: mpsc::Receiver<FeedEvent>,
    commands_rx: mpsc::Receiver<Command>,
    fetch_tx: mpsc::UnboundedSender<FetchResult>,
    fetch_rx: mpsc::UnboundedReceiver<FetchResult>,
    refresh_every: Duration,
}

impl ConsoleService {
    /// Build the service and the handle operators talk to.
    pub fn new(
        config: &ConsoleConfig,
        transport: Arc<dyn FeedTransport>,
        api: Arc<dyn OffsecApi>,
    ) -> Result<(Self, ConsoleHandle), ConsoleError> {
        let engine = ConsoleEngine::new(config)?;

        let (feed_tx, feed_rx) = mpsc::channel(FEED_BUFFER);
        let connection = ConnectionManager::new(
            transport,
            config.ws_url.clone(),
            config.reconnect.clone(),
            feed_tx,
        );

        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();

        let handle = ConsoleHandle {
            commands: commands_tx,
            notices: engine.notice_sender(),
        };
        let service = Self {
            engine,
            connection,
            api,
            feed_rx,
            commands_rx,
            fetch_tx,
            fetch_rx,
            refresh_every: Duration::from_secs(config.snapshot_refresh_secs.max(1)),
        };
        Ok((service, handle))
    }

    /// Run until shutdown is requested or every handle is dropped.
    pub async fn run(mut self) {
        info!("[shield] Console service starting");
        self.connection.start();

        let mut refresh = tokio::time::interval(self.refresh_every);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                Some(event) = self.feed_rx.recv() => {
                    let connected = matches!(event, FeedEvent::Connected);
                    self.engine.handle_feed_event(event);
                    if connected {
                        self.spawn_refresh();
                    }
                }
                command = self.commands_rx.recv() => match command {
                    Some(Command::Shutdown(reply)) => {
                        self.stop().await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("[shield] All console handles dropped");
                        self.stop().await;
                        break;
                    }
                },
                Some(result) = self.fetch_rx.recv() => self.apply_fetch(result),
                _ = refresh.tick() => self.spawn_refresh(),
            }
        }

        info!("[shield] Console service stopped");
    }

    async fn stop(&mut self) {
        self.engine.dispose();
        // Unblocks a worker waiting on a full feed buffer
        self.feed_rx.close();
        self.connection.shutdown().await;
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Snapshot(reply) => {
                let _ = reply.send(self.engine.snapshot());
            }
            Command::Submit(submission, reply) => {
                let api = self.api.clone();
                tokio::spawn(async move {
                    let result = api.apply_action(&submission).await;
                    match &result {
                        Ok(_) => info!(
                            action_id = %submission.action_id,
                            action_type = %submission.action_type,
                            "[shield] Action submitted"
                        ),
                        Err(e) => warn!(
                            action_id = %submission.action_id,
                            "[shield] Action submission failed: {}", e
                        ),
                    }
                    let _ = reply.send(result);
                });
            }
            Command::FetchProof(id, reply) => {
                let api = self.api.clone();
                tokio::spawn(async move {
                    let result = match api.fetch_proof(&id).await {
                        Ok(bundle) => verify_bundle(&bundle).map(|report| (bundle, report)),
                        Err(e) => Err(e),
                    };
                    let _ = reply.send(result);
                });
            }
            Command::InspectMesh {
                peer_id,
                receipt_id,
                reply,
            } => {
                let pointer = match self.engine.mesh_pointer(&peer_id, &receipt_id) {
                    Ok(pointer) => pointer,
                    Err(e) => {
                        let _ = reply.send(Err(e));
                        return;
                    }
                };
                let api = self.api.clone();
                tokio::spawn(async move {
                    let result = match api.fetch_mesh_proof(&peer_id, &receipt_id).await {
                        Ok(bundle) => mesh_tracker::inspect(pointer, bundle),
                        Err(e) => Err(e),
                    };
                    let _ = reply.send(result);
                });
            }
            Command::VerifyReceipt(id, reply) => {
                let _ = reply.send(self.engine.verify_receipt(&id));
            }
            Command::ExportReceipt(id, reply) => {
                let _ = reply.send(self.engine.export_receipt_bundle(&id));
            }
            Command::SelectScope(scope, reply) => {
                let changed = self.engine.scope() != &scope;
                self.engine.set_scope(scope);
                if changed {
                    self.spawn_receipts_fetch();
                }
                let _ = reply.send(());
            }
            Command::ResetActiveDefense(reply) => {
                let _ = reply.send(self.engine.reset_active_defense().map(|_| ()));
            }
            Command::Reconnect(reply) => {
                let _ = reply.send(self.connection.start());
            }
            // Handled by the loop
            Command::Shutdown(reply) => {
                let _ = reply.send(());
            }
        }
    }

    fn spawn_refresh(&self) {
        self.spawn_root_fetch();
        self.spawn_receipts_fetch();
    }

    fn spawn_root_fetch(&self) {
        let api = self.api.clone();
        let tx = self.fetch_tx.clone();
        let live = self.engine.liveness();
        tokio::spawn(async move {
            if !live.is_live() {
                return;
            }
            let result = api.fetch_current_root().await;
            deliver(&live, &tx, FetchResult::Root(result));
        });
    }

    fn spawn_receipts_fetch(&self) {
        let api = self.api.clone();
        let tx = self.fetch_tx.clone();
        let live = self.engine.liveness();
        let guardian = self.engine.scope().guardian_id().map(str::to_string);
        tokio::spawn(async move {
            if !live.is_live() {
                return;
            }
            let result = api.fetch_receipts(guardian.as_deref()).await;
            deliver(&live, &tx, FetchResult::Receipts(result));
        });
    }

    fn apply_fetch(&mut self, result: FetchResult) {
        match result {
            FetchResult::Root(Ok(root)) => {
                self.engine.apply_current_root(root);
            }
            FetchResult::Receipts(Ok(receipts)) => {
                debug!(count = receipts.len(), "[shield] Receipt snapshot fetched");
                self.engine.apply_receipt_snapshot(receipts);
            }
            FetchResult::Root(Err(e)) | FetchResult::Receipts(Err(e)) => {
                warn!("[shield] Snapshot refresh failed: {}", e);
            }
        }
    }
}

fn deliver(live: &Liveness, tx: &mpsc::UnboundedSender<FetchResult>, result: FetchResult) {
    if live.is_live() {
        let _ = tx.send(result);
    } else {
        debug!("[shield] Discarding fetch result after dispose");
    }
}

/// Cloneable operator handle to a running [`ConsoleService`].
#[derive(Clone)]
pub struct ConsoleHandle {
    commands: mpsc::Sender<Command>,
    notices: broadcast::Sender<ChangeNotice>,
}

impl ConsoleHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ConsoleError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| ConsoleError::Disposed)?;
        rx.await.map_err(|_| ConsoleError::Disposed)
    }
}

#[async_trait]
impl ConsoleApi for ConsoleHandle {
    async fn snapshot(&self) -> Result<ConsoleSnapshot, ConsoleError> {
        self.request(Command::Snapshot).await
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.notices.subscribe()
    }

    async fn submit_action(
        &self,
        submission: ActionSubmission,
    ) -> Result<serde_json::Value, ConsoleError> {
        self.request(|reply| Command::Submit(submission, reply))
            .await?
    }

    async fn fetch_proof(
        &self,
        id: &str,
    ) -> Result<(ProofBundle, VerificationReport), ConsoleError> {
        let id = id.to_string();
        self.request(|reply| Command::FetchProof(id, reply)).await?
    }

    async fn inspect_mesh_proof(
        &self,
        peer_id: &str,
        receipt_id: &str,
    ) -> Result<InspectedProof, ConsoleError> {
        let (peer_id, receipt_id) = (peer_id.to_string(), receipt_id.to_string());
        self.request(|reply| Command::InspectMesh {
            peer_id,
            receipt_id,
            reply,
        })
        .await?
    }

    async fn verify_receipt(&self, id: &str) -> Result<VerificationReport, ConsoleError> {
        let id = id.to_string();
        self.request(|reply| Command::VerifyReceipt(id, reply)).await?
    }

    async fn export_receipt_bundle(&self, id: &str) -> Result<ProofBundle, ConsoleError> {
        let id = id.to_string();
        self.request(|reply| Command::ExportReceipt(id, reply)).await?
    }

    async fn select_scope(&self, scope: GuardianScope) -> Result<(), ConsoleError> {
        self.request(|reply| Command::SelectScope(scope, reply)).await
    }

    async fn reset_active_defense(&self) -> Result<(), ConsoleError> {
        self.request(Command::ResetActiveDefense).await?
    }

    async fn reconnect(&self) -> Result<bool, ConsoleError> {
        self.request(Command::Reconnect).await
    }

    async fn shutdown(&self) -> Result<(), ConsoleError> {
        self.request(Command::Shutdown).await
    }
}
