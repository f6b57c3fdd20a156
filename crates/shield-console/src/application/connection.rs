//! # Connection Manager
//!
//! Owns the single live feed channel and reconnects with exponential
//! backoff. Frames and transitions are delivered as [`FeedEvent`]s on one
//! mpsc channel, in order.
//!
//! The reconnect timer and every event send race the shutdown channel, so
//! [`ConnectionManager::shutdown`] returns even when nobody drains events.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::algorithms::ReconnectTracker;
use crate::config::ReconnectPolicy;
use crate::domain::ConnectionState;
use crate::ports::outbound::{FeedChannel, FeedTransport};

/// Events delivered by the connection manager.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Channel open.
    Connected,
    /// Channel lost or connect failed; a reconnect may follow.
    Disconnected { reason: Option<String> },
    /// Text frame received.
    Message(String),
    /// Retry ceiling reached; no further reconnects until restarted.
    GaveUp { attempts: u32 },
}

enum ChannelEnd {
    Lost(Option<String>),
    Shutdown,
}

/// Live feed connection manager.
pub struct ConnectionManager {
    transport: Arc<dyn FeedTransport>,
    url: String,
    policy: ReconnectPolicy,
    events_tx: mpsc::Sender<FeedEvent>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    pub fn new(
        transport: Arc<dyn FeedTransport>,
        url: impl Into<String>,
        policy: ReconnectPolicy,
        events_tx: mpsc::Sender<FeedEvent>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            transport,
            url: url.into(),
            policy,
            events_tx,
            state_tx: Arc::new(state_tx),
            shutdown_tx: None,
            worker: None,
        }
    }

    /// Start the connection loop.
    ///
    /// No-op returning false while a loop is already running. After the
    /// retry ceiling was reached this restarts with a fresh counter.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            debug!("[shield] Connection loop already running");
            return false;
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx);

        let worker = tokio::spawn(Self::connection_loop(
            self.transport.clone(),
            self.url.clone(),
            ReconnectTracker::new(self.policy.clone()),
            self.events_tx.clone(),
            self.state_tx.clone(),
            shutdown_rx,
        ));
        self.worker = Some(worker);
        true
    }

    /// True while the worker task is alive and has not given up.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
            && self.state() != ConnectionState::Exhausted
    }

    /// Stop reconnecting, cancel any pending backoff and close the channel.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                warn!("[shield] Connection worker ended abnormally: {}", e);
            }
        }
        self.state_tx.send_replace(ConnectionState::Shutdown);
        info!("[shield] Live feed shut down");
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Observe state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Connection loop with reconnection logic.
    async fn connection_loop(
        transport: Arc<dyn FeedTransport>,
        url: String,
        mut tracker: ReconnectTracker,
        events_tx: mpsc::Sender<FeedEvent>,
        state_tx: Arc<watch::Sender<ConnectionState>>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        loop {
            state_tx.send_replace(ConnectionState::Connecting);

            let connected = tokio::select! {
                result = transport.connect(&url) => result,
                _ = shutdown_rx.recv() => break,
            };

            match connected {
                Ok(channel) => {
                    tracker.on_connected();
                    state_tx.send_replace(ConnectionState::Connected);
                    info!(url = %url, "[shield] Live feed connected");
                    if !Self::forward(&events_tx, &mut shutdown_rx, FeedEvent::Connected).await {
                        break;
                    }

                    match Self::run_channel(channel, &events_tx, &mut shutdown_rx).await {
                        ChannelEnd::Shutdown => break,
                        ChannelEnd::Lost(reason) => {
                            state_tx.send_replace(ConnectionState::Disconnected);
                            info!(reason = ?reason, "[shield] Live feed lost");
                            let event = FeedEvent::Disconnected { reason };
                            if !Self::forward(&events_tx, &mut shutdown_rx, event).await {
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    state_tx.send_replace(ConnectionState::Disconnected);
                    let reason = e.to_string();
                    debug!("[shield] Connect failed: {}", reason);
                    let event = FeedEvent::Disconnected {
                        reason: Some(reason),
                    };
                    if !Self::forward(&events_tx, &mut shutdown_rx, event).await {
                        break;
                    }
                }
            }

            let Some(delay) = tracker.on_disconnect() else {
                let attempts = tracker.attempts();
                warn!(attempts, "[shield] Live feed reconnection gave up");
                state_tx.send_replace(ConnectionState::Exhausted);
                Self::forward(&events_tx, &mut shutdown_rx, FeedEvent::GaveUp { attempts }).await;
                return;
            };

            warn!(
                attempt = tracker.attempts(),
                delay_ms = delay.as_millis() as u64,
                "[shield] Scheduling live feed reconnect"
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_rx.recv() => break,
            }
        }

        state_tx.send_replace(ConnectionState::Shutdown);
    }

    /// Deliver one event unless shutdown arrives first. False when the
    /// event was not delivered.
    async fn forward(
        events_tx: &mpsc::Sender<FeedEvent>,
        shutdown_rx: &mut mpsc::Receiver<()>,
        event: FeedEvent,
    ) -> bool {
        tokio::select! {
            sent = events_tx.send(event) => sent.is_ok(),
            _ = shutdown_rx.recv() => false,
        }
    }

    /// Pump frames until the channel ends or shutdown is requested.
    async fn run_channel(
        mut channel: Box<dyn FeedChannel>,
        events_tx: &mpsc::Sender<FeedEvent>,
        shutdown_rx: &mut mpsc::Receiver<()>,
    ) -> ChannelEnd {
        let end = loop {
            tokio::select! {
                frame = channel.next_frame() => match frame {
                    Some(Ok(text)) => {
                        if !Self::forward(events_tx, shutdown_rx, FeedEvent::Message(text)).await {
                            break ChannelEnd::Shutdown;
                        }
                    }
                    Some(Err(e)) => break ChannelEnd::Lost(Some(e.to_string())),
                    None => break ChannelEnd::Lost(None),
                },
                _ = shutdown_rx.recv() => break ChannelEnd::Shutdown,
            }
        };

        if matches!(end, ChannelEnd::Shutdown) {
            channel.close().await;
        }
        end
    }
}
