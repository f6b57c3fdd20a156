//! # Console Configuration
//!
//! Endpoints, retention and reconnect policy for the Shield console.

use serde::{Deserialize, Serialize};
use std::env;

use crate::domain::{
    ConsoleError, DEFAULT_ACTION_CAPACITY, DEFAULT_EVENT_CAPACITY, DEFAULT_MESH_PROOF_CAPACITY,
    DEFAULT_RECEIPT_CAPACITY,
};

/// Default OffSec HTTP base.
pub const DEFAULT_HTTP_BASE: &str = "http://localhost:9115/offsec";

/// Default live feed endpoint.
pub const DEFAULT_WS_URL: &str = "ws://localhost:9115/offsec/ws";

/// Reconnect backoff for the live channel.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect.
    pub base_delay_ms: u64,
    /// Upper bound on any single delay.
    pub max_delay_ms: u64,
    /// Consecutive failed attempts before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 1500,
            max_delay_ms: 30_000,
            max_attempts: 10,
        }
    }
}

/// Shield console configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// OffSec HTTP API base, without a trailing slash.
    pub http_base: String,

    /// Live feed WebSocket URL.
    pub ws_url: String,

    /// Bearer token sent on action submissions.
    #[serde(default, skip_serializing)]
    pub api_token: Option<String>,

    /// Threat events retained.
    pub event_capacity: usize,

    /// Action records retained.
    pub action_capacity: usize,

    /// Receipts retained.
    pub receipt_capacity: usize,

    /// Mesh proof pointers retained.
    pub mesh_proof_capacity: usize,

    /// Live channel reconnect policy.
    pub reconnect: ReconnectPolicy,

    /// Interval of the root/receipt snapshot refresh.
    pub snapshot_refresh_secs: u64,

    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            http_base: DEFAULT_HTTP_BASE.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            api_token: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            action_capacity: DEFAULT_ACTION_CAPACITY,
            receipt_capacity: DEFAULT_RECEIPT_CAPACITY,
            mesh_proof_capacity: DEFAULT_MESH_PROOF_CAPACITY,
            reconnect: ReconnectPolicy::default(),
            snapshot_refresh_secs: 30,
            request_timeout_secs: 10,
        }
    }
}

impl ConsoleConfig {
    /// Create a config for testing (small buffers, fast reconnect).
    pub fn for_testing() -> Self {
        Self {
            event_capacity: 5,
            action_capacity: 5,
            receipt_capacity: 5,
            mesh_proof_capacity: 5,
            reconnect: ReconnectPolicy {
                base_delay_ms: 10,
                max_delay_ms: 40,
                max_attempts: 3,
            },
            snapshot_refresh_secs: 1,
            request_timeout_secs: 2,
            ..Self::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OFFSEC_HTTP_URL`: HTTP base (default: http://localhost:9115/offsec)
    /// - `OFFSEC_WS_URL`: live feed (default: ws://localhost:9115/offsec/ws)
    /// - `OFFSEC_API_TOKEN`: bearer token for action submissions
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(base) = lookup("OFFSEC_HTTP_URL") {
            config.http_base = base;
        }
        if let Some(ws) = lookup("OFFSEC_WS_URL") {
            config.ws_url = ws;
        }
        config.api_token = lookup("OFFSEC_API_TOKEN").filter(|t| !t.is_empty());
        config.normalized()
    }

    /// Strip the trailing slash from `http_base`.
    pub fn normalized(mut self) -> Self {
        while self.http_base.ends_with('/') {
            self.http_base.pop();
        }
        self
    }

    /// Reject configurations the console cannot run with.
    pub fn validate(&self) -> Result<(), ConsoleError> {
        let capacities = [
            ("event_capacity", self.event_capacity),
            ("action_capacity", self.action_capacity),
            ("receipt_capacity", self.receipt_capacity),
            ("mesh_proof_capacity", self.mesh_proof_capacity),
        ];
        if let Some((name, _)) = capacities.iter().find(|(_, cap)| *cap == 0) {
            return Err(ConsoleError::InvalidConfig(format!("{name} must be non-zero")));
        }

        if !(self.http_base.starts_with("http://") || self.http_base.starts_with("https://")) {
            return Err(ConsoleError::InvalidConfig(format!(
                "http_base must be an http(s) URL: {}",
                self.http_base
            )));
        }
        if !(self.ws_url.starts_with("ws://") || self.ws_url.starts_with("wss://")) {
            return Err(ConsoleError::InvalidConfig(format!(
                "ws_url must be a ws(s) URL: {}",
                self.ws_url
            )));
        }

        if self.reconnect.base_delay_ms > self.reconnect.max_delay_ms {
            return Err(ConsoleError::InvalidConfig(format!(
                "base_delay_ms ({}) exceeds max_delay_ms ({})",
                self.reconnect.base_delay_ms, self.reconnect.max_delay_ms
            )));
        }

        Ok(())
    }
}
