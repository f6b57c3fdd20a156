//! # Application Module
//!
//! Reconcilers, the connection manager, the engine that owns them, and the
//! service loop that drives the engine.

pub mod connection;
pub mod dispatcher;
pub mod engine;
pub mod event_store;
pub mod mesh_tracker;
pub mod service;

pub use connection::{ConnectionManager, FeedEvent};
pub use dispatcher::{DispatchOutcome, DispatchStats, Dispatcher};
pub use engine::{ConsoleEngine, Liveness};
pub use event_store::{ActionApplied, EventStore};
pub use mesh_tracker::{inspect, MeshTracker};
pub use service::{ConsoleHandle, ConsoleService};
