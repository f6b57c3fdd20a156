//! # Domain Module
//!
//! Core types for the Shield console: feed records, proof artifacts,
//! the inbound message union and errors.

pub mod bounded;
pub mod entities;
pub mod errors;
pub mod invariants;
pub mod messages;
pub mod value_objects;
pub mod views;

pub use bounded::*;
pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use messages::*;
pub use value_objects::*;
pub use views::*;
