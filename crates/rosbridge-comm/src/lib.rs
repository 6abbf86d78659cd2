//! # rosbridge-comm
//!
//! The protocol layer binding WebSocket sessions to the rosbridge JSON
//! protocol. Inbound text frames are decoded into `op`-keyed messages and
//! dispatched synchronously to a handler registry owned by the client;
//! the `ConnectionFactory` tracks the single live connection across
//! reconnect attempts and exposes the "ready" subscription point.

pub mod connection;
pub mod error;
pub mod factory;
pub mod message;
pub mod registry;

// Re-export key items
pub use connection::{Connection, Outbound};
pub use error::DispatchError;
pub use factory::{ConnectionFactory, FactoryState, ReadyCallback};
pub use message::Message;
pub use registry::{BoxError, HandlerRegistry, OpHandler, OpHandlerMap};
