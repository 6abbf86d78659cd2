//! # rosbridge-transport
//!
//! Low-level details of establishing and managing network connections to a
//! rosbridge endpoint. Defines the `Transport` trait for abstracting the
//! communication method and provides the WebSocket implementation used by
//! the client crate's session loop.

pub mod error;
pub mod factory;
pub mod traits;
pub mod types;
#[cfg(feature = "websocket")]
pub mod websocket;

// Re-export key items
pub use error::TransportError;
pub use factory::create_transport;
pub use traits::Transport;
pub use types::{CloseInfo, ConnectParams, Frame};
#[cfg(feature = "websocket")]
pub use types::WebSocketConnectOptions;
