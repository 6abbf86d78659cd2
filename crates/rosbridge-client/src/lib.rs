//! # rosbridge-client
//!
//! Reconnecting WebSocket client for the rosbridge protocol. Ties the
//! transport layer to the protocol dispatcher: it opens a connection, keeps
//! retrying dropped connections with exponential backoff, decodes inbound
//! JSON frames, and hands them to the caller's handler registry.
//!
//! ```no_run
//! use std::sync::Arc;
//! use rosbridge_client::{BoxError, Message, OpHandlerMap, RosBridgeClient, connect_params};
//! use rosbridge_core::Config;
//!
//! # async fn run() {
//! let config = Config::default();
//!
//! let mut handlers = OpHandlerMap::new();
//! handlers.register("publish", |msg: Message| -> Result<(), BoxError> {
//!     println!("inbound publish: {:?}", msg.get("topic"));
//!     Ok(())
//! });
//!
//! let client = RosBridgeClient::connect(
//!     connect_params("ws://127.0.0.1:9090", &config),
//!     Arc::new(handlers),
//!     &config,
//! );
//!
//! client.on_ready(|conn| {
//!     let _ = conn.send(r#"{"op":"subscribe","topic":"/chatter"}"#.to_string());
//! });
//! # }
//! ```

mod reconnect;
mod session;

pub use reconnect::{ExponentialBackoff, ReconnectPolicy};

// Re-export the pieces callers wire together.
pub use rosbridge_comm::{
    BoxError, Connection, ConnectionFactory, DispatchError, FactoryState, HandlerRegistry,
    Message, OpHandler, OpHandlerMap,
};
pub use rosbridge_core::{Config, ReconnectConfig};
pub use rosbridge_transport::{ConnectParams, TransportError, WebSocketConnectOptions};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Connection parameters derived from configuration.
pub fn connect_params(url: impl Into<String>, config: &Config) -> ConnectParams {
    ConnectParams {
        url: url.into(),
        connection_timeout: Duration::from_millis(config.transport.connect_timeout_ms),
        ws_options: WebSocketConnectOptions {
            max_message_size: config.transport.websocket.max_message_size,
            max_frame_size: None,
            accept_unmasked_frames: config.transport.websocket.accept_unmasked_frames,
        },
    }
}

/// Handle to a running rosbridge client: one reconnect loop plus the factory
/// tracking its live connection.
pub struct RosBridgeClient {
    factory: Arc<ConnectionFactory>,
    shutdown: Arc<Notify>,
    session: JoinHandle<()>,
}

impl RosBridgeClient {
    /// Spawns the reconnect loop on the current tokio runtime.
    ///
    /// The handler registry is owned by the caller; this layer only reads
    /// from it.
    pub fn connect(
        params: ConnectParams,
        registry: Arc<dyn HandlerRegistry>,
        config: &Config,
    ) -> Self {
        let policy = Box::new(ExponentialBackoff::new(config.reconnect.clone()));
        Self::connect_with_policy(params, registry, policy)
    }

    /// Same as [`RosBridgeClient::connect`], with an explicit retry policy.
    pub fn connect_with_policy(
        params: ConnectParams,
        registry: Arc<dyn HandlerRegistry>,
        policy: Box<dyn ReconnectPolicy>,
    ) -> Self {
        let factory = ConnectionFactory::new();
        let shutdown = Arc::new(Notify::new());
        let session = tokio::spawn(session::run(
            params,
            Arc::clone(&factory),
            registry,
            policy,
            Arc::clone(&shutdown),
        ));
        Self {
            factory,
            shutdown,
            session,
        }
    }

    /// Registers `callback` to run once a usable connection exists (now, if
    /// one already does). See [`ConnectionFactory::on_ready`].
    pub fn on_ready(&self, callback: impl FnOnce(Arc<Connection>) + Send + 'static) {
        self.factory.on_ready(callback);
    }

    /// The factory tracking connection lifecycle state.
    pub fn factory(&self) -> &Arc<ConnectionFactory> {
        &self.factory
    }

    /// Closes the live connection (if any), stops reconnecting, and waits
    /// for the session loop to finish.
    pub async fn shutdown(self) {
        if let Some(connection) = self.factory.request_shutdown() {
            connection.request_close();
        }
        self.shutdown.notify_one();
        if let Err(e) = self.session.await {
            log::warn!("Session task ended abnormally: {}", e);
        }
    }
}
