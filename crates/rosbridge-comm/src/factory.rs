//! Connection lifecycle tracking across reconnect attempts.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use log::{debug, warn};
use tokio::sync::mpsc;

use crate::connection::{Connection, Outbound};
use crate::registry::HandlerRegistry;

/// Capacity of each session's outbound queue.
const OUTGOING_BUFFER: usize = 100;

/// Callback invoked exactly once with the next (or current) live connection.
pub type ReadyCallback = Box<dyn FnOnce(Arc<Connection>) + Send>;

/// Lifecycle state of the factory.
///
/// `Disconnected` is transient: the reconnect policy re-enters `Connecting`
/// unless shutdown was requested, in which case the factory lands in the
/// terminal `Closed` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryState {
    Idle,
    Connecting,
    Ready,
    Disconnected,
    Closed,
}

struct FactoryInner {
    state: FactoryState,
    current: Option<Arc<Connection>>,
    ready_observers: Vec<ReadyCallback>,
    shutdown_requested: bool,
}

/// Tracks the single live connection (or none) across reconnect attempts and
/// owns the "ready" subscription point.
///
/// Invariant: `current` is `Some` exactly while the state is `Ready`, and is
/// cleared immediately on loss or connect failure. The lock is only held
/// around state reads and writes, never across a callback invocation.
pub struct ConnectionFactory {
    inner: Mutex<FactoryInner>,
}

impl ConnectionFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(FactoryInner {
                state: FactoryState::Idle,
                current: None,
                ready_observers: Vec::new(),
                shutdown_requested: false,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, FactoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Builds the session object for a freshly completed handshake, returning
    /// the read half of its outbound queue for the transport driver.
    pub fn build_connection(
        self: &Arc<Self>,
        registry: Arc<dyn HandlerRegistry>,
    ) -> (Arc<Connection>, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(OUTGOING_BUFFER);
        let connection = Arc::new(Connection::new(Arc::downgrade(self), registry, tx));
        (connection, rx)
    }

    /// Called once per successful handshake, by the connection itself.
    ///
    /// Stores the live reference and fires every pending ready callback in
    /// registration order, each exactly once. Callbacks registered after
    /// this call are served immediately while the connection stays live.
    ///
    /// Refused after shutdown: `Closed` is terminal, so a handshake that
    /// races the shutdown request neither revives the factory nor fires
    /// pending callbacks. The session driver is expected to notice via
    /// `shutdown_requested` and close the transport.
    pub fn mark_ready(&self, connection: Arc<Connection>) {
        let pending = {
            let mut inner = self.lock();
            if inner.shutdown_requested {
                debug!("Handshake completed after shutdown; refusing the session.");
                return;
            }
            inner.state = FactoryState::Ready;
            inner.current = Some(Arc::clone(&connection));
            std::mem::take(&mut inner.ready_observers)
        };
        debug!(
            "Factory state -> Ready ({} pending ready callbacks)",
            pending.len()
        );
        for callback in pending {
            callback(Arc::clone(&connection));
        }
    }

    /// Runs `callback` with the live connection immediately if one exists,
    /// otherwise queues it for the next `mark_ready`.
    pub fn on_ready(&self, callback: impl FnOnce(Arc<Connection>) + Send + 'static) {
        let connection = {
            let mut inner = self.lock();
            match inner.current.clone() {
                Some(connection) => connection,
                None => {
                    inner.ready_observers.push(Box::new(callback));
                    return;
                }
            }
        };
        callback(connection);
    }

    /// Logging hook for the start of a connect attempt.
    pub fn on_connect_attempt_started(&self) {
        let mut inner = self.lock();
        if inner.state == FactoryState::Closed {
            warn!("Connect attempt after shutdown; ignoring.");
            return;
        }
        debug!("Started to connect...");
        inner.state = FactoryState::Connecting;
    }

    /// The live connection was lost. Retry timing belongs to the reconnect
    /// policy; this only records the loss.
    pub fn on_connection_lost(&self, reason: &str) {
        debug!("Lost connection. Reason: {}", reason);
        self.clear_live();
    }

    /// A connect attempt failed before the handshake completed.
    pub fn on_connect_failed(&self, reason: &str) {
        debug!("Connection failed. Reason: {}", reason);
        self.clear_live();
    }

    fn clear_live(&self) {
        let mut inner = self.lock();
        inner.current = None;
        inner.state = if inner.shutdown_requested {
            FactoryState::Closed
        } else {
            FactoryState::Disconnected
        };
    }

    /// Stops the reconnect loop after the current session ends. Returns the
    /// live connection, if any, so the caller can request a clean close.
    pub fn request_shutdown(&self) -> Option<Arc<Connection>> {
        let mut inner = self.lock();
        inner.shutdown_requested = true;
        if inner.current.is_none() {
            inner.state = FactoryState::Closed;
        }
        inner.current.clone()
    }

    pub fn shutdown_requested(&self) -> bool {
        self.lock().shutdown_requested
    }

    /// The live connection, if the factory is in the ready state.
    pub fn current(&self) -> Option<Arc<Connection>> {
        self.lock().current.clone()
    }

    pub fn state(&self) -> FactoryState {
        self.lock().state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::OpHandlerMap;
    use std::sync::Mutex as StdMutex;

    fn empty_registry() -> Arc<OpHandlerMap> {
        Arc::new(OpHandlerMap::new())
    }

    #[test]
    fn starts_idle_with_no_live_connection() {
        let factory = ConnectionFactory::new();
        assert_eq!(factory.state(), FactoryState::Idle);
        assert!(factory.current().is_none());
    }

    #[test]
    fn pending_ready_callbacks_fire_once_in_registration_order() {
        let factory = ConnectionFactory::new();
        let log: Arc<StdMutex<Vec<&'static str>>> = Arc::new(StdMutex::new(Vec::new()));

        let sink = Arc::clone(&log);
        factory.on_ready(move |_conn| sink.lock().unwrap().push("cb1"));
        let sink = Arc::clone(&log);
        factory.on_ready(move |_conn| sink.lock().unwrap().push("cb2"));
        assert!(log.lock().unwrap().is_empty());

        let (conn, _rx) = factory.build_connection(empty_registry());
        factory.mark_ready(conn);
        assert_eq!(*log.lock().unwrap(), vec!["cb1", "cb2"]);

        // A later registration is served immediately.
        let sink = Arc::clone(&log);
        factory.on_ready(move |_conn| sink.lock().unwrap().push("cb3"));
        assert_eq!(*log.lock().unwrap(), vec!["cb1", "cb2", "cb3"]);

        // A second ready event must not re-fire earlier registrations.
        factory.on_connection_lost("test");
        let (conn, _rx) = factory.build_connection(empty_registry());
        factory.mark_ready(conn);
        assert_eq!(*log.lock().unwrap(), vec!["cb1", "cb2", "cb3"]);
    }

    #[test]
    fn ready_callback_receives_the_live_connection() {
        let factory = ConnectionFactory::new();
        let (conn, _rx) = factory.build_connection(empty_registry());

        let seen: Arc<StdMutex<Option<Arc<Connection>>>> = Arc::new(StdMutex::new(None));
        let sink = Arc::clone(&seen);
        factory.on_ready(move |c| *sink.lock().unwrap() = Some(c));

        factory.mark_ready(Arc::clone(&conn));
        let seen = seen.lock().unwrap().clone().expect("callback ran");
        assert!(Arc::ptr_eq(&seen, &conn));
    }

    #[test]
    fn connect_failure_then_success_walks_the_state_machine() {
        let factory = ConnectionFactory::new();

        factory.on_connect_attempt_started();
        assert_eq!(factory.state(), FactoryState::Connecting);

        factory.on_connect_failed("connection refused");
        assert_eq!(factory.state(), FactoryState::Disconnected);
        assert!(factory.current().is_none());

        factory.on_connect_attempt_started();
        assert_eq!(factory.state(), FactoryState::Connecting);

        let (conn, _rx) = factory.build_connection(empty_registry());
        factory.mark_ready(conn);
        assert_eq!(factory.state(), FactoryState::Ready);
        assert!(factory.current().is_some());
    }

    #[test]
    fn losing_the_connection_clears_the_live_reference() {
        let factory = ConnectionFactory::new();
        let (conn, _rx) = factory.build_connection(empty_registry());
        factory.mark_ready(conn);
        assert!(factory.current().is_some());

        factory.on_connection_lost("remote closed");
        assert_eq!(factory.state(), FactoryState::Disconnected);
        assert!(factory.current().is_none());
    }

    #[test]
    fn shutdown_while_disconnected_closes_immediately() {
        let factory = ConnectionFactory::new();
        factory.on_connect_attempt_started();
        factory.on_connect_failed("refused");

        assert!(factory.request_shutdown().is_none());
        assert_eq!(factory.state(), FactoryState::Closed);

        // The terminal state sticks even if a straggling attempt reports in.
        factory.on_connect_attempt_started();
        assert_eq!(factory.state(), FactoryState::Closed);
    }

    #[test]
    fn ready_after_shutdown_is_refused() {
        let factory = ConnectionFactory::new();
        factory.on_connect_attempt_started();

        let fired = Arc::new(StdMutex::new(false));
        let sink = Arc::clone(&fired);
        factory.on_ready(move |_conn| *sink.lock().unwrap() = true);

        assert!(factory.request_shutdown().is_none());
        assert_eq!(factory.state(), FactoryState::Closed);

        // A handshake finishing after shutdown must not revive the factory.
        let (conn, _rx) = factory.build_connection(empty_registry());
        factory.mark_ready(conn);
        assert_eq!(factory.state(), FactoryState::Closed);
        assert!(factory.current().is_none());
        assert!(!*fired.lock().unwrap());
    }

    #[test]
    fn shutdown_while_ready_returns_the_live_connection() {
        let factory = ConnectionFactory::new();
        let (conn, _rx) = factory.build_connection(empty_registry());
        factory.mark_ready(Arc::clone(&conn));

        let live = factory.request_shutdown().expect("live connection");
        assert!(Arc::ptr_eq(&live, &conn));
        assert_eq!(factory.state(), FactoryState::Ready);

        // The terminal notification for that session lands in Closed.
        factory.on_connection_lost("close requested by client");
        assert_eq!(factory.state(), FactoryState::Closed);
        assert!(factory.current().is_none());
    }
}
