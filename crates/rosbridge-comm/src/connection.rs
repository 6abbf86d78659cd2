//! A single WebSocket session bound to the rosbridge protocol.

use std::sync::{Arc, Weak};

use log::{debug, info, warn};
use tokio::sync::mpsc;

use rosbridge_transport::TransportError;

use crate::error::DispatchError;
use crate::factory::ConnectionFactory;
use crate::message::Message;
use crate::registry::HandlerRegistry;

/// Outbound requests queued for the transport write half.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A pre-serialized payload, sent as one uncompressed, unfragmented
    /// text frame.
    Message(String),
    /// Initiate the clean close handshake.
    Close,
}

/// One live WebSocket session.
///
/// Created by the factory once the transport handshake completes, dropped
/// when the session ends. The factory tracks at most one live connection at
/// a time; the session driver owns the transport itself and feeds frames in
/// via [`Connection::on_frame_received`].
pub struct Connection {
    factory: Weak<ConnectionFactory>,
    registry: Arc<dyn HandlerRegistry>,
    outgoing: mpsc::Sender<Outbound>,
}

impl Connection {
    pub(crate) fn new(
        factory: Weak<ConnectionFactory>,
        registry: Arc<dyn HandlerRegistry>,
        outgoing: mpsc::Sender<Outbound>,
    ) -> Self {
        Self {
            factory,
            registry,
            outgoing,
        }
    }

    /// The transport handshake finished; report this session to the factory
    /// as the live connection.
    pub fn on_handshake_complete(self: &Arc<Self>, peer: &str) {
        debug!("Server connected: {}", peer);
        info!("Connection to rosbridge server ready.");
        match self.factory.upgrade() {
            Some(factory) => factory.mark_ready(Arc::clone(self)),
            None => warn!("Connection became ready but its factory is gone."),
        }
    }

    /// Decodes one inbound frame and dispatches it to its operation handler.
    ///
    /// Handler errors propagate to the caller untouched; nothing here retries
    /// or swallows a failed frame.
    pub fn on_frame_received(
        &self,
        payload: &[u8],
        is_binary: bool,
    ) -> Result<(), DispatchError> {
        if is_binary {
            return Err(DispatchError::UnsupportedFrameKind);
        }

        let text = std::str::from_utf8(payload)
            .map_err(|e| DispatchError::MalformedMessage(format!("invalid UTF-8: {}", e)))?;
        let message: Message = serde_json::from_str(text)
            .map_err(|e| DispatchError::MalformedMessage(format!("invalid JSON object: {}", e)))?;
        let op = message
            .op()
            .ok_or_else(|| DispatchError::MalformedMessage("missing string \"op\" field".into()))?
            .to_owned();

        let handler = self
            .registry
            .lookup(&op)
            .ok_or_else(|| DispatchError::UnhandledOperation(op.clone()))?;

        handler
            .handle(message)
            .map_err(|source| DispatchError::Handler { op, source })
    }

    /// Closure notification. Session teardown itself is the factory's job.
    pub fn on_connection_closed(&self, was_clean: bool, code: Option<u16>, reason: &str) {
        info!(
            "WebSocket connection closed (clean: {}, code: {:?}): {}",
            was_clean, code, reason
        );
    }

    /// Queues a payload for delivery as a single text frame.
    ///
    /// `Ok` means the transport buffer accepted the payload, not that the
    /// peer received it.
    pub fn send(&self, payload: String) -> Result<(), TransportError> {
        self.outgoing
            .try_send(Outbound::Message(payload))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    TransportError::SendFailed("transport buffer full".into())
                }
                mpsc::error::TrySendError::Closed(_) => {
                    TransportError::NotConnected("session write half closed".into())
                }
            })
    }

    /// Requests a clean close handshake. Fire-and-forget; the actual closure
    /// is observed later via [`Connection::on_connection_closed`].
    pub fn request_close(&self) {
        if self.outgoing.try_send(Outbound::Close).is_err() {
            warn!("Close requested but the session write half is already gone.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{BoxError, OpHandlerMap};
    use std::sync::Mutex;

    fn recording_registry() -> (Arc<OpHandlerMap>, Arc<Mutex<Vec<Message>>>) {
        let received: Arc<Mutex<Vec<Message>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let mut registry = OpHandlerMap::new();
        registry.register("publish", move |msg: Message| -> Result<(), BoxError> {
            sink.lock().unwrap().push(msg);
            Ok(())
        });
        (Arc::new(registry), received)
    }

    fn connection_with(
        registry: Arc<dyn HandlerRegistry>,
    ) -> (Arc<Connection>, mpsc::Receiver<Outbound>) {
        let factory = ConnectionFactory::new();
        factory.build_connection(registry)
    }

    #[test]
    fn dispatches_to_registered_handler_exactly_once() {
        let (registry, received) = recording_registry();
        let (conn, _rx) = connection_with(registry);

        let payload = br#"{"op":"publish","topic":"/x"}"#;
        conn.on_frame_received(payload, false).expect("dispatch");

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        let expected: Message =
            serde_json::from_str(r#"{"op":"publish","topic":"/x"}"#).expect("parse");
        assert_eq!(received[0], expected);
    }

    #[test]
    fn unknown_operation_fails_and_invokes_nothing() {
        let (registry, received) = recording_registry();
        let (conn, _rx) = connection_with(registry);

        let err = conn
            .on_frame_received(br#"{"op":"status"}"#, false)
            .expect_err("no handler for status");
        assert!(matches!(err, DispatchError::UnhandledOperation(op) if op == "status"));
        assert!(received.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_registry_rejects_every_operation() {
        let (conn, _rx) = connection_with(Arc::new(OpHandlerMap::new()));

        let err = conn
            .on_frame_received(br#"{"op":"status"}"#, false)
            .expect_err("empty registry");
        assert!(matches!(err, DispatchError::UnhandledOperation(op) if op == "status"));
    }

    #[test]
    fn binary_frames_are_rejected_regardless_of_content() {
        let (registry, received) = recording_registry();
        let (conn, _rx) = connection_with(registry);

        // Even a payload that would decode fine as text is refused as binary.
        let err = conn
            .on_frame_received(br#"{"op":"publish","topic":"/x"}"#, true)
            .expect_err("binary frame");
        assert!(matches!(err, DispatchError::UnsupportedFrameKind));
        assert!(received.lock().unwrap().is_empty());
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        let (registry, _received) = recording_registry();
        let (conn, _rx) = connection_with(registry);

        for payload in [
            &b"not json"[..],
            &b"[1,2,3]"[..],
            &b"\xff\xfe"[..],
            &br#"{"topic":"/x"}"#[..],
            &br#"{"op":42}"#[..],
        ] {
            let err = conn
                .on_frame_received(payload, false)
                .expect_err("malformed payload");
            assert!(
                matches!(err, DispatchError::MalformedMessage(_)),
                "unexpected error for {:?}: {}",
                payload,
                err
            );
        }
    }

    #[test]
    fn handler_errors_propagate_to_the_caller() {
        let mut registry = OpHandlerMap::new();
        registry.register("echo", |_msg: Message| -> Result<(), BoxError> {
            Err("echo backend down".into())
        });
        let (conn, _rx) = connection_with(Arc::new(registry));

        let err = conn
            .on_frame_received(br#"{"op":"echo"}"#, false)
            .expect_err("handler failure");
        match err {
            DispatchError::Handler { op, source } => {
                assert_eq!(op, "echo");
                assert_eq!(source.to_string(), "echo backend down");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn send_queues_payload_for_the_transport() {
        let (registry, _received) = recording_registry();
        let (conn, mut rx) = connection_with(registry);

        conn.send(r#"{"op":"subscribe","topic":"/chatter"}"#.to_string())
            .expect("send accepted");
        assert_eq!(
            rx.try_recv().expect("queued payload"),
            Outbound::Message(r#"{"op":"subscribe","topic":"/chatter"}"#.to_string())
        );
    }

    #[test]
    fn send_fails_once_the_session_is_gone() {
        let (registry, _received) = recording_registry();
        let (conn, rx) = connection_with(registry);
        drop(rx);

        let err = conn
            .send(r#"{"op":"subscribe"}"#.to_string())
            .expect_err("write half gone");
        assert!(matches!(err, TransportError::NotConnected(_)));
    }

    #[test]
    fn request_close_enqueues_a_close_request() {
        let (registry, _received) = recording_registry();
        let (conn, mut rx) = connection_with(registry);

        conn.request_close();
        assert_eq!(rx.try_recv().expect("queued close"), Outbound::Close);
    }

    #[test]
    fn handshake_complete_reports_ready_to_the_factory() {
        let (registry, _received) = recording_registry();
        let factory = ConnectionFactory::new();
        let (conn, _rx) = factory.build_connection(registry);

        conn.on_handshake_complete("ws://127.0.0.1:9090");

        assert_eq!(factory.state(), crate::factory::FactoryState::Ready);
        let live = factory.current().expect("live connection");
        assert!(Arc::ptr_eq(&live, &conn));
    }
}
