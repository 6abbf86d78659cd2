//! The reconnect session loop: drives one transport session at a time and
//! reports lifecycle events to the connection factory.

use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::{Notify, mpsc};

use rosbridge_comm::{Connection, ConnectionFactory, HandlerRegistry, Outbound};
use rosbridge_transport::{CloseInfo, ConnectParams, Transport, create_transport};

use crate::reconnect::ReconnectPolicy;

/// Runs connect attempts until shutdown is requested, delegating retry
/// timing to the injected policy.
pub(crate) async fn run(
    params: ConnectParams,
    factory: Arc<ConnectionFactory>,
    registry: Arc<dyn HandlerRegistry>,
    mut policy: Box<dyn ReconnectPolicy>,
    shutdown: Arc<Notify>,
) {
    loop {
        if factory.shutdown_requested() {
            break;
        }
        factory.on_connect_attempt_started();

        let mut transport = match create_transport(&params) {
            Ok(transport) => transport,
            Err(e) => {
                // Nothing a retry can fix (e.g. bad scheme); stop the loop.
                error!("Cannot create transport for {}: {}", params.url, e);
                factory.on_connect_failed(&e.to_string());
                factory.request_shutdown();
                break;
            }
        };

        match tokio::time::timeout(params.connection_timeout, transport.connect()).await {
            Ok(Ok(())) => {
                policy.reset();

                let (connection, outgoing_rx) = factory.build_connection(Arc::clone(&registry));
                connection.on_handshake_complete(&params.url);

                // A shutdown that raced the handshake leaves the factory
                // closed with no live reference; nothing would ever queue a
                // close for this session, so tear it down here.
                if factory.shutdown_requested() {
                    debug!("Shutdown requested during connect; closing fresh session.");
                    if let Err(e) = transport.disconnect().await {
                        warn!("Error closing session during shutdown: {}", e);
                    }
                    break;
                }

                let close = drive_session(transport.as_mut(), &connection, outgoing_rx).await;
                connection.on_connection_closed(close.was_clean, close.code, &close.reason);
                factory.on_connection_lost(&close.reason);
            }
            Ok(Err(e)) => {
                factory.on_connect_failed(&e.to_string());
            }
            Err(_) => {
                factory.on_connect_failed(&format!(
                    "connect timed out after {:?}",
                    params.connection_timeout
                ));
            }
        }

        if factory.shutdown_requested() {
            break;
        }
        let delay = policy.next_delay();
        info!("Retrying connection to {} in {:?}.", params.url, delay);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.notified() => {
                debug!("Shutdown requested during reconnect backoff.");
                break;
            }
        }
    }
    info!("Session loop finished.");
}

/// Pumps one established session until it ends, returning closure details.
///
/// Dispatch failures for individual frames are logged and do not end the
/// session; only transport-level errors or closure do.
async fn drive_session(
    transport: &mut dyn Transport,
    connection: &Arc<Connection>,
    mut outgoing_rx: mpsc::Receiver<Outbound>,
) -> CloseInfo {
    let close = loop {
        tokio::select! {
            maybe_outbound = outgoing_rx.recv() => {
                match maybe_outbound {
                    Some(Outbound::Message(payload)) => {
                        if let Err(e) = transport.send(&payload).await {
                            error!("Transport send error: {}. Ending session.", e);
                            break CloseInfo {
                                was_clean: false,
                                code: None,
                                reason: e.to_string(),
                            };
                        }
                    }
                    Some(Outbound::Close) => {
                        debug!("Clean close requested.");
                        if let Err(e) = transport.disconnect().await {
                            warn!("Error during close handshake: {}", e);
                        }
                        break transport.close_info().unwrap_or(CloseInfo {
                            was_clean: true,
                            code: None,
                            reason: "close requested by client".to_string(),
                        });
                    }
                    None => {
                        // Every sender is gone; treat it as a client-side close.
                        debug!("Outbound queue dropped, ending session.");
                        if let Err(e) = transport.disconnect().await {
                            warn!("Error during close handshake: {}", e);
                        }
                        break CloseInfo {
                            was_clean: true,
                            code: None,
                            reason: "outbound queue dropped".to_string(),
                        };
                    }
                }
            }
            received = transport.receive() => {
                match received {
                    Some(Ok(frame)) => {
                        let is_binary = frame.is_binary();
                        if let Err(e) = connection.on_frame_received(frame.payload(), is_binary) {
                            // Frame-local failure; the session stays up.
                            error!("Failed to dispatch inbound frame: {}", e);
                        }
                    }
                    Some(Err(e)) => {
                        error!("Transport receive error: {}. Ending session.", e);
                        break CloseInfo {
                            was_clean: false,
                            code: None,
                            reason: e.to_string(),
                        };
                    }
                    None => {
                        break transport.close_info().unwrap_or(CloseInfo {
                            was_clean: true,
                            code: None,
                            reason: "closed by remote".to_string(),
                        });
                    }
                }
            }
        }
    };

    // Best-effort teardown; the transport may already be gone.
    if let Err(e) = transport.disconnect().await {
        debug!("Transport disconnect after session end: {}", e);
    }
    close
}
