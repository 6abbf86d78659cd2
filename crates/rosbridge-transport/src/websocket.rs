//! Implementation of the `Transport` trait using WebSockets (`tokio-tungstenite`).

#![cfg(feature = "websocket")]

use crate::error::TransportError;
use crate::traits::Transport;
use crate::types::{CloseInfo, ConnectParams, Frame, WebSocketConnectOptions};
use async_trait::async_trait;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use log::{debug, error, info, warn};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async_with_config,
    tungstenite::{Error as TungsteniteError, protocol::Message as TungsteniteMessage},
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, TungsteniteMessage>;
type WsSource = SplitStream<WsStream>;

/// WebSocket transport implementation.
pub struct WebSocketTransport {
    params: ConnectParams,
    sink: Option<WsSink>,
    source: Option<WsSource>,
    last_close: Option<CloseInfo>,
}

impl WebSocketTransport {
    pub fn new(params: ConnectParams) -> Self {
        Self {
            params,
            sink: None,
            source: None,
            last_close: None,
        }
    }

    fn apply_options(
        options: &WebSocketConnectOptions,
    ) -> tokio_tungstenite::tungstenite::protocol::WebSocketConfig {
        // Map our WebSocketConnectOptions to tungstenite's WebSocketConfig
        let mut config = tokio_tungstenite::tungstenite::protocol::WebSocketConfig::default();
        if options.max_message_size.is_some() {
            config.max_message_size = options.max_message_size;
        }
        if options.max_frame_size.is_some() {
            config.max_frame_size = options.max_frame_size;
        }
        config.accept_unmasked_frames = options.accept_unmasked_frames;
        config
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.sink.is_some() || self.source.is_some() {
            warn!("WebSocketTransport already connected or partially connected.");
            return Err(TransportError::ConnectionFailed("Already connected".into()));
        }

        info!("Connecting WebSocket to {}", self.params.url);
        let ws_config = Self::apply_options(&self.params.ws_options);

        let (ws_stream, response) =
            connect_async_with_config(&self.params.url, Some(ws_config), false).await?;

        debug!("WebSocket handshake successful: {}", response.status());

        let (sink, source) = ws_stream.split();
        self.sink = Some(sink);
        self.source = Some(source);
        self.last_close = None;

        info!("WebSocket connection established.");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        if let Some(mut sink) = self.sink.take() {
            info!("Disconnecting WebSocket.");
            // Attempt to send a Close frame
            match sink.send(TungsteniteMessage::Close(None)).await {
                Ok(_) => debug!("WebSocket Close frame sent."),
                Err(TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed) => {
                    debug!("WebSocket already closed while sending Close frame.")
                }
                Err(e) => {
                    warn!("Error sending WebSocket Close frame: {}. Closing anyway.", e);
                }
            }
            if let Err(e) = sink.close().await {
                // AlreadyClosed is expected if the read side closed first
                if !matches!(
                    e,
                    TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed
                ) {
                    warn!("Error closing WebSocket sink: {}", e);
                }
            }
        }

        // Drop the source stream
        self.source = None;
        Ok(())
    }

    async fn send(&mut self, message: &str) -> Result<(), TransportError> {
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| TransportError::NotConnected("WebSocket sink unavailable".into()))?;

        sink.send(TungsteniteMessage::Text(message.to_string()))
            .await?;
        Ok(())
    }

    async fn receive(&mut self) -> Option<Result<Frame, TransportError>> {
        loop {
            let next = match self.source.as_mut() {
                Some(source) => source.next().await,
                None => return None,
            };

            match next {
                Some(Ok(TungsteniteMessage::Text(text))) => return Some(Ok(Frame::Text(text))),
                Some(Ok(TungsteniteMessage::Binary(data))) => {
                    return Some(Ok(Frame::Binary(data)));
                }
                Some(Ok(TungsteniteMessage::Ping(_) | TungsteniteMessage::Pong(_))) => {
                    // Keepalive traffic; tungstenite queues the pong reply itself.
                    continue;
                }
                Some(Ok(TungsteniteMessage::Close(close_frame))) => {
                    info!("Received WebSocket Close frame: {:?}", close_frame);
                    self.last_close = Some(match close_frame {
                        Some(frame) => CloseInfo {
                            was_clean: true,
                            code: Some(u16::from(frame.code)),
                            reason: frame.reason.into_owned(),
                        },
                        None => CloseInfo {
                            was_clean: true,
                            code: None,
                            reason: String::new(),
                        },
                    });
                    return None;
                }
                Some(Ok(TungsteniteMessage::Frame(_))) => {
                    warn!("Received unexpected WebSocket raw frame, ignoring.");
                    continue;
                }
                Some(Err(
                    TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed,
                )) => {
                    info!("WebSocket connection closed while receiving.");
                    return None;
                }
                Some(Err(e)) => {
                    error!("WebSocket receive error: {}", e);
                    return Some(Err(e.into()));
                }
                None => {
                    info!("WebSocket stream ended (source returned None).");
                    return None;
                }
            }
        }
    }

    fn close_info(&self) -> Option<CloseInfo> {
        self.last_close.clone()
    }
}
