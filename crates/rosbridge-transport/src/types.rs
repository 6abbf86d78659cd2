use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters required to establish a connection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectParams {
    /// The full URL of the rosbridge endpoint (e.g., "ws://127.0.0.1:9090").
    /// The scheme determines the transport type.
    pub url: String,

    /// Connection timeout. Applied during the initial connection attempt.
    #[serde(with = "serde_duration_ms", default = "default_connect_timeout")]
    pub connection_timeout: Duration,

    /// Options specific to WebSocket connections.
    #[cfg(feature = "websocket")]
    #[serde(default)]
    pub ws_options: WebSocketConnectOptions,
}

impl ConnectParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connection_timeout: default_connect_timeout(),
            #[cfg(feature = "websocket")]
            ws_options: WebSocketConnectOptions::default(),
        }
    }
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(20)
}

/// Options specific to WebSocket connections.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[cfg(feature = "websocket")]
#[serde(default)]
pub struct WebSocketConnectOptions {
    pub max_message_size: Option<usize>,
    pub max_frame_size: Option<usize>,
    pub accept_unmasked_frames: bool,
}

/// One discrete unit of data delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    pub fn is_binary(&self) -> bool {
        matches!(self, Frame::Binary(_))
    }

    /// The raw frame payload, regardless of kind.
    pub fn payload(&self) -> &[u8] {
        match self {
            Frame::Text(text) => text.as_bytes(),
            Frame::Binary(data) => data,
        }
    }
}

/// Details of the close handshake observed on a connection, if any.
#[derive(Debug, Clone, Default)]
pub struct CloseInfo {
    pub was_clean: bool,
    pub code: Option<u16>,
    pub reason: String,
}

// Module for serializing/deserializing Duration to/from milliseconds
pub(crate) mod serde_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_params_deserialize_with_defaults() {
        let params: ConnectParams =
            serde_json::from_str(r#"{"url":"ws://127.0.0.1:9090"}"#).expect("deserialize");
        assert_eq!(params.url, "ws://127.0.0.1:9090");
        assert_eq!(params.connection_timeout, Duration::from_secs(20));
    }

    #[test]
    fn connect_params_timeout_in_millis() {
        let params: ConnectParams =
            serde_json::from_str(r#"{"url":"ws://x","connection_timeout":1500}"#)
                .expect("deserialize");
        assert_eq!(params.connection_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn frame_payload_and_kind() {
        let text = Frame::Text("{\"op\":\"status\"}".to_string());
        assert!(!text.is_binary());
        assert_eq!(text.payload(), b"{\"op\":\"status\"}");

        let binary = Frame::Binary(vec![0xde, 0xad]);
        assert!(binary.is_binary());
        assert_eq!(binary.payload(), &[0xde, 0xad]);
    }
}
