use crate::error::TransportError;
use crate::types::{CloseInfo, Frame};
use async_trait::async_trait;

/// Represents an abstract transport mechanism delivering discrete frames
/// over a network connection.
///
/// Implementations handle the specifics of protocols like WebSockets.
#[async_trait]
pub trait Transport: Send + Unpin {
    /// Establishes the connection based on parameters provided during creation.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Closes the connection gracefully.
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Sends a pre-serialized payload as a single, uncompressed, unfragmented
    /// text frame.
    async fn send(&mut self, message: &str) -> Result<(), TransportError>;

    /// Waits for and returns the next data frame.
    ///
    /// # Returns
    /// * `Some(Ok(Frame))` - Successfully received a text or binary frame.
    /// * `Some(Err(TransportError))` - An error occurred while receiving.
    /// * `None` - The connection was closed by the remote end.
    async fn receive(&mut self) -> Option<Result<Frame, TransportError>>;

    /// Details of the close handshake, if a close frame was observed.
    fn close_info(&self) -> Option<CloseInfo>;
}
