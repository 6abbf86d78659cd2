use thiserror::Error;

use crate::registry::BoxError;

/// Errors raised while decoding and dispatching a single inbound frame.
///
/// None of these are retried; they surface to whatever delivered the frame,
/// which is expected to log and/or escalate them.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A binary frame arrived; this layer only speaks text frames.
    #[error("binary frames are not supported")]
    UnsupportedFrameKind,

    /// The payload was not a UTF-8 JSON object carrying a string `op` field.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// The message was well-formed but names an operation nothing is
    /// registered for.
    #[error("no handler registered for operation \"{0}\"")]
    UnhandledOperation(String),

    /// The registered handler itself failed.
    #[error("handler for operation \"{op}\" failed: {source}")]
    Handler {
        op: String,
        #[source]
        source: BoxError,
    },
}
