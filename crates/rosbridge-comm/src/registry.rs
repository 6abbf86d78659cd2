//! Capability interfaces for the handler registry consumed by `Connection`.
//!
//! The registry is owned and populated by the client component; this layer
//! only reads from it.

use std::collections::HashMap;

use crate::message::Message;

/// Error type handlers may raise. It propagates unchanged to whatever
/// delivered the frame.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A callback bound to one rosbridge operation.
pub trait OpHandler: Send + Sync {
    fn handle(&self, message: Message) -> Result<(), BoxError>;
}

impl<F> OpHandler for F
where
    F: Fn(Message) -> Result<(), BoxError> + Send + Sync,
{
    fn handle(&self, message: Message) -> Result<(), BoxError> {
        self(message)
    }
}

/// Read-only lookup from operation name to handler.
pub trait HandlerRegistry: Send + Sync {
    fn lookup(&self, op: &str) -> Option<&dyn OpHandler>;
}

/// Plain map-backed registry for the owning client component to populate.
#[derive(Default)]
pub struct OpHandlerMap {
    handlers: HashMap<String, Box<dyn OpHandler>>,
}

impl OpHandlerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `op`, replacing any previous registration.
    pub fn register(&mut self, op: impl Into<String>, handler: impl OpHandler + 'static) {
        self.handlers.insert(op.into(), Box::new(handler));
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }
}

impl HandlerRegistry for OpHandlerMap {
    fn lookup(&self, op: &str) -> Option<&dyn OpHandler> {
        self.handlers.get(op).map(|h| h.as_ref())
    }
}
