//! Broker client capability consumed by the producer.
//!
//! The queuing transport is owned by the broker client; this crate only
//! names the narrow connect → open → put → close → disconnect sequence the
//! publisher drives. Adapters live under `plugins/broker/`.

use std::time::Duration;

pub mod destination;
pub mod error;

pub use destination::{ConnName, Destination};
pub use error::{BrokerError, ErrorKind};

// ════════════════════════════════════════════════════════════════
//  Messages
// ════════════════════════════════════════════════════════════════

/// A single text message handed to `QueueHandle::put`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    body: String,
}

impl Message {
    /// Text message, body encoded as UTF-8.
    pub fn text(body: &str) -> Self {
        Self { body: body.to_string() }
    }

    pub fn body(&self) -> &[u8] {
        self.body.as_bytes()
    }

    pub fn as_text(&self) -> &str {
        &self.body
    }
}

/// Put options. `Default` leaves every field unset, deferring to whatever
/// the broker applies for a plain put.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    pub persistent: Option<bool>,
    pub expiry: Option<Duration>,
    pub correlation_id: Option<Vec<u8>>,
}

/// Access mode requested when opening a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Write-only: puts allowed, gets rejected.
    Output,
    /// Read-only.
    Input,
}

impl std::fmt::Display for OpenMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpenMode::Output => f.write_str("output"),
            OpenMode::Input => f.write_str("input"),
        }
    }
}

/// Transport configuration used to reach a queue manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub channel: String,
    pub host: String,
    pub port: u16,
}

// ════════════════════════════════════════════════════════════════
//  Broker client traits
// ════════════════════════════════════════════════════════════════

/// Entry point of a broker client: opens connections to queue managers.
///
/// All calls are blocking.
pub trait QueueClient: Send + Sync {
    fn connect(
        &self,
        queue_manager: &str,
        channel: &ChannelConfig,
    ) -> Result<Box<dyn QueueConnection>, BrokerError>;
}

/// A live connection to one queue manager.
pub trait QueueConnection: Send {
    fn open(&mut self, queue: &str, mode: OpenMode) -> Result<Box<dyn QueueHandle>, BrokerError>;

    /// Release the connection. Consumes the handle, so it cannot be released twice.
    fn disconnect(self: Box<Self>) -> Result<(), BrokerError>;
}

/// An open queue.
pub trait QueueHandle: Send {
    fn put(&mut self, message: &Message, options: &PutOptions) -> Result<(), BrokerError>;

    fn close(self: Box<Self>) -> Result<(), BrokerError>;
}
