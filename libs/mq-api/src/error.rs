/// Category of a broker error. Lets the caller tell a bad destination
/// apart from an unreachable broker or a rejected queue operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid destination configuration — permanent until fixed.
    Config,
    /// Broker unreachable, channel rejected, connection dropped.
    Connection,
    /// Queue operation rejected by the broker (open, put, close).
    Operation,
    /// Message or frame could not be encoded.
    Format,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Config => f.write_str("config"),
            ErrorKind::Connection => f.write_str("connection"),
            ErrorKind::Operation => f.write_str("operation"),
            ErrorKind::Format => f.write_str("format"),
        }
    }
}

/// Unified error type for all broker client methods.
///
/// Carries an `ErrorKind` for categorization and a human-readable message.
/// `From` impls assign the kind automatically so adapters can use `?`.
#[derive(Clone, PartialEq, Eq)]
pub struct BrokerError {
    kind: ErrorKind,
    message: String,
}

impl BrokerError {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self { kind, message: msg.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, msg)
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, msg)
    }

    pub fn operation(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Operation, msg)
    }

    pub fn format_err(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Format, msg)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Debug for BrokerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::fmt::Display for BrokerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for BrokerError {}

impl From<std::io::Error> for BrokerError {
    fn from(e: std::io::Error) -> Self { Self { kind: ErrorKind::Connection, message: e.to_string() } }
}

impl From<serde_json::Error> for BrokerError {
    fn from(e: serde_json::Error) -> Self { Self { kind: ErrorKind::Format, message: e.to_string() } }
}
