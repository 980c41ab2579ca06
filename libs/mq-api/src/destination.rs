use serde::{Deserialize, Serialize};

use crate::BrokerError;

// ═══════════════════════════════════════════════════════════════
//  Destination
// ═══════════════════════════════════════════════════════════════

/// One (queue manager, channel, connection, queue) tuple messages are sent to.
///
/// `conn_name` is kept in its raw `host(port)` form and parsed on every send,
/// so a malformed value surfaces as a send failure rather than a start-up
/// error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Label used in logs. Defaults to the queue manager name.
    #[serde(default)]
    pub name: String,
    pub queue_manager: String,
    pub channel: String,
    pub conn_name: String,
    pub queue: String,
}

impl Destination {
    pub fn new(
        queue_manager: impl Into<String>,
        channel: impl Into<String>,
        conn_name: impl Into<String>,
        queue: impl Into<String>,
    ) -> Self {
        let queue_manager = queue_manager.into();
        Self {
            name: queue_manager.clone(),
            queue_manager,
            channel: channel.into(),
            conn_name: conn_name.into(),
            queue: queue.into(),
        }
    }

    /// Label for logs: `name`, or the queue manager when no name is set.
    pub fn label(&self) -> &str {
        if self.name.is_empty() { &self.queue_manager } else { &self.name }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Connection name: "host(port)"
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnName {
    pub host: String,
    pub port: u16,
}

impl ConnName {
    /// Parse `host(port)`. The host is everything before `(`, the port the
    /// digits between `(` and the closing `)` that ends the string.
    pub fn parse(s: &str) -> Result<Self, BrokerError> {
        let (host, rest) = s
            .split_once('(')
            .ok_or_else(|| BrokerError::config(format!("conn name '{s}': missing '('")))?;
        let port = rest
            .strip_suffix(')')
            .ok_or_else(|| BrokerError::config(format!("conn name '{s}': missing closing ')'")))?;

        if host.is_empty() {
            return Err(BrokerError::config(format!("conn name '{s}': empty host")));
        }
        if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BrokerError::config(format!("conn name '{s}': port '{port}' is not numeric")));
        }
        let port: u16 = port
            .parse()
            .map_err(|_| BrokerError::config(format!("conn name '{s}': port '{port}' out of range")))?;

        Ok(Self { host: host.to_string(), port })
    }
}

impl std::fmt::Display for ConnName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.host, self.port)
    }
}
