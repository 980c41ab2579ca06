use mq_api::{
    ChannelConfig, ConnName, Destination, Message, OpenMode, PutOptions,
    QueueClient, QueueConnection, QueueHandle,
};

use crate::PublishError;

/// Result of one `send`: the primary outcome plus whatever went wrong while
/// releasing handles.
#[derive(Debug)]
pub struct SendOutcome {
    pub destination: String,
    pub result: Result<(), PublishError>,
    pub cleanup: Vec<PublishError>,
}

impl SendOutcome {
    pub fn delivered(&self) -> bool {
        self.result.is_ok()
    }

    /// Log the outcome: `info` on delivery, `error` on failure, `warn` per
    /// cleanup failure.
    pub fn log(&self) {
        match &self.result {
            Ok(()) => tracing::info!(destination = %self.destination, "message sent"),
            Err(e) => tracing::error!(destination = %self.destination, kind = %e.kind(), error = %e, "send failed"),
        }
        for e in &self.cleanup {
            tracing::warn!(destination = %self.destination, error = %e, "cleanup failed");
        }
    }
}

/// Send `payload` to `destination` as one text message: connect, open the
/// queue for output, put, then release the queue and the connection.
///
/// Never fails past its own boundary. Handles acquired before a failure are
/// still released, queue before connection, each exactly once.
pub fn send(client: &dyn QueueClient, destination: &Destination, payload: &str) -> SendOutcome {
    let mut conn: Option<Box<dyn QueueConnection>> = None;
    let mut queue: Option<Box<dyn QueueHandle>> = None;

    let result = deliver(client, destination, payload, &mut conn, &mut queue);

    let mut cleanup = Vec::new();
    if let Some(q) = queue.take() {
        if let Err(source) = q.close() {
            cleanup.push(PublishError::Close { queue: destination.queue.clone(), source });
        }
    }
    if let Some(c) = conn.take() {
        match c.disconnect() {
            Ok(()) => tracing::debug!(queue_manager = %destination.queue_manager, "disconnected"),
            Err(source) => cleanup.push(PublishError::Disconnect {
                queue_manager: destination.queue_manager.clone(),
                source,
            }),
        }
    }

    SendOutcome { destination: destination.label().to_string(), result, cleanup }
}

/// Acquisition and put. Each handle lands in its slot as soon as it is
/// acquired so `send` can release it whatever happens next.
fn deliver(
    client: &dyn QueueClient,
    destination: &Destination,
    payload: &str,
    conn: &mut Option<Box<dyn QueueConnection>>,
    queue: &mut Option<Box<dyn QueueHandle>>,
) -> Result<(), PublishError> {
    let addr = ConnName::parse(&destination.conn_name).map_err(|source| PublishError::ConnName {
        conn_name: destination.conn_name.clone(),
        source,
    })?;
    let channel = ChannelConfig {
        channel: destination.channel.clone(),
        host: addr.host,
        port: addr.port,
    };

    let c = conn.insert(client.connect(&destination.queue_manager, &channel).map_err(|source| {
        PublishError::Connect { queue_manager: destination.queue_manager.clone(), source }
    })?);
    tracing::debug!(queue_manager = %destination.queue_manager, "connected");

    let q = queue.insert(c.open(&destination.queue, OpenMode::Output).map_err(|source| {
        PublishError::Open { queue: destination.queue.clone(), source }
    })?);
    tracing::debug!(queue = %destination.queue, "queue opened");

    q.put(&Message::text(payload), &PutOptions::default())
        .map_err(|source| PublishError::Put { queue: destination.queue.clone(), source })
}
