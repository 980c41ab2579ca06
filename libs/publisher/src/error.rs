use mq_api::{BrokerError, ErrorKind};

/// Failure of one step of a send, tagged with the step that failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PublishError {
    #[error("bad conn name '{conn_name}': {source}")]
    ConnName { conn_name: String, source: BrokerError },

    #[error("connect to {queue_manager}: {source}")]
    Connect { queue_manager: String, source: BrokerError },

    #[error("open queue {queue}: {source}")]
    Open { queue: String, source: BrokerError },

    #[error("put to {queue}: {source}")]
    Put { queue: String, source: BrokerError },

    #[error("close queue {queue}: {source}")]
    Close { queue: String, source: BrokerError },

    #[error("disconnect from {queue_manager}: {source}")]
    Disconnect { queue_manager: String, source: BrokerError },
}

impl PublishError {
    /// The underlying broker error.
    pub fn broker_error(&self) -> &BrokerError {
        match self {
            PublishError::ConnName { source, .. }
            | PublishError::Connect { source, .. }
            | PublishError::Open { source, .. }
            | PublishError::Put { source, .. }
            | PublishError::Close { source, .. }
            | PublishError::Disconnect { source, .. } => source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.broker_error().kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_step() {
        let e = PublishError::Put { queue: "FILA1".into(), source: BrokerError::operation("queue full") };
        assert_eq!(e.to_string(), "put to FILA1: queue full");
        assert_eq!(e.kind(), ErrorKind::Operation);

        let e = PublishError::Disconnect {
            queue_manager: "QMSEFAZ".into(),
            source: BrokerError::connection("reset"),
        };
        assert_eq!(e.to_string(), "disconnect from QMSEFAZ: reset");
        assert_eq!(e.kind(), ErrorKind::Connection);
    }
}
