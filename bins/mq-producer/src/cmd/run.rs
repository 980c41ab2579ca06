use std::sync::Arc;

use broker_memory::MemoryBroker;
use broker_tcp::TcpBroker;
use mq_api::QueueClient;
use publisher::{Producer, Sink};

use super::config::{BrokerKind, Effective};
use super::error::AppError;

/// The broker client shared by every sink. For the memory backend a clone is
/// kept so delivered messages can be reported on exit.
pub struct Backend {
    pub client: Arc<dyn QueueClient>,
    pub memory: Option<MemoryBroker>,
}

impl Backend {
    pub fn new(eff: &Effective) -> Self {
        match eff.broker {
            BrokerKind::Tcp => Self { client: Arc::new(TcpBroker::new(&eff.tcp)), memory: None },
            BrokerKind::Memory => {
                let broker = MemoryBroker::new();
                Self { client: Arc::new(broker.clone()), memory: Some(broker) }
            }
        }
    }
}

pub async fn run(eff: &Effective) -> Result<(), AppError> {
    run_with(eff, Backend::new(eff)).await.map(|_| ())
}

/// Run the producer until the tick limit or Ctrl+C. Returns the ticks run.
pub async fn run_with(eff: &Effective, backend: Backend) -> Result<u64, AppError> {
    let sinks: Vec<Sink> = eff
        .destinations
        .iter()
        .map(|d| Sink::new(d.clone(), backend.client.clone()))
        .collect();
    let producer = Producer::new(sinks, eff.seed)?.with_code_len(eff.code_len);

    println!("MQ Producer");
    for d in &eff.destinations {
        println!("  sink    : {} -> {} on {} via {} at {}", d.label(), d.queue, d.queue_manager, d.channel, d.conn_name);
    }
    println!("  broker  : {:?}", eff.broker);
    println!("  interval: {} ms", eff.interval.as_millis());
    match eff.ticks {
        Some(n) => println!("  ticks   : {n}"),
        None => println!("Sending... (Ctrl+C to stop)"),
    }
    println!();

    let scheduler = producer.start(eff.schedule());
    let token = scheduler.token();
    let signal = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupted, stopping after the current tick");
                token.cancel();
            }
            Err(e) => tracing::error!(error = %e, "cannot listen for Ctrl+C"),
        }
    });

    let ticks = scheduler.join().await;
    signal.abort();

    match &backend.memory {
        Some(broker) => tracing::info!(ticks, delivered = broker.delivered(), "stopped"),
        None => tracing::info!(ticks, "stopped"),
    }
    Ok(ticks)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use broker_tcp::TcpBrokerConfig;

    use super::*;
    use crate::cmd::config::default_destinations;

    fn effective(ticks: u64) -> Effective {
        Effective {
            interval: Duration::from_secs(10),
            ticks: Some(ticks),
            seed: Some(5),
            code_len: 10,
            broker: BrokerKind::Memory,
            tcp: TcpBrokerConfig::default(),
            destinations: default_destinations(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn memory_backend_delivers_to_every_destination() {
        let eff = effective(2);
        let backend = Backend::new(&eff);
        let broker = backend.memory.clone().unwrap();

        let ticks = run_with(&eff, backend).await.unwrap();

        assert_eq!(ticks, 2);
        assert_eq!(broker.messages("QMSEFAZ", "FILA1").len(), 2);
        assert_eq!(broker.messages("QMSERPRO", "FILA1").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_destination_list_is_an_error() {
        let mut eff = effective(1);
        eff.destinations.clear();
        let err = run_with(&eff, Backend::new(&eff)).await.unwrap_err();
        assert!(matches!(err, AppError::Producer(_)));
    }
}
