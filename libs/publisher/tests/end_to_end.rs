use std::sync::Arc;
use std::time::Duration;

use broker_memory::{MemoryBroker, Step};
use chrono::NaiveDateTime;
use mq_api::{BrokerError, ChannelConfig, Destination, QueueClient, QueueConnection};
use publisher::payload::{CODE_ALPHABET, TIMESTAMP_FORMAT};
use publisher::{Producer, Schedule, Sink};

/// Broker whose connect blocks the calling thread before delegating.
struct SlowConnect {
    inner: MemoryBroker,
    delay: Duration,
}

impl QueueClient for SlowConnect {
    fn connect(
        &self,
        queue_manager: &str,
        channel: &ChannelConfig,
    ) -> Result<Box<dyn QueueConnection>, BrokerError> {
        std::thread::sleep(self.delay);
        self.inner.connect(queue_manager, channel)
    }
}

const SEQUENCE: [Step; 5] = [Step::Connect, Step::Open, Step::Put, Step::Close, Step::Disconnect];

fn two_sinks(sefaz: &MemoryBroker, serpro: &MemoryBroker) -> Vec<Sink> {
    vec![
        Sink::new(
            Destination::new("QMSEFAZ", "ADMIN.CHL", "localhost(1414)", "FILA1"),
            Arc::new(sefaz.clone()),
        ),
        Sink::new(
            Destination::new("QMSERPRO", "ADMIN.CHL", "localhost(1515)", "FILA1"),
            Arc::new(serpro.clone()),
        ),
    ]
}

fn assert_valid_payload(body: &[u8]) {
    let value: serde_json::Value = serde_json::from_slice(body).unwrap();
    let obj = value.as_object().unwrap();
    assert_eq!(obj.len(), 2, "{value}");

    let code = obj["message"].as_str().unwrap();
    assert_eq!(code.len(), 10);
    assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)), "{code}");

    let ts = obj["timestamp"].as_str().unwrap();
    assert_eq!(ts.len(), "yyyy-MM-dd HH:mm:ss.SSS".len(), "{ts}");
    NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT).unwrap();
}

#[tokio::test(start_paused = true)]
async fn three_ticks_reach_both_destinations() {
    let sefaz = MemoryBroker::new();
    let serpro = MemoryBroker::new();
    let producer = Producer::new(two_sinks(&sefaz, &serpro), None).unwrap();

    let ticks = producer
        .start(Schedule::every(Duration::from_secs(10)).limit(3))
        .join()
        .await;
    assert_eq!(ticks, 3);

    for (broker, qm) in [(&sefaz, "QMSEFAZ"), (&serpro, "QMSERPRO")] {
        assert_eq!(broker.steps(), SEQUENCE.repeat(3), "{qm}");
        let messages = broker.messages(qm, "FILA1");
        assert_eq!(messages.len(), 3);
        for m in &messages {
            assert_valid_payload(m.body());
        }
    }

    let sefaz_bodies: Vec<_> = sefaz.messages("QMSEFAZ", "FILA1").iter().map(|m| m.body().to_vec()).collect();
    let serpro_bodies: Vec<_> = serpro.messages("QMSERPRO", "FILA1").iter().map(|m| m.body().to_vec()).collect();
    assert_eq!(sefaz_bodies, serpro_bodies);
}

#[tokio::test(start_paused = true)]
async fn unreachable_destination_fails_every_tick_without_stopping_the_other() {
    let sefaz = MemoryBroker::new();
    sefaz.fail_on(Step::Connect, BrokerError::connection("QMSEFAZ unreachable"));
    let serpro = MemoryBroker::new();
    let producer = Producer::new(two_sinks(&sefaz, &serpro), None).unwrap();

    let ticks = producer
        .start(Schedule::every(Duration::from_secs(10)).limit(3))
        .join()
        .await;

    assert_eq!(ticks, 3);
    assert_eq!(sefaz.steps(), vec![Step::Connect; 3]);
    assert_eq!(sefaz.delivered(), 0);
    assert_eq!(serpro.steps(), SEQUENCE.repeat(3));
    assert_eq!(serpro.delivered(), 3);
}

#[tokio::test(start_paused = true)]
async fn put_failure_keeps_releasing_handles_each_tick() {
    let sefaz = MemoryBroker::new();
    sefaz.fail_on(Step::Put, BrokerError::operation("queue full"));
    let serpro = MemoryBroker::new();
    let producer = Producer::new(two_sinks(&sefaz, &serpro), None).unwrap();

    producer
        .start(Schedule::every(Duration::from_secs(10)).limit(2))
        .join()
        .await;

    assert_eq!(sefaz.steps(), SEQUENCE.repeat(2));
    assert_eq!(sefaz.delivered(), 0);
    assert_eq!(serpro.delivered(), 2);
}

#[tokio::test]
async fn slow_connect_does_not_stall_other_tasks() {
    let broker = MemoryBroker::new();
    let slow = SlowConnect { inner: broker.clone(), delay: Duration::from_millis(500) };
    let sink = Sink::new(
        Destination::new("QMSEFAZ", "ADMIN.CHL", "localhost(1414)", "FILA1"),
        Arc::new(slow),
    );
    let scheduler = Producer::new(vec![sink], None)
        .unwrap()
        .start(Schedule::every(Duration::from_secs(10)).limit(1));

    let started = std::time::Instant::now();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let waited = started.elapsed();

    assert_eq!(scheduler.join().await, 1);
    assert!(waited < Duration::from_millis(250), "timer held up for {waited:?}");
    assert_eq!(broker.steps(), SEQUENCE.to_vec());
    assert_eq!(broker.delivered(), 1);
}
