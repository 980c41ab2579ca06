use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use mq_api::{Destination, QueueClient};

use crate::payload::{CODE_LEN, Payload};
use crate::publisher::{SendOutcome, send};
use crate::scheduler::{Schedule, Scheduler};

#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    #[error("no destinations configured")]
    NoDestinations,

    #[error("payload encoding: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A destination and the broker client used to reach it.
#[derive(Clone)]
pub struct Sink {
    pub destination: Destination,
    pub client: Arc<dyn QueueClient>,
}

impl Sink {
    pub fn new(destination: Destination, client: Arc<dyn QueueClient>) -> Self {
        Self { destination, client }
    }
}

/// Per-tick fan-out: one payload, sent to every sink in order.
///
/// Owns the random source for the codes; ticks run on a single context so
/// no locking is involved.
pub struct Producer {
    sinks: Vec<Sink>,
    rng: StdRng,
    code_len: usize,
}

impl Producer {
    /// `seed = None` seeds the code generator from OS entropy.
    pub fn new(sinks: Vec<Sink>, seed: Option<u64>) -> Result<Self, ProducerError> {
        if sinks.is_empty() {
            return Err(ProducerError::NoDestinations);
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self { sinks, rng, code_len: CODE_LEN })
    }

    pub fn with_code_len(mut self, code_len: usize) -> Self {
        self.code_len = code_len;
        self
    }

    /// Build one payload and send it to every sink, sequentially. A failing
    /// sink never stops the ones after it; every outcome is logged here and
    /// returned in sink order.
    pub fn tick(&mut self) -> Result<Vec<SendOutcome>, ProducerError> {
        let payload = Payload::now(&mut self.rng, self.code_len);
        let text = payload.to_json()?;
        tracing::debug!(payload = %text, "payload built");

        let outcomes: Vec<SendOutcome> = self
            .sinks
            .iter()
            .map(|sink| {
                let outcome = send(sink.client.as_ref(), &sink.destination, &text);
                outcome.log();
                outcome
            })
            .collect();

        Ok(outcomes)
    }

    /// Hand the producer to a scheduler that ticks it on `schedule`.
    pub fn start(mut self, schedule: Schedule) -> Scheduler {
        let mut tick = 0u64;
        Scheduler::start(schedule, move || {
            tick += 1;
            match self.tick() {
                Ok(outcomes) => {
                    let delivered = outcomes.iter().filter(|o| o.delivered()).count();
                    tracing::info!(tick, delivered, failed = outcomes.len() - delivered, "tick complete");
                }
                Err(e) => tracing::error!(tick, error = %e, "tick failed"),
            }
        })
    }
}
