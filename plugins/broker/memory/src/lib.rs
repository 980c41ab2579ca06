use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mq_api::{
    BrokerError, ChannelConfig, Message, OpenMode, PutOptions,
    QueueClient, QueueConnection, QueueHandle,
};

// ═══════════════════════════════════════════════════════════════
//  Call journal
// ═══════════════════════════════════════════════════════════════

/// One step of the connect → open → put → close → disconnect sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Connect,
    Open,
    Put,
    Close,
    Disconnect,
}

/// A call made against the broker, recorded whether it succeeded or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect { queue_manager: String, channel: String, host: String, port: u16 },
    Open { queue_manager: String, queue: String, mode: OpenMode },
    Put { queue_manager: String, queue: String, body: Vec<u8> },
    Close { queue_manager: String, queue: String },
    Disconnect { queue_manager: String },
}

impl Call {
    pub fn step(&self) -> Step {
        match self {
            Call::Connect { .. } => Step::Connect,
            Call::Open { .. } => Step::Open,
            Call::Put { .. } => Step::Put,
            Call::Close { .. } => Step::Close,
            Call::Disconnect { .. } => Step::Disconnect,
        }
    }
}

pub const DEFAULT_MAX_CALLS: usize = 100_000;

pub const DEFAULT_MAX_MESSAGES: usize = 100_000;

struct State {
    calls: VecDeque<Call>,
    queues: HashMap<(String, String), VecDeque<Message>>,
    failures: HashMap<Step, BrokerError>,
    delivered: u64,
    max_calls: usize,
    max_messages: usize,
}

impl State {
    /// Record the call, then fail it if a failure is injected for its step.
    /// The oldest call is dropped once the journal is full.
    fn record(&mut self, call: Call) -> Result<(), BrokerError> {
        let step = call.step();
        if self.calls.len() >= self.max_calls {
            self.calls.pop_front();
        }
        self.calls.push_back(call);
        match self.failures.get(&step) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemoryBroker
// ═══════════════════════════════════════════════════════════════

/// In-process broker. Keeps every delivered message per
/// (queue manager, queue) and a journal of every call attempted.
///
/// The journal and each queue are ring buffers, so an unbounded run keeps
/// only the most recent entries. Clones share state, so a test can keep one
/// clone for assertions while the publisher owns another.
#[derive(Clone)]
pub struct MemoryBroker {
    state: Arc<Mutex<State>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_CALLS, DEFAULT_MAX_MESSAGES)
    }

    /// Keep at most `max_calls` journal entries and `max_messages` per queue.
    pub fn with_limits(max_calls: usize, max_messages: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                calls: VecDeque::with_capacity(max_calls.min(1024)),
                queues: HashMap::new(),
                failures: HashMap::new(),
                delivered: 0,
                max_calls: max_calls.max(1),
                max_messages: max_messages.max(1),
            })),
        }
    }

    /// Fail every subsequent call of `step` with `error` until cleared.
    pub fn fail_on(&self, step: Step, error: BrokerError) {
        self.lock().failures.insert(step, error);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.iter().cloned().collect()
    }

    pub fn steps(&self) -> Vec<Step> {
        self.lock().calls.iter().map(Call::step).collect()
    }

    /// Messages retained for `queue` on `queue_manager`, oldest first.
    pub fn messages(&self, queue_manager: &str, queue: &str) -> Vec<Message> {
        self.lock()
            .queues
            .get(&(queue_manager.to_string(), queue.to_string()))
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Total messages delivered across all queues, including ones no
    /// longer retained.
    pub fn delivered(&self) -> u64 {
        self.lock().delivered
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl QueueClient for MemoryBroker {
    fn connect(
        &self,
        queue_manager: &str,
        channel: &ChannelConfig,
    ) -> Result<Box<dyn QueueConnection>, BrokerError> {
        self.lock().record(Call::Connect {
            queue_manager: queue_manager.to_string(),
            channel: channel.channel.clone(),
            host: channel.host.clone(),
            port: channel.port,
        })?;
        tracing::debug!(queue_manager, host = %channel.host, port = channel.port, "memory broker connected");
        Ok(Box::new(MemoryConnection {
            state: self.state.clone(),
            queue_manager: queue_manager.to_string(),
        }))
    }
}

struct MemoryConnection {
    state: Arc<Mutex<State>>,
    queue_manager: String,
}

impl QueueConnection for MemoryConnection {
    fn open(&mut self, queue: &str, mode: OpenMode) -> Result<Box<dyn QueueHandle>, BrokerError> {
        lock(&self.state).record(Call::Open {
            queue_manager: self.queue_manager.clone(),
            queue: queue.to_string(),
            mode,
        })?;
        Ok(Box::new(MemoryQueue {
            state: self.state.clone(),
            queue_manager: self.queue_manager.clone(),
            queue: queue.to_string(),
            mode,
        }))
    }

    fn disconnect(self: Box<Self>) -> Result<(), BrokerError> {
        lock(&self.state).record(Call::Disconnect { queue_manager: self.queue_manager.clone() })
    }
}

struct MemoryQueue {
    state: Arc<Mutex<State>>,
    queue_manager: String,
    queue: String,
    mode: OpenMode,
}

impl QueueHandle for MemoryQueue {
    fn put(&mut self, message: &Message, _options: &PutOptions) -> Result<(), BrokerError> {
        let mut state = lock(&self.state);
        state.record(Call::Put {
            queue_manager: self.queue_manager.clone(),
            queue: self.queue.clone(),
            body: message.body().to_vec(),
        })?;
        if self.mode != OpenMode::Output {
            return Err(BrokerError::operation(format!(
                "queue {} opened for {}, put not allowed",
                self.queue, self.mode
            )));
        }
        let max_messages = state.max_messages;
        let queue = state
            .queues
            .entry((self.queue_manager.clone(), self.queue.clone()))
            .or_default();
        if queue.len() >= max_messages {
            queue.pop_front();
        }
        queue.push_back(message.clone());
        state.delivered += 1;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), BrokerError> {
        lock(&self.state).record(Call::Close {
            queue_manager: self.queue_manager.clone(),
            queue: self.queue.clone(),
        })
    }
}
