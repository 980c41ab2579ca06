use std::time::Duration;

use clap::{Args, ValueEnum};
use serde::Deserialize;

use broker_tcp::TcpBrokerConfig;
use mq_api::Destination;
use publisher::Schedule;
use publisher::payload::CODE_LEN;

use super::error::AppError;

pub const DEFAULT_INTERVAL_MS: u64 = 10_000;

/// Destinations used when the config file names none.
pub fn default_destinations() -> Vec<Destination> {
    vec![
        Destination::new("QMSEFAZ", "ADMIN.CHL", "localhost(1414)", "FILA1"),
        Destination::new("QMSERPRO", "ADMIN.CHL", "localhost(1515)", "FILA1"),
    ]
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BrokerKind {
    /// Relay the queue calls over TCP to a broker gateway.
    #[default]
    Tcp,
    /// Keep messages in process (dry run).
    Memory,
}

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub interval_ms: Option<u64>,
    pub ticks: Option<u64>,
    pub seed: Option<u64>,
    pub code_len: Option<usize>,
    pub broker: Option<BrokerKind>,
    pub tcp: Option<TcpBrokerConfig>,
    #[serde(default)]
    pub destinations: Vec<Destination>,
}

pub fn load_config(path: &str) -> Result<Config, AppError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| AppError::Config(format!("cannot read config {path}: {e}")))?;
    toml::from_str(&content).map_err(|e| AppError::Config(format!("bad config {path}: {e}")))
}

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Args, Clone, Debug)]
pub struct ProducerArgs {
    /// Path to the TOML config. Ignored when the file does not exist.
    #[arg(long, default_value = "mq-producer.toml", env = "MQ_PRODUCER_CONFIG")]
    pub config: String,

    /// Milliseconds between ticks
    #[arg(long, env = "MQ_PRODUCER_INTERVAL_MS")]
    pub interval_ms: Option<u64>,

    /// Stop after this many ticks (default: run until Ctrl+C)
    #[arg(long)]
    pub ticks: Option<u64>,

    /// Seed for the code generator (default: OS entropy)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Broker backend
    #[arg(long, value_enum, env = "MQ_PRODUCER_BROKER")]
    pub broker: Option<BrokerKind>,
}

// ═══════════════════════════════════════════════════════════════
//  Effective — merged config
// ═══════════════════════════════════════════════════════════════

/// Final configuration: built-in defaults < config file < env/CLI.
#[derive(Debug)]
pub struct Effective {
    pub interval: Duration,
    pub ticks: Option<u64>,
    pub seed: Option<u64>,
    pub code_len: usize,
    pub broker: BrokerKind,
    pub tcp: TcpBrokerConfig,
    pub destinations: Vec<Destination>,
}

impl Effective {
    pub fn new(args: &ProducerArgs) -> Result<Self, AppError> {
        let cfg = match load_config(&args.config) {
            Ok(c) => c,
            Err(e) => {
                if std::path::Path::new(&args.config).exists() {
                    return Err(e);
                }
                Config::default()
            }
        };

        let interval_ms = args.interval_ms.or(cfg.interval_ms).unwrap_or(DEFAULT_INTERVAL_MS);
        if interval_ms == 0 {
            return Err(AppError::Config("interval_ms must be greater than 0".into()));
        }
        let code_len = cfg.code_len.unwrap_or(CODE_LEN);
        if code_len == 0 {
            return Err(AppError::Config("code_len must be greater than 0".into()));
        }

        let mut destinations = if cfg.destinations.is_empty() {
            default_destinations()
        } else {
            cfg.destinations
        };
        for d in &mut destinations {
            if d.queue_manager.is_empty() || d.queue.is_empty() {
                return Err(AppError::Config(format!(
                    "destination '{}' needs both queue_manager and queue",
                    d.label()
                )));
            }
            if d.name.is_empty() {
                d.name = d.queue_manager.clone();
            }
        }

        Ok(Self {
            interval: Duration::from_millis(interval_ms),
            ticks: args.ticks.or(cfg.ticks),
            seed: args.seed.or(cfg.seed),
            code_len,
            broker: args.broker.or(cfg.broker).unwrap_or_default(),
            tcp: cfg.tcp.unwrap_or_default(),
            destinations,
        })
    }

    pub fn schedule(&self) -> Schedule {
        let schedule = Schedule::every(self.interval);
        match self.ticks {
            Some(n) => schedule.limit(n),
            None => schedule,
        }
    }
}
