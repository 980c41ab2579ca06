pub mod error;
pub mod payload;
pub mod producer;
pub mod publisher;
pub mod scheduler;

pub use error::PublishError;
pub use payload::{Payload, generate_code};
pub use producer::{Producer, ProducerError, Sink};
pub use publisher::{SendOutcome, send};
pub use scheduler::{Schedule, Scheduler};
