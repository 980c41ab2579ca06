use chrono::{DateTime, Local, TimeZone};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Characters a code is drawn from.
pub const CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const CODE_LEN: usize = 10;

/// `yyyy-MM-dd HH:mm:ss.SSS`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// `len` characters drawn uniformly, with replacement, from `CODE_ALPHABET`.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// One tick's message. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub timestamp: String,
    pub message: String,
}

impl Payload {
    /// Local wall-clock time plus a fresh code of `code_len` characters.
    pub fn now<R: Rng + ?Sized>(rng: &mut R, code_len: usize) -> Self {
        Self::at(&Local::now(), rng, code_len)
    }

    pub fn at<Tz: TimeZone, R: Rng + ?Sized>(at: &DateTime<Tz>, rng: &mut R, code_len: usize) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self { timestamp: format_timestamp(at), message: generate_code(rng, code_len) }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
