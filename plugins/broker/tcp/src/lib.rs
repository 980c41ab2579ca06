//! Broker adapter that relays the queue call sequence over TCP.
//!
//! Every call becomes one JSON control frame, prefixed with its length as a
//! big-endian `u32`. Frames are written fire-and-forget; nothing is read back.

use std::io::Write;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use mq_api::{
    BrokerError, ChannelConfig, Message, OpenMode, PutOptions,
    QueueClient, QueueConnection, QueueHandle,
};

// ═══════════════════════════════════════════════════════════════
//  Config
// ═══════════════════════════════════════════════════════════════

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_write_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
pub struct TcpBrokerConfig {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

impl Default for TcpBrokerConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Frames
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Frame {
    Connect {
        queue_manager: String,
        channel: String,
    },
    Open {
        queue: String,
        mode: String,
    },
    Put {
        queue: String,
        body: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        persistent: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expiry_ms: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        correlation_id: Option<Vec<u8>>,
    },
    Close {
        queue: String,
    },
    Disconnect {
        queue_manager: String,
    },
}

/// Length-prefix `frame` into `buf`.
pub fn encode_frame(frame: &Frame, buf: &mut Vec<u8>) -> Result<(), BrokerError> {
    let payload = serde_json::to_vec(frame)?;
    let len = u32::try_from(payload.len())
        .map_err(|_| BrokerError::format_err(format!("frame too large: {} bytes", payload.len())))?;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&payload);
    Ok(())
}

/// Split one frame off the front of `buf`. `Ok(None)` if more bytes are needed.
pub fn decode_frame(buf: &[u8]) -> Result<Option<(Frame, usize)>, BrokerError> {
    if buf.len() < 4 {
        return Ok(None);
    }
    let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    let total = 4 + len;
    if buf.len() < total {
        return Ok(None);
    }
    let frame = serde_json::from_slice(&buf[4..total])?;
    Ok(Some((frame, total)))
}

/// Expiry in whole milliseconds, saturating at `u64::MAX`.
fn expiry_ms(expiry: Duration) -> u64 {
    u64::try_from(expiry.as_millis()).unwrap_or(u64::MAX)
}

fn write_frame(stream: &mut TcpStream, frame: &Frame) -> Result<(), BrokerError> {
    let mut buf = Vec::with_capacity(256);
    encode_frame(frame, &mut buf)?;
    stream.write_all(&buf)?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════
//  TcpBroker
// ═══════════════════════════════════════════════════════════════

pub struct TcpBroker {
    connect_timeout: Duration,
    write_timeout: Duration,
}

impl TcpBroker {
    pub fn new(cfg: &TcpBrokerConfig) -> Self {
        Self {
            connect_timeout: Duration::from_millis(cfg.connect_timeout_ms),
            write_timeout: Duration::from_millis(cfg.write_timeout_ms),
        }
    }

    fn open_stream(&self, host: &str, port: u16) -> Result<TcpStream, BrokerError> {
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|e| BrokerError::connection(format!("resolve {host}:{port}: {e}")))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_write_timeout(Some(self.write_timeout))?;
                    stream.set_nodelay(true)?;
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(match last_err {
            Some(e) => BrokerError::connection(format!("TCP connect to {host}:{port}: {e}")),
            None => BrokerError::connection(format!("{host}:{port} resolved to no addresses")),
        })
    }
}

impl Default for TcpBroker {
    fn default() -> Self {
        Self::new(&TcpBrokerConfig::default())
    }
}

impl QueueClient for TcpBroker {
    fn connect(
        &self,
        queue_manager: &str,
        channel: &ChannelConfig,
    ) -> Result<Box<dyn QueueConnection>, BrokerError> {
        let mut stream = self.open_stream(&channel.host, channel.port)?;
        write_frame(
            &mut stream,
            &Frame::Connect {
                queue_manager: queue_manager.to_string(),
                channel: channel.channel.clone(),
            },
        )?;
        tracing::debug!(queue_manager, host = %channel.host, port = channel.port, "tcp broker connected");
        Ok(Box::new(TcpConnection { stream, queue_manager: queue_manager.to_string() }))
    }
}

struct TcpConnection {
    stream: TcpStream,
    queue_manager: String,
}

impl QueueConnection for TcpConnection {
    fn open(&mut self, queue: &str, mode: OpenMode) -> Result<Box<dyn QueueHandle>, BrokerError> {
        write_frame(&mut self.stream, &Frame::Open { queue: queue.to_string(), mode: mode.to_string() })?;
        let stream = self.stream.try_clone()?;
        Ok(Box::new(TcpQueue { stream, queue: queue.to_string() }))
    }

    fn disconnect(mut self: Box<Self>) -> Result<(), BrokerError> {
        write_frame(
            &mut self.stream,
            &Frame::Disconnect { queue_manager: self.queue_manager.clone() },
        )?;
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != std::io::ErrorKind::NotConnected => Err(e.into()),
            _ => Ok(()),
        }
    }
}

struct TcpQueue {
    stream: TcpStream,
    queue: String,
}

impl QueueHandle for TcpQueue {
    fn put(&mut self, message: &Message, options: &PutOptions) -> Result<(), BrokerError> {
        let body = message.as_text().to_string();
        write_frame(
            &mut self.stream,
            &Frame::Put {
                queue: self.queue.clone(),
                body,
                persistent: options.persistent,
                expiry_ms: options.expiry.map(expiry_ms),
                correlation_id: options.correlation_id.clone(),
            },
        )
    }

    fn close(mut self: Box<Self>) -> Result<(), BrokerError> {
        write_frame(&mut self.stream, &Frame::Close { queue: self.queue.clone() })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::net::TcpListener;
    use std::thread;

    use mq_api::ErrorKind;

    use super::*;

    fn channel(port: u16) -> ChannelConfig {
        ChannelConfig { channel: "ADMIN.CHL".into(), host: "127.0.0.1".into(), port }
    }

    fn read_all_frames(mut stream: TcpStream) -> Vec<Frame> {
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).unwrap();
        let mut frames = Vec::new();
        let mut pos = 0;
        while let Some((frame, used)) = decode_frame(&raw[pos..]).unwrap() {
            frames.push(frame);
            pos += used;
        }
        assert_eq!(pos, raw.len(), "trailing partial frame");
        frames
    }

    #[test]
    fn relays_full_sequence() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            read_all_frames(stream)
        });

        let broker = TcpBroker::default();
        let mut conn = broker.connect("QMSEFAZ", &channel(port)).unwrap();
        let mut queue = conn.open("FILA1", OpenMode::Output).unwrap();
        queue.put(&Message::text(r#"{"message":"ABC"}"#), &PutOptions::default()).unwrap();
        queue.close().unwrap();
        conn.disconnect().unwrap();

        let frames = server.join().unwrap();
        assert_eq!(
            frames,
            vec![
                Frame::Connect { queue_manager: "QMSEFAZ".into(), channel: "ADMIN.CHL".into() },
                Frame::Open { queue: "FILA1".into(), mode: "output".into() },
                Frame::Put {
                    queue: "FILA1".into(),
                    body: r#"{"message":"ABC"}"#.into(),
                    persistent: None,
                    expiry_ms: None,
                    correlation_id: None,
                },
                Frame::Close { queue: "FILA1".into() },
                Frame::Disconnect { queue_manager: "QMSEFAZ".into() },
            ]
        );
    }

    #[test]
    fn refused_connection_is_a_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let broker = TcpBroker::new(&TcpBrokerConfig { connect_timeout_ms: 500, write_timeout_ms: 500 });
        let err = broker.connect("QM1", &channel(port)).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[test]
    fn decode_waits_for_complete_frame() {
        let mut buf = Vec::new();
        encode_frame(&Frame::Close { queue: "Q".into() }, &mut buf).unwrap();
        assert!(decode_frame(&buf[..3]).unwrap().is_none());
        assert!(decode_frame(&buf[..buf.len() - 1]).unwrap().is_none());
        let (frame, used) = decode_frame(&buf).unwrap().unwrap();
        assert_eq!(frame, Frame::Close { queue: "Q".into() });
        assert_eq!(used, buf.len());
    }

    #[test]
    fn expiry_saturates_instead_of_wrapping() {
        assert_eq!(expiry_ms(Duration::from_millis(1500)), 1500);
        assert_eq!(expiry_ms(Duration::from_secs(u64::MAX)), u64::MAX);
        assert_eq!(expiry_ms(Duration::MAX), u64::MAX);
    }

    #[test]
    fn put_frame_uses_op_tag() {
        let mut buf = Vec::new();
        encode_frame(&Frame::Open { queue: "FILA1".into(), mode: "output".into() }, &mut buf).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buf[4..]).unwrap();
        assert_eq!(json["op"], "open");
        assert_eq!(json["queue"], "FILA1");
    }
}
