use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bytes at the front of every payload that carry the send timestamp.
pub const TIMESTAMP_LEN: usize = 8;

pub const DEFAULT_MESSAGE_COUNT: u64 = 100_000;
pub const DEFAULT_MESSAGE_SIZE: usize = 100;
pub const DEFAULT_RATE: u64 = 10_000;
pub const DEFAULT_BUCKET_WIDTH_NS: u64 = 1_000;
pub const DEFAULT_BUCKET_COUNT: usize = 10;
pub const DEFAULT_TOPIC: &str = "aaa";

/// 30 seconds at 300k msg/s.
pub const DEFAULT_SAMPLE_CAPACITY: usize = 30 * 300_000;

/// Error types for IpcPerf operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IpcPerfError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Session is not connected")]
    NotConnected,

    #[error("Session is already connected")]
    AlreadyConnected,

    #[error("Delivery queue full, send would block")]
    WouldBlock,

    #[error("Payload of {len} bytes is shorter than the {min} byte timestamp")]
    PayloadTooShort { len: usize, min: usize },
}

/// Result type for IpcPerf operations
pub type Result<T> = std::result::Result<T, IpcPerfError>;

/// Connectivity state changes a transport reports to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventKind {
    /// The session is fully up and can send and receive.
    UpNotice,
    /// A peer session on the same bus went away.
    PeerDown,
    Reconnecting,
    DownError,
}

impl SessionEventKind {
    /// `true` for events that end a measurement run.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionEventKind::UpNotice)
    }

    pub fn as_name(&self) -> &'static str {
        match self {
            SessionEventKind::UpNotice => "UP_NOTICE",
            SessionEventKind::PeerDown => "PEER_DOWN",
            SessionEventKind::Reconnecting => "RECONNECTING",
            SessionEventKind::DownError => "DOWN_ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    pub info: String,
}

impl SessionEvent {
    pub fn new(kind: SessionEventKind, info: impl Into<String>) -> Self {
        Self { kind, info: info.into() }
    }
}
