//! Messaging transport boundary used by the benchmark engine.
//!
//! The engine only needs to send a fixed-size binary payload to a destination
//! and to be called back synchronously when a payload arrives. Everything else
//! (sessions, subscriptions, delivery threads) lives behind [`Transport`] and
//! [`SessionCallbacks`].

use ipcperf_common::{Result, SessionEvent};

mod loopback;

pub use loopback::{LoopbackBus, LoopbackSession};

/// Default bound of each session's delivery queue.
pub const DEFAULT_QUEUE_DEPTH: usize = 65_536;

/// A connectable messaging session.
pub trait Transport {
    fn connect(&mut self) -> Result<()>;

    /// Tear the session down. Disconnecting an idle session is a no-op.
    fn disconnect(&mut self) -> Result<()>;

    fn subscribe(&mut self, topic: &str) -> Result<()>;

    /// Fire-and-forget send. Must never block waiting for the receiver:
    /// a full delivery queue is reported as `IpcPerfError::WouldBlock`.
    fn send(&mut self, destination: &str, payload: &[u8]) -> Result<()>;
}

/// Callbacks a transport invokes on its own delivery thread.
///
/// A transport never invokes the callbacks of one session concurrently with
/// themselves: deliveries and events arrive strictly one after another.
pub trait SessionCallbacks: Send + Sync + 'static {
    fn on_deliver(&self, payload: &[u8]);
    fn on_session_event(&self, event: &SessionEvent);
}

/// Callbacks for sessions that only publish; deliveries and events are ignored.
pub struct IgnoreCallbacks;

impl SessionCallbacks for IgnoreCallbacks {
    fn on_deliver(&self, _payload: &[u8]) {}
    fn on_session_event(&self, _event: &SessionEvent) {}
}

/// Per-session transport configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Delivery thread spins on its queue instead of blocking.
    pub thread_spin: bool,
    /// Recycle message buffers through a fixed pool instead of allocating per message.
    pub direct_buffers: bool,
    pub queue_depth: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { thread_spin: false, direct_buffers: false, queue_depth: DEFAULT_QUEUE_DEPTH }
    }
}
