use crossbeam::channel::{self, Receiver, Sender, TryRecvError, TrySendError};
use crossbeam::queue::ArrayQueue;
use ipcperf_common::{IpcPerfError, Result, SessionEvent, SessionEventKind};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::debug;

use crate::{SessionCallbacks, Transport, TransportConfig};

/// Upper bound on message buffers kept for reuse by `direct_buffers` sessions.
const BUFFER_POOL_SIZE: usize = 4_096;

enum Frame {
    Message(Vec<u8>),
    Event(SessionEvent),
}

struct Member {
    sender: Sender<Frame>,
    topics: HashSet<String>,
}

struct BusInner {
    members: Mutex<HashMap<u64, Member>>,
    next_id: AtomicU64,
    pool: ArrayQueue<Vec<u8>>,
}

/// In-process publish/subscribe bus.
///
/// Every connected [`LoopbackSession`] owns a bounded delivery queue drained
/// by its own thread. Sends copy the payload into each subscribed session's
/// queue; when a session disconnects the others receive `PeerDown`.
#[derive(Clone)]
pub struct LoopbackBus {
    inner: Arc<BusInner>,
}

impl Default for LoopbackBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                members: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                pool: ArrayQueue::new(BUFFER_POOL_SIZE),
            }),
        }
    }

    /// Create an unconnected session on this bus.
    pub fn session(&self, config: TransportConfig, callbacks: Arc<dyn SessionCallbacks>) -> LoopbackSession {
        LoopbackSession { bus: self.clone(), config, callbacks, id: None, delivery: None }
    }

    /// Number of currently connected sessions.
    pub fn connected_sessions(&self) -> usize {
        self.inner.members.lock().len()
    }

    fn buffer_for(&self, payload: &[u8], direct: bool) -> Vec<u8> {
        if direct {
            if let Some(mut buf) = self.inner.pool.pop() {
                buf.clear();
                buf.extend_from_slice(payload);
                return buf;
            }
        }
        payload.to_vec()
    }

    fn recycle(&self, buf: Vec<u8>) {
        // A full pool just lets the buffer drop.
        let _ = self.inner.pool.push(buf);
    }

    /// Session events are never dropped: the send blocks until the queue has room,
    /// outside the member lock.
    fn notify_others(&self, from: u64, event: SessionEvent) {
        let targets: Vec<Sender<Frame>> = self
            .inner
            .members
            .lock()
            .iter()
            .filter(|(id, _)| **id != from)
            .map(|(_, member)| member.sender.clone())
            .collect();
        for sender in targets {
            // Err only if the peer finished disconnecting meanwhile.
            let _ = sender.send(Frame::Event(event.clone()));
        }
    }
}

/// A session on a [`LoopbackBus`].
pub struct LoopbackSession {
    bus: LoopbackBus,
    config: TransportConfig,
    callbacks: Arc<dyn SessionCallbacks>,
    id: Option<u64>,
    delivery: Option<JoinHandle<()>>,
}

impl LoopbackSession {
    pub fn is_connected(&self) -> bool {
        self.id.is_some()
    }

}

impl Transport for LoopbackSession {
    fn connect(&mut self) -> Result<()> {
        if self.id.is_some() {
            return Err(IpcPerfError::AlreadyConnected);
        }

        let id = self.bus.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = channel::bounded(self.config.queue_depth.max(1));
        sender
            .try_send(Frame::Event(SessionEvent::new(
                SessionEventKind::UpNotice,
                format!("session {id} up"),
            )))
            .map_err(|_| IpcPerfError::Transport("delivery queue rejected up notice".to_string()))?;

        let worker = DeliveryWorker {
            receiver,
            callbacks: Arc::clone(&self.callbacks),
            bus: self.bus.clone(),
            spin: self.config.thread_spin,
            recycle: self.config.direct_buffers,
        };
        let handle = std::thread::Builder::new()
            .name(format!("ipcperf-delivery-{id}"))
            .spawn(move || worker.run())
            .map_err(|e| IpcPerfError::Transport(format!("Failed to spawn delivery thread: {e}")))?;

        self.bus.inner.members.lock().insert(id, Member { sender, topics: HashSet::new() });
        self.id = Some(id);
        self.delivery = Some(handle);
        debug!(session = id, spin = self.config.thread_spin, direct = self.config.direct_buffers, "loopback session connected");
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        let Some(id) = self.id.take() else {
            return Ok(());
        };

        // Dropping the only sender lets the delivery thread drain its queue and exit.
        drop(self.bus.inner.members.lock().remove(&id));
        if let Some(handle) = self.delivery.take() {
            handle
                .join()
                .map_err(|_| IpcPerfError::Transport(format!("delivery thread of session {id} panicked")))?;
        }

        self.bus.notify_others(id, SessionEvent::new(SessionEventKind::PeerDown, format!("session {id} disconnected")));
        debug!(session = id, "loopback session disconnected");
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<()> {
        let id = self.id.ok_or(IpcPerfError::NotConnected)?;
        let mut members = self.bus.inner.members.lock();
        let member = members.get_mut(&id).ok_or(IpcPerfError::NotConnected)?;
        member.topics.insert(topic.to_string());
        Ok(())
    }

    fn send(&mut self, destination: &str, payload: &[u8]) -> Result<()> {
        if self.id.is_none() {
            return Err(IpcPerfError::NotConnected);
        }

        let members = self.bus.inner.members.lock();
        let mut result = Ok(());
        for member in members.values().filter(|m| m.topics.contains(destination)) {
            let frame = Frame::Message(self.bus.buffer_for(payload, self.config.direct_buffers));
            match member.sender.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => result = Err(IpcPerfError::WouldBlock),
                // Receiver is mid-disconnect; nothing to deliver to.
                Err(TrySendError::Disconnected(_)) => {}
            }
        }
        result
    }
}

impl Drop for LoopbackSession {
    fn drop(&mut self) {
        self.disconnect().ok();
    }
}

struct DeliveryWorker {
    receiver: Receiver<Frame>,
    callbacks: Arc<dyn SessionCallbacks>,
    bus: LoopbackBus,
    spin: bool,
    recycle: bool,
}

impl DeliveryWorker {
    fn run(self) {
        loop {
            let frame = if self.spin {
                match self.receiver.try_recv() {
                    Ok(frame) => frame,
                    Err(TryRecvError::Empty) => {
                        std::hint::spin_loop();
                        continue;
                    }
                    Err(TryRecvError::Disconnected) => break,
                }
            } else {
                match self.receiver.recv() {
                    Ok(frame) => frame,
                    Err(_) => break,
                }
            };

            match frame {
                Frame::Message(buf) => {
                    self.callbacks.on_deliver(&buf);
                    if self.recycle {
                        self.bus.recycle(buf);
                    }
                }
                Frame::Event(event) => self.callbacks.on_session_event(&event),
            }
        }
    }
}
