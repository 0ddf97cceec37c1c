//! Live connection tracking.
//!
//! A [`Connection`] is the dispatcher's handle to one subscriber: a sender
//! into that subscriber's bounded outbound buffer. The socket side owns the
//! matching [`ConnectionReceiver`] and drains it onto the wire. A write
//! fails when the socket side is gone or when the buffer is full because
//! the subscriber stopped reading; either way the connection is pruned and
//! told to close.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tokio::sync::Notify;

use super::envelope::OutboundEvent;
use crate::error::DeliveryFailure;

/// Process-unique connection identifier.
pub type ConnectionId = u64;

/// Default number of undelivered events a subscriber may fall behind by.
pub const DEFAULT_CONNECTION_BUFFER: usize = 64;

/// Sequence stamped on every event as it enters the dispatcher queue.
#[derive(Debug, Default)]
pub struct EventClock(AtomicU64);

impl EventClock {
    /// Claims the next sequence number.
    pub fn tick(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }

    /// Sequence the next event will get.
    pub fn now(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// One-shot request for the socket side to shut down.
#[derive(Debug, Clone, Default)]
pub struct CloseSignal(Arc<Notify>);

impl CloseSignal {
    pub fn close(&self) {
        // Stores a permit, so a close issued before anyone waits is not lost.
        self.0.notify_one();
    }

    /// Resolves once [`CloseSignal::close`] has been called.
    pub async fn closed(&self) {
        self.0.notified().await;
    }
}

/// Write handle to one live subscriber.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    joined_at: u64,
    tx: mpsc::Sender<OutboundEvent>,
    close: CloseSignal,
}

impl Connection {
    /// Creates a connection handle and the receiver its socket drains.
    ///
    /// `joined_at` is the first event sequence this subscriber should see.
    pub fn new(id: ConnectionId, joined_at: u64, buffer: usize) -> (Self, ConnectionReceiver) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let close = CloseSignal::default();
        let conn = Self {
            id,
            joined_at,
            tx,
            close: close.clone(),
        };
        (conn, ConnectionReceiver { rx, close })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// First event sequence this connection is a recipient of.
    pub fn joined_at(&self) -> u64 {
        self.joined_at
    }

    /// Queues an event for this subscriber. Never waits.
    pub fn write(&self, event: &OutboundEvent) -> Result<(), DeliveryFailure> {
        self.tx.try_send(event.clone()).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryFailure::Backlogged(self.id),
            TrySendError::Closed(_) => DeliveryFailure::Closed(self.id),
        })
    }

    /// Asks the socket side to shut down.
    pub fn close(&self) {
        self.close.close();
    }
}

/// Socket side of a connection.
#[derive(Debug)]
pub struct ConnectionReceiver {
    rx: mpsc::Receiver<OutboundEvent>,
    close: CloseSignal,
}

impl ConnectionReceiver {
    /// Next event, or `None` once every write handle is gone.
    pub async fn recv(&mut self) -> Option<OutboundEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Result<OutboundEvent, TryRecvError> {
        self.rx.try_recv()
    }

    /// Signal fired when the dispatcher gives up on this connection.
    pub fn close_signal(&self) -> CloseSignal {
        self.close.clone()
    }
}

/// The set of currently subscribed connections.
#[derive(Debug)]
pub struct ConnectionSet {
    members: Mutex<HashMap<ConnectionId, Connection>>,
    next_id: AtomicU64,
    clock: Arc<EventClock>,
    buffer: usize,
}

impl Default for ConnectionSet {
    fn default() -> Self {
        Self::with_buffer(DEFAULT_CONNECTION_BUFFER)
    }
}

impl ConnectionSet {
    /// Creates an empty set with the default per-connection buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty set whose connections buffer up to `buffer` events.
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            members: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            clock: Arc::new(EventClock::default()),
            buffer,
        }
    }

    fn members(&self) -> MutexGuard<'_, HashMap<ConnectionId, Connection>> {
        // A panic while holding this lock cannot leave the map half-updated.
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clock the dispatcher queue stamps events with.
    pub fn clock(&self) -> Arc<EventClock> {
        Arc::clone(&self.clock)
    }

    /// Allocates a fresh connection, registers it, and returns its receiver.
    ///
    /// The join sequence is read under the set lock, so every event stamped
    /// after it is delivered to a snapshot that already contains this
    /// connection.
    pub fn connect(&self) -> (Connection, ConnectionReceiver) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut members = self.members();
        let (conn, rx) = Connection::new(id, self.clock.now(), self.buffer);
        members.insert(id, conn.clone());
        (conn, rx)
    }

    /// Deregisters a connection. Removing an absent id is a no-op.
    ///
    /// Returns whether the connection was present.
    pub fn remove(&self, id: ConnectionId) -> bool {
        self.members().remove(&id).is_some()
    }

    /// Number of subscribed connections.
    pub fn len(&self) -> usize {
        self.members().len()
    }

    /// Copy of the current members, taken under the lock.
    pub fn snapshot(&self) -> Vec<Connection> {
        self.members().values().cloned().collect()
    }

    /// Calls `f` on every member of a snapshot taken under the lock.
    ///
    /// The lock is released before `f` runs, so `f` may call back into
    /// the set (e.g. to remove a failed member).
    pub fn for_each(&self, mut f: impl FnMut(&Connection)) {
        for conn in self.snapshot() {
            f(&conn);
        }
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: ConnectionId) -> bool {
        self.members().contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn event() -> OutboundEvent {
        OutboundEvent::rooms(&["r1".to_string()]).unwrap()
    }

    #[test]
    fn test_connect_assigns_unique_ids() {
        let set = ConnectionSet::new();
        let (a, _rx_a) = set.connect();
        let (b, _rx_b) = set.connect();

        assert_ne!(a.id(), b.id());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_connect_records_join_sequence() {
        let set = ConnectionSet::new();
        let (first, _rx) = set.connect();
        set.clock().tick();
        set.clock().tick();
        let (second, _rx) = set.connect();

        assert_eq!(first.joined_at(), 0);
        assert_eq!(second.joined_at(), 2);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let set = ConnectionSet::new();
        let (conn, _rx) = set.connect();

        assert!(set.remove(conn.id()));
        assert!(!set.remove(conn.id()));
        assert!(!set.remove(9999));
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_write_reaches_receiver() {
        let (conn, mut rx) = Connection::new(7, 0, 4);
        conn.write(&event()).unwrap();

        let got = rx.try_recv().unwrap();
        assert_eq!(got, event());
    }

    #[test]
    fn test_write_fails_after_receiver_dropped() {
        let (conn, rx) = Connection::new(7, 0, 4);
        drop(rx);

        assert_eq!(conn.write(&event()), Err(DeliveryFailure::Closed(7)));
    }

    #[test]
    fn test_write_fails_when_buffer_full() {
        let (conn, mut rx) = Connection::new(7, 0, 2);
        conn.write(&event()).unwrap();
        conn.write(&event()).unwrap();

        assert_eq!(conn.write(&event()), Err(DeliveryFailure::Backlogged(7)));

        // Draining makes room again.
        rx.try_recv().unwrap();
        assert!(conn.write(&event()).is_ok());
    }

    #[tokio::test]
    async fn test_close_reaches_receiver() {
        let (conn, rx) = Connection::new(7, 0, 2);
        conn.close();

        tokio::time::timeout(Duration::from_secs(1), rx.close_signal().closed())
            .await
            .unwrap();
    }

    #[test]
    fn test_for_each_allows_removal() {
        let set = ConnectionSet::new();
        let (_a, _rx_a) = set.connect();
        let (_b, _rx_b) = set.connect();

        let mut visited = 0;
        set.for_each(|conn| {
            visited += 1;
            set.remove(conn.id());
        });

        assert_eq!(visited, 2);
        assert_eq!(set.len(), 0);
    }
}
