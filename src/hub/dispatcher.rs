//! Fan-out of outbound events to every live connection.
//!
//! The dispatcher is the only writer to connections. It drains a bounded
//! FIFO queue one event at a time and writes each event to a snapshot of
//! the connection set. Every event is stamped with a sequence number when
//! it enters the queue; a connection only receives events stamped at or
//! after the moment it joined. A connection whose write fails, because its
//! socket is gone or because it stopped reading, is dropped from the set,
//! told to close, and never written to again.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::connections::{ConnectionSet, EventClock};
use super::envelope::OutboundEvent;
use crate::error::DeliveryFailure;

/// An event together with the sequence it was queued at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedEvent {
    pub seq: u64,
    pub event: OutboundEvent,
}

/// Producer side of the event queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<QueuedEvent>,
    clock: Arc<EventClock>,
}

impl EventSender {
    /// Waits for a free slot in the queue.
    ///
    /// Returns `None` if the dispatcher has stopped.
    pub async fn reserve(&self) -> Option<EventPermit<'_>> {
        let permit = self.tx.reserve().await.ok()?;
        Some(EventPermit {
            permit,
            clock: &self.clock,
        })
    }
}

/// A reserved queue slot. Sending never waits.
pub struct EventPermit<'a> {
    permit: mpsc::Permit<'a, QueuedEvent>,
    clock: &'a EventClock,
}

impl EventPermit<'_> {
    /// Stamps the event with the next sequence and queues it.
    pub fn send(self, event: OutboundEvent) -> u64 {
        let seq = self.clock.tick();
        self.permit.send(QueuedEvent { seq, event });
        seq
    }
}

/// Consumer side: the fan-out loop.
pub struct Dispatcher {
    rx: mpsc::Receiver<QueuedEvent>,
    connections: Arc<ConnectionSet>,
}

impl Dispatcher {
    /// Creates a dispatcher over `connections` with a queue of `capacity` events.
    pub fn new(connections: Arc<ConnectionSet>, capacity: usize) -> (Self, EventSender) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let clock = connections.clock();
        (Self { rx, connections }, EventSender { tx, clock })
    }

    /// Spawns the loop onto the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until every [`EventSender`] has been dropped.
    pub async fn run(mut self) {
        tracing::debug!("Dispatcher started");
        while let Some(queued) = self.rx.recv().await {
            self.deliver(&queued);
        }
        tracing::debug!("Dispatcher stopped: event queue closed");
    }

    /// Writes one event to every member that joined before it was queued,
    /// pruning failures.
    ///
    /// Returns the number of connections that accepted the event.
    pub fn deliver(&self, queued: &QueuedEvent) -> usize {
        let kind = queued.event.kind;
        let mut delivered = 0;
        self.connections.for_each(|conn| {
            if queued.seq < conn.joined_at() {
                return;
            }
            match conn.write(&queued.event) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    match e {
                        DeliveryFailure::Backlogged(_) => {
                            tracing::warn!(error = %e, %kind, "Dropping slow connection")
                        }
                        DeliveryFailure::Closed(_) => {
                            tracing::debug!(error = %e, %kind, "Pruning dead connection")
                        }
                    }
                    self.connections.remove(conn.id());
                    conn.close();
                }
            }
        });
        tracing::trace!(delivered, seq = queued.seq, %kind, "Event dispatched");
        delivered
    }

    /// Pops the next queued event without delivering it.
    #[cfg(test)]
    pub(crate) fn try_next(&mut self) -> Option<OutboundEvent> {
        self.rx.try_recv().ok().map(|queued| queued.event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn event(name: &str) -> OutboundEvent {
        OutboundEvent::rooms(&[name.to_string()]).unwrap()
    }

    fn stamped(set: &ConnectionSet, name: &str) -> QueuedEvent {
        QueuedEvent {
            seq: set.clock().tick(),
            event: event(name),
        }
    }

    async fn enqueue(tx: &EventSender, name: &str) {
        tx.reserve().await.unwrap().send(event(name));
    }

    #[test]
    fn test_deliver_prunes_failed_connection() {
        let set = Arc::new(ConnectionSet::new());
        let (alive, mut alive_rx) = set.connect();
        let (dead, dead_rx) = set.connect();
        drop(dead_rx);

        let (dispatcher, _tx) = Dispatcher::new(Arc::clone(&set), 8);

        assert_eq!(dispatcher.deliver(&stamped(&set, "k")), 1);
        assert!(set.contains(alive.id()));
        assert!(!set.contains(dead.id()));
        assert_eq!(alive_rx.try_recv().unwrap(), event("k"));

        // Next event: the pruned connection is not a recipient any more.
        assert_eq!(dispatcher.deliver(&stamped(&set, "k+1")), 1);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_deliver_with_no_connections() {
        let set = Arc::new(ConnectionSet::new());
        let (dispatcher, _tx) = Dispatcher::new(Arc::clone(&set), 8);
        assert_eq!(dispatcher.deliver(&stamped(&set, "x")), 0);
    }

    #[tokio::test]
    async fn test_stalled_connection_is_pruned_and_closed() {
        let set = Arc::new(ConnectionSet::with_buffer(2));
        let (_alive, mut alive_rx) = set.connect();
        let (stalled, stalled_rx) = set.connect();
        let (dispatcher, _tx) = Dispatcher::new(Arc::clone(&set), 8);

        for name in ["1", "2"] {
            assert_eq!(dispatcher.deliver(&stamped(&set, name)), 2);
            assert_eq!(alive_rx.try_recv().unwrap(), event(name));
        }

        // The stalled subscriber never read; its buffer is now full.
        assert_eq!(dispatcher.deliver(&stamped(&set, "3")), 1);
        assert!(!set.contains(stalled.id()));
        assert_eq!(alive_rx.try_recv().unwrap(), event("3"));

        tokio::time::timeout(Duration::from_secs(1), stalled_rx.close_signal().closed())
            .await
            .unwrap();

        assert_eq!(dispatcher.deliver(&stamped(&set, "4")), 1);
    }

    #[tokio::test]
    async fn test_events_arrive_in_enqueue_order() {
        let set = Arc::new(ConnectionSet::with_buffer(32));
        let (_a, mut rx_a) = set.connect();
        let (_b, mut rx_b) = set.connect();

        let (dispatcher, tx) = Dispatcher::new(Arc::clone(&set), 2);
        let handle = dispatcher.spawn();

        for i in 0..20 {
            enqueue(&tx, &i.to_string()).await;
        }

        for rx in [&mut rx_a, &mut rx_b] {
            for i in 0..20 {
                let got = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(got, event(&i.to_string()));
            }
        }

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_late_joiner_gets_no_backfill() {
        let set = Arc::new(ConnectionSet::new());
        let (dispatcher, tx) = Dispatcher::new(Arc::clone(&set), 8);
        let handle = dispatcher.spawn();

        let (_early, mut early_rx) = set.connect();
        enqueue(&tx, "before").await;
        // Wait until the first event has been fanned out.
        let first = tokio::time::timeout(Duration::from_secs(1), early_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first, event("before"));

        let (_late, mut late_rx) = set.connect();
        enqueue(&tx, "after").await;

        let got = tokio::time::timeout(Duration::from_secs(1), late_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, event("after"));
        assert!(late_rx.try_recv().is_err());

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_late_joiner_skips_events_still_queued() {
        let set = Arc::new(ConnectionSet::new());
        let (dispatcher, tx) = Dispatcher::new(Arc::clone(&set), 8);

        let (_early, mut early_rx) = set.connect();
        enqueue(&tx, "before").await;

        // Joins while "before" is still sitting in the queue.
        let (_late, mut late_rx) = set.connect();
        let handle = dispatcher.spawn();
        enqueue(&tx, "after").await;

        for expected in ["before", "after"] {
            let got = tokio::time::timeout(Duration::from_secs(1), early_rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(got, event(expected));
        }

        let got = tokio::time::timeout(Duration::from_secs(1), late_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, event("after"));
        assert!(late_rx.try_recv().is_err());

        drop(tx);
        handle.await.unwrap();
    }
}
