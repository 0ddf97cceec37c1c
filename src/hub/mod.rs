//! Shared vote state and live-update fan-out.
//!
//! [`Hub`] is the one service object the process builds at startup. It
//! owns the registries (behind the [`Gateway`]), the [`ConnectionSet`],
//! and the producer side of the dispatcher queue. Every request handler
//! and socket task gets a clone of the same hub.

pub mod connections;
pub mod dispatcher;
pub mod envelope;
pub mod gateway;
pub mod registry;
pub mod tally;
pub mod types;

pub use connections::{
    CloseSignal, Connection, ConnectionId, ConnectionReceiver, ConnectionSet,
    DEFAULT_CONNECTION_BUFFER,
};
pub use dispatcher::{Dispatcher, EventPermit, EventSender, QueuedEvent};
pub use envelope::{EventKind, OutboundEvent};
pub use gateway::{Gateway, VoteReceipt, VotingMode};
pub use registry::Registry;
pub use tally::Tally;
pub use types::*;

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Default capacity of the dispatcher queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Handle to the shared vote state. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Hub {
    gateway: Arc<Gateway>,
    connections: Arc<ConnectionSet>,
    started_at: DateTime<Utc>,
}

impl Hub {
    /// Builds a hub and its (not yet running) dispatcher.
    ///
    /// `queue_capacity` bounds the dispatcher queue; `connection_buffer`
    /// bounds how far each live connection may fall behind.
    pub fn new(
        mode: VotingMode,
        queue_capacity: usize,
        connection_buffer: usize,
    ) -> (Self, Dispatcher) {
        let connections = Arc::new(ConnectionSet::with_buffer(connection_buffer));
        let (dispatcher, events) = Dispatcher::new(Arc::clone(&connections), queue_capacity);

        let hub = Self {
            gateway: Arc::new(Gateway::new(mode, events)),
            connections,
            started_at: Utc::now(),
        };
        (hub, dispatcher)
    }

    /// Builds a hub and spawns its dispatcher on the current runtime.
    pub fn start(mode: VotingMode, queue_capacity: usize, connection_buffer: usize) -> Self {
        let (hub, dispatcher) = Self::new(mode, queue_capacity, connection_buffer);
        dispatcher.spawn();
        tracing::info!(?mode, queue_capacity, connection_buffer, "Vote hub started");
        hub
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn connections(&self) -> &ConnectionSet {
        &self.connections
    }

    pub fn mode(&self) -> VotingMode {
        self.gateway.mode()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
