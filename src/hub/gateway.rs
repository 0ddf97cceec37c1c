//! Vote ingestion and read-only status queries.
//!
//! The gateway validates each vote, applies it to the registry for the
//! configured [`VotingMode`], serializes the resulting snapshot and hands
//! it to the dispatcher.
//!
//! Writers are serialized by a publish lock. A writer first waits for a
//! free dispatcher slot, then takes the state lock, mutates, serializes and
//! queues without waiting again. Events therefore leave in the order the
//! state changed, and a full queue only holds up other writers: readers
//! never wait on the dispatcher.

use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use super::dispatcher::{EventPermit, EventSender};
use super::envelope::OutboundEvent;
use super::registry::Registry;
use super::tally::Tally;
use super::types::{Room, TallySnapshot, VoteRequest};
use crate::error::{EnvelopeError, VoteError};

/// Voting policy, fixed when the hub is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VotingMode {
    /// Rooms of voters; re-voting overwrites the previous vote.
    #[default]
    Rooms,
    /// One vote per voter, counted per score.
    Tally,
}

/// What an accepted vote produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteReceipt {
    /// Rooms mode: the vote was recorded.
    Recorded,
    /// Tally mode: the vote was counted; carries the new counts.
    Counted(TallySnapshot),
}

/// Entry point for every inbound vote.
#[derive(Debug)]
pub struct Gateway {
    mode: VotingMode,
    publish: Mutex<()>,
    registry: Mutex<Registry>,
    tally: Mutex<Tally>,
    events: EventSender,
}

impl Gateway {
    pub fn new(mode: VotingMode, events: EventSender) -> Self {
        Self {
            mode,
            publish: Mutex::new(()),
            registry: Mutex::new(Registry::new()),
            tally: Mutex::new(Tally::new()),
            events,
        }
    }

    pub fn mode(&self) -> VotingMode {
        self.mode
    }

    /// Applies a vote under the configured policy.
    ///
    /// Returns once the resulting event is queued, not once it is delivered.
    pub async fn submit(&self, vote: VoteRequest) -> Result<VoteReceipt, VoteError> {
        match self.mode {
            VotingMode::Rooms => self.submit_overwrite(&vote).await,
            VotingMode::Tally => self.submit_tally(&vote).await,
        }
    }

    async fn submit_overwrite(&self, vote: &VoteRequest) -> Result<VoteReceipt, VoteError> {
        if vote.voter.is_empty() {
            return Err(VoteError::InvalidVote("voter"));
        }

        let _order = self.publish.lock().await;
        let slot = self.reserve().await;

        let mut registry = self.registry.lock().await;
        let rooms = registry.upsert_vote(vote);
        tracing::debug!(voter = %vote.voter, room = %vote.room_key(), "Vote recorded");

        publish(slot, OutboundEvent::rooms_update(rooms));
        Ok(VoteReceipt::Recorded)
    }

    async fn submit_tally(&self, vote: &VoteRequest) -> Result<VoteReceipt, VoteError> {
        if vote.voter.is_empty() {
            return Err(VoteError::InvalidVote("voter"));
        }
        let score = match vote.score.as_deref() {
            Some(score) if !score.is_empty() => score,
            _ => return Err(VoteError::InvalidVote("score")),
        };

        let _order = self.publish.lock().await;
        let slot = self.reserve().await;

        let mut tally = self.tally.lock().await;
        let snapshot = tally.cast(&vote.voter, score)?;
        tracing::debug!(voter = %vote.voter, score, "Vote counted");

        publish(slot, OutboundEvent::tally_update(&snapshot));
        Ok(VoteReceipt::Counted(snapshot))
    }

    /// Waits for queue space. Caller holds the publish lock, not a state lock.
    async fn reserve(&self) -> Option<EventPermit<'_>> {
        let slot = self.events.reserve().await;
        if slot.is_none() {
            tracing::warn!("Dispatcher is not running, update will be dropped");
        }
        slot
    }

    /// Names of all rooms, sorted.
    pub async fn list_room_names(&self) -> Vec<String> {
        self.registry.lock().await.list_room_names()
    }

    /// Copy of one room; an unknown room is returned empty.
    pub async fn get_room(&self, name: &str) -> Room {
        self.registry
            .lock()
            .await
            .get_room(name)
            .cloned()
            .unwrap_or_default()
    }

    /// `status` envelope for one room.
    pub async fn status_event(&self, name: &str) -> Result<OutboundEvent, EnvelopeError> {
        OutboundEvent::status(&self.get_room(name).await)
    }

    /// `rooms` envelope listing every room.
    pub async fn rooms_event(&self) -> Result<OutboundEvent, EnvelopeError> {
        let names = self.list_room_names().await;
        OutboundEvent::rooms(&names)
    }

    /// Current tally counts and number of voters.
    pub async fn tally_summary(&self) -> (BTreeMap<String, u64>, usize) {
        let tally = self.tally.lock().await;
        (tally.counts().clone(), tally.voter_count())
    }
}

/// Queues a freshly framed event into a reserved slot. Never waits.
fn publish(slot: Option<EventPermit<'_>>, event: Result<OutboundEvent, EnvelopeError>) {
    match (slot, event) {
        (Some(slot), Ok(event)) => {
            slot.send(event);
        }
        // Already logged when the slot was refused.
        (None, Ok(_)) => {}
        (_, Err(e)) => {
            // State already changed; only the broadcast is lost.
            tracing::error!(error = %e, "Dropping update event");
        }
    }
}
