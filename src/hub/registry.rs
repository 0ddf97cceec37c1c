//! Room registry for overwrite-mode voting.
//!
//! Holds every room and its voters. Votes overwrite the voter's previous
//! record rather than appending. Rooms are created on first use and live
//! for the lifetime of the process.
//!
//! This struct has no interior locking; the gateway wraps it in a single
//! mutex and serializes the snapshot before releasing it.

use super::types::{Room, RoomMap, VoteRequest, VoterRecord};

/// The authoritative room -> voters map.
#[derive(Debug, Default)]
pub struct Registry {
    rooms: RoomMap,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a vote, creating the room if needed.
    ///
    /// Assumes `vote.voter` is non-empty; the gateway rejects empty ids
    /// before calling this. Returns the full room map after the update so
    /// the caller can serialize it while still holding the lock.
    pub fn upsert_vote(&mut self, vote: &VoteRequest) -> &RoomMap {
        let room_key = vote.room_key().to_string();
        let record = VoterRecord {
            room: room_key.clone(),
            score: vote.score.clone(),
            voter: vote.voter.clone(),
        };

        self.rooms.entry(room_key).or_default().upsert(record);
        &self.rooms
    }

    /// Names of all rooms, in sorted order.
    pub fn list_room_names(&self) -> Vec<String> {
        self.rooms.keys().cloned().collect()
    }

    /// The named room, or `None` if nobody has voted there yet.
    pub fn get_room(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }
}
