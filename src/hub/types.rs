//! Data types for vote tracking.
//!
//! Defines the records held by the registries and the snapshots
//! handed to the envelope framing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An inbound vote, already decoded from the request body.
///
/// Field names match the JSON body clients send to `POST /event`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest {
    /// Room the vote belongs to. Missing in the body means the unnamed room `""`.
    #[serde(default)]
    pub room: Option<String>,

    /// Chosen score. May be `null` in rooms mode (a voter joined but has not picked yet).
    #[serde(default)]
    pub score: Option<String>,

    /// Voter identifier. Must be non-empty.
    #[serde(default)]
    pub voter: String,
}

impl VoteRequest {
    #[cfg(test)]
    pub(crate) fn new(voter: &str, score: Option<&str>, room: Option<&str>) -> Self {
        Self {
            room: room.map(str::to_string),
            score: score.map(str::to_string),
            voter: voter.to_string(),
        }
    }

    /// Room key this vote is filed under.
    pub fn room_key(&self) -> &str {
        self.room.as_deref().unwrap_or("")
    }
}

/// The latest vote cast by one voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRecord {
    /// Room this record lives in.
    pub room: String,

    /// Score, or `null` if the voter has not picked one.
    pub score: Option<String>,

    /// Voter identifier (unique within the room).
    pub voter: String,
}

/// A named voting scope.
///
/// Serializes as `{"voters": {...}}`; the room name is the key in the
/// surrounding map, not a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Voter id -> latest record. Keyed by id, so one record per voter.
    pub voters: BTreeMap<String, VoterRecord>,
}

impl Room {
    /// Overwrites (or inserts) the voter's record.
    pub fn upsert(&mut self, record: VoterRecord) {
        self.voters.insert(record.voter.clone(), record);
    }
}

/// Full room map, as broadcast in an `update` event.
pub type RoomMap = BTreeMap<String, Room>;

/// Point-in-time view of the tally after one accepted vote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallySnapshot {
    /// Voter whose vote produced this snapshot.
    pub voter: String,

    /// Score that voter chose.
    pub score: String,

    /// Score -> number of votes.
    pub counts: BTreeMap<String, u64>,
}
