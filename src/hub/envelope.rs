//! Outbound event framing.
//!
//! Every message pushed to a live connection (and every status/rooms
//! response) is one of three tagged envelopes:
//!
//! - `{"type":"update","data":...}`
//! - `{"type":"status","data":{"voters":{...}}}`
//! - `{"type":"rooms","rooms":[...]}`

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use super::types::{Room, RoomMap, TallySnapshot};
use crate::error::EnvelopeError;

/// Logical tag of an outbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Update,
    Status,
    Rooms,
}

impl EventKind {
    /// Wire name used in the `type` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Status => "status",
            Self::Rooms => "rooms",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully serialized event. Cloning shares the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEvent {
    pub kind: EventKind,
    pub payload: Arc<str>,
}

/// `{"type":..,"data":..}` wire shape.
#[derive(Serialize)]
struct DataEnvelope<'a, T: ?Sized> {
    #[serde(rename = "type")]
    kind: &'static str,
    data: &'a T,
}

/// `{"type":"rooms","rooms":[..]}` wire shape.
#[derive(Serialize)]
struct RoomsEnvelope<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    rooms: &'a [String],
}

impl OutboundEvent {
    /// `update` carrying the whole room map.
    pub fn rooms_update(rooms: &RoomMap) -> Result<Self, EnvelopeError> {
        Self::with_data(EventKind::Update, rooms)
    }

    /// `update` carrying one accepted tally vote and the resulting counts.
    pub fn tally_update(snapshot: &TallySnapshot) -> Result<Self, EnvelopeError> {
        Self::with_data(EventKind::Update, snapshot)
    }

    /// `status` for a single room. Callers pass an empty room for an unknown name.
    pub fn status(room: &Room) -> Result<Self, EnvelopeError> {
        Self::with_data(EventKind::Status, room)
    }

    /// `rooms` listing room names.
    pub fn rooms(names: &[String]) -> Result<Self, EnvelopeError> {
        let envelope = RoomsEnvelope {
            kind: EventKind::Rooms.as_str(),
            rooms: names,
        };
        Self::encode(EventKind::Rooms, &envelope)
    }

    fn with_data<T>(kind: EventKind, data: &T) -> Result<Self, EnvelopeError>
    where
        T: Serialize + ?Sized,
    {
        let envelope = DataEnvelope {
            kind: kind.as_str(),
            data,
        };
        Self::encode(kind, &envelope)
    }

    fn encode(kind: EventKind, value: &impl Serialize) -> Result<Self, EnvelopeError> {
        let payload = serde_json::to_string(value).map_err(|source| {
            EnvelopeError::Serialization {
                kind: kind.as_str(),
                source,
            }
        })?;
        Ok(Self {
            kind,
            payload: payload.into(),
        })
    }

    /// Payload as text, ready for a WebSocket text frame.
    pub fn as_str(&self) -> &str {
        &self.payload
    }
}
