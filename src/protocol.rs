//! Wire messages exchanged with the game server.
//!
//! The transport delivers named events with an optional JSON payload.
//! Outbound messages serialise as `{"event": <name>, "data": <payload>}`;
//! [`OutboundMessage::event_name`] and [`OutboundMessage::payload`] give the
//! two halves separately for transports that take them apart.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;
use crate::state::moves::{Move, RoundOutcome};
use crate::state::session::SessionEvent;

/// Client → server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundMessage {
    SetPlayerInfo {
        name: String,
        avatar: String,
    },
    FindMatch,
    SendMove {
        #[serde(rename = "move")]
        mv: Move,
    },
    RequestRematch {
        room_id: String,
    },
    FindNewMatch {
        room_id: String,
    },
}

impl OutboundMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::SetPlayerInfo { .. } => "set_player_info",
            Self::FindMatch => "find_match",
            Self::SendMove { .. } => "send_move",
            Self::RequestRematch { .. } => "request_rematch",
            Self::FindNewMatch { .. } => "find_new_match",
        }
    }

    /// Payload object, or `None` for events without one.
    pub fn payload(&self) -> Option<Value> {
        match self {
            Self::SetPlayerInfo { name, avatar } => {
                Some(serde_json::json!({ "name": name, "avatar": avatar }))
            }
            Self::FindMatch => None,
            Self::SendMove { mv } => Some(serde_json::json!({ "move": mv.as_str() })),
            Self::RequestRematch { room_id } | Self::FindNewMatch { room_id } => {
                Some(serde_json::json!({ "room_id": room_id }))
            }
        }
    }

    /// Room the message refers to, if any.
    pub fn room_id(&self) -> Option<&str> {
        match self {
            Self::RequestRematch { room_id } | Self::FindNewMatch { room_id } => Some(room_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MatchFoundPayload {
    pub room_id: String,
    #[serde(default)]
    pub opponent_name: Option<String>,
    #[serde(default)]
    pub opponent_avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameResultPayload {
    pub result: RoundOutcome,
    #[serde(default)]
    pub your_move: Option<Move>,
    #[serde(default)]
    pub opponent_move: Option<Move>,
    #[serde(default)]
    pub your_name: Option<String>,
    #[serde(default)]
    pub opponent_name: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
}

/// Payload for events that may name a room and carry a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RoomNotice {
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// Server → client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Waiting,
    MatchFound(MatchFoundPayload),
    GameResult(GameResultPayload),
    RematchAccepted(RoomNotice),
    RematchDeclined(RoomNotice),
    OpponentDisconnected(RoomNotice),
    Error(ErrorPayload),
}

impl InboundEvent {
    /// Decode a named event and its payload.
    pub fn decode(event: &str, payload: Value) -> Result<Self, ProtocolError> {
        // Payload-less events may arrive as null; optional-field payloads
        // decode from an empty object.
        let payload = if payload.is_null() {
            Value::Object(Default::default())
        } else {
            payload
        };

        match event {
            "waiting" => Ok(Self::Waiting),
            "match_found" => parse(event, payload).map(Self::MatchFound),
            "game_result" => parse(event, payload).map(Self::GameResult),
            "rematch_accepted" => parse(event, payload).map(Self::RematchAccepted),
            "rematch_declined" => parse(event, payload).map(Self::RematchDeclined),
            "opponent_disconnected" => parse(event, payload).map(Self::OpponentDisconnected),
            "error" => parse(event, payload).map(Self::Error),
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }
}

fn parse<T: DeserializeOwned>(event: &str, payload: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(payload).map_err(|source| ProtocolError::Payload {
        event: event.to_string(),
        source,
    })
}

impl From<InboundEvent> for SessionEvent {
    fn from(event: InboundEvent) -> Self {
        match event {
            InboundEvent::Waiting => Self::Waiting,
            InboundEvent::MatchFound(p) => Self::MatchFound {
                room_id: p.room_id,
                opponent_name: p.opponent_name,
                opponent_avatar: p.opponent_avatar,
            },
            InboundEvent::GameResult(p) => Self::GameResult {
                room_id: p.room_id,
                outcome: p.result,
                your_move: p.your_move,
                opponent_move: p.opponent_move,
                your_name: p.your_name,
                opponent_name: p.opponent_name,
            },
            InboundEvent::RematchAccepted(p) => Self::RematchAccepted { room_id: p.room_id },
            InboundEvent::RematchDeclined(p) => Self::RematchDeclined {
                room_id: p.room_id,
                message: p.message,
            },
            InboundEvent::OpponentDisconnected(p) => {
                Self::OpponentDisconnected { room_id: p.room_id }
            }
            InboundEvent::Error(p) => Self::ServerError { message: p.message },
        }
    }
}

/// What the transport hands to the session runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Disconnected { reason: Option<String> },
    Message { event: String, payload: Value },
}

impl TransportEvent {
    pub fn message(event: impl Into<String>, payload: Value) -> Self {
        Self::Message {
            event: event.into(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_outbound_encoding() {
        let msg = OutboundMessage::SendMove { mv: Move::Rock };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "event": "send_move", "data": { "move": "ROCK" } })
        );
        assert_eq!(
            serde_json::to_value(OutboundMessage::FindMatch).unwrap(),
            json!({ "event": "find_match" })
        );
        assert_eq!(msg.payload(), Some(json!({ "move": "ROCK" })));
        assert_eq!(OutboundMessage::FindMatch.payload(), None);
    }

    #[test]
    fn test_outbound_room_payload() {
        let msg = OutboundMessage::FindNewMatch {
            room_id: "R1".to_string(),
        };
        assert_eq!(msg.event_name(), "find_new_match");
        assert_eq!(msg.payload(), Some(json!({ "room_id": "R1" })));
        assert_eq!(msg.room_id(), Some("R1"));
    }

    #[test]
    fn test_decode_match_found() {
        let event = InboundEvent::decode(
            "match_found",
            json!({ "room_id": "R1", "opponent_name": "Bo", "opponent_avatar": "🐱" }),
        )
        .unwrap();
        assert_eq!(
            event,
            InboundEvent::MatchFound(MatchFoundPayload {
                room_id: "R1".to_string(),
                opponent_name: Some("Bo".to_string()),
                opponent_avatar: Some("🐱".to_string()),
            })
        );
    }

    #[test]
    fn test_decode_game_result() {
        let event = InboundEvent::decode(
            "game_result",
            json!({ "result": "WIN", "your_move": "ROCK", "opponent_move": "SCISSORS" }),
        )
        .unwrap();
        let InboundEvent::GameResult(p) = event else {
            panic!("expected game_result");
        };
        assert_eq!(p.result, RoundOutcome::Win);
        assert_eq!(p.opponent_move, Some(Move::Scissors));
        assert_eq!(p.room_id, None);
    }

    #[test]
    fn test_decode_payloadless_events() {
        assert_eq!(
            InboundEvent::decode("waiting", Value::Null).unwrap(),
            InboundEvent::Waiting
        );
        assert_eq!(
            InboundEvent::decode("opponent_disconnected", Value::Null).unwrap(),
            InboundEvent::OpponentDisconnected(RoomNotice::default())
        );
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            InboundEvent::decode("connected", json!({ "sid": "abc" })),
            Err(ProtocolError::UnknownEvent(name)) if name == "connected"
        ));
        assert!(matches!(
            InboundEvent::decode("game_result", json!({ "result": "MAYBE" })),
            Err(ProtocolError::Payload { .. })
        ));
        assert!(InboundEvent::decode("match_found", json!({})).is_err());
    }
}
