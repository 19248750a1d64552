//! Session state machine.
//!
//! Tracks where this client is in the matchmaking/game lifecycle and
//! validates every transition. Room identity and the pending move live
//! inside the phase variants, so a room exists exactly while the session is
//! in a match.
//!
//! # State Diagram
//!
//! ```text
//! ┌──────────┐  find_match   ┌─────────────┐  match_found  ┌─────────┐
//! │   Idle   │──────────────▶│ Matchmaking │──────────────▶│ Matched │◀─────┐
//! └──────────┘               └─────────────┘               └────┬────┘      │
//!   ▲    ▲                        ▲                             │ move      │
//!   │    │ connect                │ find_new_match              ▼           │
//!   │ ┌──┴─────────┐              │ (any in-session)    ┌───────────────┐   │
//!   │ │ Terminated │              │                     │ MoveSubmitted │   │
//!   │ └────────────┘              │                     └───────┬───────┘   │
//!   │    ▲ disconnect mid-round   │                             │ result    │
//!   │                                                           ▼           │
//!   │  opponent_disconnected /            ┌────────────────┐  grace  ┌─────┴──────────┐
//!   └──────────────────────────────────── │ RematchPending │◀────────│ RoundResolved  │
//!      rematch_declined                   └────────────────┘ request └────────────────┘
//!                                          rematch_accepted ─▶ Matched
//! ```

use std::fmt;

use thiserror::Error;

use super::identity::{Avatar, LocalPlayer, RemotePlayer};
use super::moves::{Move, RoundOutcome, RoundRecord};
use super::timers::{TimerKind, TimerTicket};
use crate::error::ActionError;
use crate::protocol::OutboundMessage;

/// Current phase of the session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    /// Not in a match (identity may or may not be set)
    #[default]
    Idle,

    /// Waiting to be paired; `queued` once the server said "waiting"
    Matchmaking { queued: bool },

    /// Paired, move not yet chosen
    Matched { room_id: String },

    /// Move sent, waiting for the round result
    MoveSubmitted { room_id: String, pending_move: Move },

    /// Result received; rematch controls open after the grace period
    RoundResolved { room_id: String, rematch_open: bool },

    /// Rematch requested, waiting for the opponent
    RematchPending { room_id: String },

    /// Transport lost mid-round
    Terminated,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Matchmaking { .. } => "Matchmaking",
            Self::Matched { .. } => "Matched",
            Self::MoveSubmitted { .. } => "MoveSubmitted",
            Self::RoundResolved { .. } => "RoundResolved",
            Self::RematchPending { .. } => "RematchPending",
            Self::Terminated => "Terminated",
        }
    }

    /// Room ID while in a match.
    pub fn room_id(&self) -> Option<&str> {
        match self {
            Self::Matched { room_id }
            | Self::MoveSubmitted { room_id, .. }
            | Self::RoundResolved { room_id, .. }
            | Self::RematchPending { room_id } => Some(room_id),
            _ => None,
        }
    }

    /// Check if a room is active.
    pub fn is_in_session(&self) -> bool {
        self.room_id().is_some()
    }

    /// Idle or Terminated: free to start a new search.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle | Self::Terminated)
    }

    pub fn pending_move(&self) -> Option<Move> {
        match self {
            Self::MoveSubmitted { pending_move, .. } => Some(*pending_move),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matchmaking { queued: true } => write!(f, "Matchmaking(queued)"),
            Self::MoveSubmitted {
                room_id,
                pending_move,
            } => write!(f, "MoveSubmitted({}, {})", room_id, pending_move),
            Self::RoundResolved {
                room_id,
                rematch_open: true,
            } => write!(f, "RoundResolved({}, rematch open)", room_id),
            other => match other.room_id() {
                Some(room_id) => write!(f, "{}({})", other.name(), room_id),
                None => write!(f, "{}", other.name()),
            },
        }
    }
}

/// A user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Inline hint after a rejected action
    Hint(String),

    /// Server sent an `error` event
    ServerError(String),

    /// Transport dropped while a pairing was live
    ConnectionLost,

    /// Opponent disconnected
    OpponentLeft { name: String },

    /// Opponent declined the rematch (or the server could not arrange one)
    RematchDeclined { message: Option<String> },
}

impl Notice {
    /// Shown until a reset timer clears it.
    pub fn awaits_reset(&self) -> bool {
        matches!(self, Self::OpponentLeft { .. } | Self::RematchDeclined { .. })
    }
}

/// Every trigger the session reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    // Local user actions
    SubmitIdentity { name: String, avatar: Avatar },
    FindMatch,
    SubmitMove(Move),
    RequestRematch,
    FindNewMatch,

    // Server events
    Waiting,
    MatchFound {
        room_id: String,
        opponent_name: Option<String>,
        opponent_avatar: Option<String>,
    },
    GameResult {
        room_id: Option<String>,
        outcome: RoundOutcome,
        your_move: Option<Move>,
        opponent_move: Option<Move>,
        your_name: Option<String>,
        opponent_name: Option<String>,
    },
    RematchAccepted { room_id: Option<String> },
    RematchDeclined {
        room_id: Option<String>,
        message: Option<String>,
    },
    OpponentDisconnected { room_id: Option<String> },
    ServerError { message: String },

    // Transport lifecycle
    Connected,
    Disconnected,

    // Scheduled
    TimerElapsed(TimerTicket),
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SubmitIdentity { .. } => "submit_identity",
            Self::FindMatch => "find_match",
            Self::SubmitMove(_) => "submit_move",
            Self::RequestRematch => "request_rematch",
            Self::FindNewMatch => "find_new_match",
            Self::Waiting => "waiting",
            Self::MatchFound { .. } => "match_found",
            Self::GameResult { .. } => "game_result",
            Self::RematchAccepted { .. } => "rematch_accepted",
            Self::RematchDeclined { .. } => "rematch_declined",
            Self::OpponentDisconnected { .. } => "opponent_disconnected",
            Self::ServerError { .. } => "error",
            Self::Connected => "connect",
            Self::Disconnected => "disconnect",
            Self::TimerElapsed(_) => "timer",
        }
    }
}

/// Error when an inbound or scheduled trigger does not apply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ignored '{event}' in {from}: {reason}")]
pub struct InvalidTransition {
    pub from: Phase,
    pub event: &'static str,
    pub reason: &'static str,
}

/// Why a trigger was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// A local action failed validation
    #[error(transparent)]
    Action(#[from] ActionError),

    /// An inbound or scheduled trigger was discarded
    #[error(transparent)]
    Invalid(#[from] InvalidTransition),
}

/// Side effects of an applied transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Messages to send to the server, in order
    pub outbound: Vec<OutboundMessage>,

    /// Timers to schedule
    pub timers: Vec<TimerTicket>,
}

impl Transition {
    fn none() -> Self {
        Self::default()
    }

    fn send(msg: OutboundMessage) -> Self {
        Self {
            outbound: vec![msg],
            timers: Vec::new(),
        }
    }
}

/// The client's session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    phase: Phase,
    local_player: Option<LocalPlayer>,
    remote_player: Option<RemotePlayer>,
    last_result: Option<RoundRecord>,
    notice: Option<Notice>,
    rounds_played: u32,
    /// Bumped whenever the phase changes or timers are invalidated
    epoch: u64,
}

impl Session {
    /// Create a new idle session.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn room_id(&self) -> Option<&str> {
        self.phase.room_id()
    }

    pub fn pending_move(&self) -> Option<Move> {
        self.phase.pending_move()
    }

    /// True while this client awaits the opponent's rematch decision.
    pub fn rematch_flag(&self) -> bool {
        matches!(self.phase, Phase::RematchPending { .. })
    }

    pub fn local_player(&self) -> Option<&LocalPlayer> {
        self.local_player.as_ref()
    }

    pub fn remote_player(&self) -> Option<&RemotePlayer> {
        self.remote_player.as_ref()
    }

    pub fn last_result(&self) -> Option<&RoundRecord> {
        self.last_result.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn rounds_played(&self) -> u32 {
        self.rounds_played
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Record an inline hint for a rejected action.
    pub fn set_hint(&mut self, err: &ActionError) {
        self.notice = Some(Notice::Hint(err.to_string()));
    }

    /// Apply a trigger in place.
    ///
    /// On error the session is left untouched.
    pub fn apply(&mut self, event: SessionEvent) -> Result<Transition, TransitionError> {
        let mut next = self.clone();
        let transition = next.transition(event)?;
        if next.phase != self.phase {
            next.epoch += 1;
        }
        let transition = stamp_timers(transition, next.epoch);
        *self = next;
        Ok(transition)
    }

    fn transition(&mut self, event: SessionEvent) -> Result<Transition, TransitionError> {
        use Phase::*;
        use SessionEvent as E;

        let event_name = event.name();
        let invalid = |from: &Phase, reason: &'static str| {
            TransitionError::Invalid(InvalidTransition {
                from: from.clone(),
                event: event_name,
                reason,
            })
        };
        let not_allowed = |from: &Phase, action: &'static str| {
            TransitionError::Action(ActionError::NotAllowed {
                phase: from.name(),
                action,
            })
        };

        match event {
            // Identity: once, while idle
            E::SubmitIdentity { name, avatar } => {
                if self.local_player.is_some() {
                    return Err(ActionError::AlreadyIdentified.into());
                }
                if !self.phase.is_idle() {
                    return Err(not_allowed(&self.phase, "set identity"));
                }
                let player = LocalPlayer::new(&name, avatar)?;
                let msg = OutboundMessage::SetPlayerInfo {
                    name: player.name().to_string(),
                    avatar: player.avatar().as_str().to_string(),
                };
                self.local_player = Some(player);
                self.notice = None;
                Ok(Transition::send(msg))
            }

            E::FindMatch => {
                if !self.phase.is_idle() {
                    return Err(not_allowed(&self.phase, "find match"));
                }
                if self.local_player.is_none() {
                    return Err(ActionError::NotIdentified.into());
                }
                self.start_search();
                Ok(Transition::send(OutboundMessage::FindMatch))
            }

            E::FindNewMatch => {
                let Some(room_id) = self.phase.room_id().map(str::to_string) else {
                    return Err(not_allowed(&self.phase, "find new match"));
                };
                self.start_search();
                Ok(Transition {
                    outbound: vec![
                        OutboundMessage::FindNewMatch { room_id },
                        OutboundMessage::FindMatch,
                    ],
                    timers: Vec::new(),
                })
            }

            E::SubmitMove(mv) => match &self.phase {
                Matched { room_id } => {
                    self.phase = MoveSubmitted {
                        room_id: room_id.clone(),
                        pending_move: mv,
                    };
                    self.notice = None;
                    Ok(Transition::send(OutboundMessage::SendMove { mv }))
                }
                MoveSubmitted { .. } => Err(ActionError::MoveAlreadySubmitted.into()),
                other => Err(not_allowed(other, "submit move")),
            },

            E::RequestRematch => match &self.phase {
                RoundResolved {
                    room_id,
                    rematch_open: true,
                } => {
                    let room_id = room_id.clone();
                    self.phase = RematchPending {
                        room_id: room_id.clone(),
                    };
                    self.notice = None;
                    Ok(Transition::send(OutboundMessage::RequestRematch { room_id }))
                }
                other => Err(not_allowed(other, "request rematch")),
            },

            E::Waiting => match &self.phase {
                Matchmaking { .. } => {
                    self.phase = Matchmaking { queued: true };
                    Ok(Transition::none())
                }
                other => Err(invalid(other, "not searching")),
            },

            E::MatchFound {
                room_id,
                opponent_name,
                opponent_avatar,
            } => match &self.phase {
                Matchmaking { .. } if room_id.is_empty() => {
                    Err(invalid(&self.phase, "missing room id"))
                }
                Matchmaking { .. } => {
                    self.phase = Matched { room_id };
                    self.remote_player = Some(RemotePlayer::new(opponent_name, opponent_avatar));
                    self.last_result = None;
                    self.notice = None;
                    self.rounds_played = 0;
                    Ok(Transition::none())
                }
                other => Err(invalid(other, "not searching")),
            },

            E::GameResult {
                room_id,
                outcome,
                your_move,
                opponent_move,
                your_name,
                opponent_name,
            } => match &self.phase {
                MoveSubmitted {
                    room_id: current, ..
                } => {
                    if !same_room(current, room_id.as_deref()) {
                        return Err(invalid(&self.phase, "stale room"));
                    }
                    let current = current.clone();
                    self.last_result = Some(RoundRecord {
                        outcome,
                        your_move,
                        opponent_move,
                        your_name,
                        opponent_name,
                        resolved_at: chrono::Utc::now(),
                    });
                    self.rounds_played += 1;
                    self.notice = None;
                    self.phase = RoundResolved {
                        room_id: current.clone(),
                        rematch_open: false,
                    };
                    Ok(Transition {
                        outbound: Vec::new(),
                        timers: vec![ticket(TimerKind::RematchOffer, Some(current))],
                    })
                }
                other => Err(invalid(other, "no move in flight")),
            },

            E::RematchAccepted { room_id } => match &self.phase {
                RematchPending { room_id: current } => {
                    if !same_room(current, room_id.as_deref()) {
                        return Err(invalid(&self.phase, "stale room"));
                    }
                    self.phase = Matched {
                        room_id: current.clone(),
                    };
                    self.notice = None;
                    Ok(Transition::none())
                }
                other => Err(invalid(other, "no rematch requested")),
            },

            E::RematchDeclined { room_id, message } => match &self.phase {
                RematchPending { room_id: current } | RoundResolved { room_id: current, .. } => {
                    if !same_room(current, room_id.as_deref()) {
                        return Err(invalid(&self.phase, "stale room"));
                    }
                    self.end_pairing(Notice::RematchDeclined { message });
                    Ok(Transition {
                        outbound: Vec::new(),
                        timers: vec![ticket(TimerKind::DeclineReset, None)],
                    })
                }
                other => Err(invalid(other, "no rematch to decline")),
            },

            E::OpponentDisconnected { room_id } => match self.phase.room_id() {
                Some(current) => {
                    if !same_room(current, room_id.as_deref()) {
                        return Err(invalid(&self.phase, "stale room"));
                    }
                    let name = self
                        .remote_player
                        .as_ref()
                        .map(|r| r.display_name().to_string())
                        .unwrap_or_else(|| super::identity::UNKNOWN_OPPONENT.to_string());
                    self.end_pairing(Notice::OpponentLeft { name });
                    Ok(Transition {
                        outbound: Vec::new(),
                        timers: vec![ticket(TimerKind::OpponentLeftReset, None)],
                    })
                }
                None => Err(invalid(&self.phase, "not in a match")),
            },

            E::ServerError { message } => {
                self.notice = Some(Notice::ServerError(message));
                Ok(Transition::none())
            }

            E::Connected => match &self.phase {
                Terminated => {
                    self.phase = Idle;
                    self.notice = None;
                    Ok(Transition::none())
                }
                _ => Ok(Transition::none()),
            },

            E::Disconnected => {
                // Pending timers die with the connection
                self.epoch += 1;
                match &self.phase {
                    // The reset timer just died; finish the reset now
                    Idle if self.notice.as_ref().is_some_and(Notice::awaits_reset) => {
                        self.notice = None;
                        self.last_result = None;
                    }
                    Idle | Terminated => {}
                    RoundResolved {
                        rematch_open: false,
                        ..
                    } => {
                        self.phase = Idle;
                        self.remote_player = None;
                        self.rounds_played = 0;
                    }
                    Matchmaking { .. }
                    | Matched { .. }
                    | MoveSubmitted { .. }
                    | RoundResolved { .. }
                    | RematchPending { .. } => {
                        self.phase = Terminated;
                        self.remote_player = None;
                        self.last_result = None;
                        self.rounds_played = 0;
                        self.notice = Some(Notice::ConnectionLost);
                    }
                }
                Ok(Transition::none())
            }

            E::TimerElapsed(t) => {
                if t.epoch != self.epoch {
                    return Err(invalid(&self.phase, "stale timer"));
                }
                match (t.kind, &self.phase) {
                    (
                        TimerKind::RematchOffer,
                        RoundResolved {
                            room_id,
                            rematch_open: false,
                        },
                    ) if t.room_id.as_deref() == Some(room_id.as_str()) => {
                        self.phase = RoundResolved {
                            room_id: room_id.clone(),
                            rematch_open: true,
                        };
                        Ok(Transition::none())
                    }
                    (kind, Idle) if kind.is_reset() => {
                        self.notice = None;
                        self.last_result = None;
                        Ok(Transition::none())
                    }
                    (_, other) => Err(invalid(other, "timer no longer applies")),
                }
            }
        }
    }

    fn start_search(&mut self) {
        self.phase = Phase::Matchmaking { queued: false };
        self.remote_player = None;
        self.last_result = None;
        self.notice = None;
        self.rounds_played = 0;
    }

    fn end_pairing(&mut self, notice: Notice) {
        self.phase = Phase::Idle;
        self.remote_player = None;
        self.rounds_played = 0;
        self.notice = Some(notice);
    }
}

/// An inbound room ID matches when absent or equal to the current one.
fn same_room(current: &str, incoming: Option<&str>) -> bool {
    incoming.is_none_or(|id| id == current)
}

fn ticket(kind: TimerKind, room_id: Option<String>) -> TimerTicket {
    TimerTicket {
        epoch: 0,
        kind,
        room_id,
    }
}

fn stamp_timers(mut transition: Transition, epoch: u64) -> Transition {
    for ticket in &mut transition.timers {
        ticket.epoch = epoch;
    }
    transition
}
