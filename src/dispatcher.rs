//! Event dispatcher.
//!
//! Owns the [`Session`] and is the only thing that mutates it. Inbound
//! server events, transport lifecycle events, user actions and elapsed
//! timers all come through here; each call applies at most one transition
//! and reports what has to happen next (messages to send, timers to arm).

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::ActionError;
use crate::presentation::{self, RenderState};
use crate::protocol::{InboundEvent, OutboundMessage, TransportEvent};
use crate::state::identity::Avatar;
use crate::state::moves::Move;
use crate::state::session::{Session, SessionEvent, TransitionError};
use crate::state::timers::{ScheduledTimer, TimerDelays, TimerTicket};

/// Something the local user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    SubmitIdentity { name: String },
    FindMatch,
    SubmitMove(Move),
    RequestRematch,
    FindNewMatch,
}

impl UserAction {
    /// Build a move submission from the raw button value.
    pub fn submit_move(raw: &str) -> Result<Self, ActionError> {
        raw.parse().map(Self::SubmitMove)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SubmitIdentity { .. } => "submit_identity",
            Self::FindMatch => "find_match",
            Self::SubmitMove(_) => "submit_move",
            Self::RequestRematch => "request_rematch",
            Self::FindNewMatch => "find_new_match",
        }
    }
}

/// Result of handling one trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dispatch {
    /// Messages to send, in order
    pub outbound: Vec<OutboundMessage>,

    /// Timers to arm
    pub timers: Vec<ScheduledTimer>,

    /// The session changed and should be re-rendered
    pub changed: bool,

    /// Pending timers from earlier epochs are dead
    pub timers_invalidated: bool,
}

impl Dispatch {
    fn unchanged() -> Self {
        Self::default()
    }
}

/// Routes triggers into the session state machine.
#[derive(Debug)]
pub struct Dispatcher {
    session: Session,
    delays: TimerDelays,
    rng: StdRng,
}

impl Dispatcher {
    pub fn new(config: &ClientConfig) -> Self {
        let rng = match config.avatar_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            session: Session::new(),
            delays: config.delays(),
            rng,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Current render state.
    pub fn render(&self) -> RenderState {
        presentation::render(&self.session)
    }

    /// Handle a named server or transport event.
    ///
    /// Undecodable, unknown, stale or out-of-phase events are logged and
    /// dropped; they never fail the caller.
    pub fn handle_inbound(&mut self, event: &str, payload: Value) -> Dispatch {
        let session_event = match event {
            "connect" => SessionEvent::Connected,
            "disconnect" => SessionEvent::Disconnected,
            _ => match InboundEvent::decode(event, payload) {
                Ok(decoded) => decoded.into(),
                Err(err) => {
                    warn!(event, error = %err, "dropping inbound event");
                    return Dispatch::unchanged();
                }
            },
        };

        if let SessionEvent::ServerError { message } = &session_event {
            warn!(phase = %self.session.phase(), reason = %message, "server reported error");
        }

        match self.apply(session_event) {
            Ok(dispatch) => dispatch,
            Err(err) => {
                warn!(event, error = %err, "discarded inbound event");
                Dispatch::unchanged()
            }
        }
    }

    /// Handle a transport lifecycle or message event.
    pub fn handle_transport(&mut self, event: TransportEvent) -> Dispatch {
        match event {
            TransportEvent::Connected => self.handle_inbound("connect", Value::Null),
            TransportEvent::Disconnected { reason } => {
                info!(
                    phase = %self.session.phase(),
                    reason = reason.as_deref().unwrap_or("unknown"),
                    "transport disconnected"
                );
                self.handle_inbound("disconnect", Value::Null)
            }
            TransportEvent::Message { event, payload } => self.handle_inbound(&event, payload),
        }
    }

    /// Handle a user action.
    ///
    /// A rejected action sends nothing; the reason is left on the session
    /// as an inline hint and returned.
    pub fn handle_user_action(&mut self, action: UserAction) -> Result<Dispatch, ActionError> {
        let event = match action {
            UserAction::SubmitIdentity { name } => SessionEvent::SubmitIdentity {
                name,
                avatar: Avatar::random(&mut self.rng),
            },
            UserAction::FindMatch => SessionEvent::FindMatch,
            UserAction::SubmitMove(mv) => SessionEvent::SubmitMove(mv),
            UserAction::RequestRematch => SessionEvent::RequestRematch,
            UserAction::FindNewMatch => SessionEvent::FindNewMatch,
        };

        match self.apply(event) {
            Ok(dispatch) => Ok(dispatch),
            Err(TransitionError::Action(err)) => {
                debug!(phase = %self.session.phase(), error = %err, "rejected user action");
                self.session.set_hint(&err);
                Err(err)
            }
            Err(TransitionError::Invalid(invalid)) => {
                debug!(error = %invalid, "rejected user action");
                let err = ActionError::NotAllowed {
                    phase: invalid.from.name(),
                    action: invalid.event,
                };
                self.session.set_hint(&err);
                Err(err)
            }
        }
    }

    /// Handle an elapsed timer. Stale tickets are dropped.
    pub fn handle_timer(&mut self, ticket: TimerTicket) -> Dispatch {
        let (kind, epoch) = (ticket.kind, ticket.epoch);
        match self.apply(SessionEvent::TimerElapsed(ticket)) {
            Ok(dispatch) => dispatch,
            Err(err) => {
                debug!(%kind, epoch, error = %err, "stale timer");
                Dispatch::unchanged()
            }
        }
    }

    fn apply(&mut self, event: SessionEvent) -> Result<Dispatch, TransitionError> {
        let name = event.name();
        let before = self.session.clone();
        let transition = self.session.apply(event)?;

        if before.phase() != self.session.phase() {
            info!(
                event = name,
                from = %before.phase(),
                to = %self.session.phase(),
                room_id = self.session.room_id().or(before.room_id()),
                "session transition"
            );
        } else {
            debug!(event = name, phase = %self.session.phase(), "session updated");
        }

        Ok(Dispatch {
            outbound: transition.outbound,
            timers: transition
                .timers
                .into_iter()
                .map(|ticket| self.delays.schedule(ticket))
                .collect(),
            changed: before != self.session,
            timers_invalidated: before.epoch() != self.session.epoch(),
        })
    }
}
