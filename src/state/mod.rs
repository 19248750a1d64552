//! Session state.
//!
//! - `session` - the phase state machine and its transition table
//! - `identity` - local and remote player identity, avatars
//! - `moves` - moves, outcomes and round records
//! - `timers` - delayed transitions and their tickets
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Session                            │
//! │                                                              │
//! │  phase ─────────── Phase (room_id, pending move live here)   │
//! │  local_player ──── LocalPlayer   (set once)                  │
//! │  remote_player ─── RemotePlayer  (per pairing)               │
//! │  last_result ───── RoundRecord                               │
//! │  notice ────────── Notice        (transient status override) │
//! │  epoch ─────────── bumped on every phase change              │
//! │                                                              │
//! │  apply(SessionEvent) ──▶ Transition { outbound, timers }     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use rps_session::state::{Avatar, Session, SessionEvent};
//!
//! let mut session = Session::new();
//! session.apply(SessionEvent::SubmitIdentity {
//!     name: "Alice".into(),
//!     avatar: Avatar::from_token("🦊").unwrap(),
//! })?;
//! let transition = session.apply(SessionEvent::FindMatch)?;
//! assert_eq!(transition.outbound.len(), 1);
//! ```

pub mod identity;
pub mod moves;
pub mod session;
pub mod timers;

pub use identity::{Avatar, LocalPlayer, RemotePlayer, AVATARS, MIN_NAME_CHARS};
pub use moves::{Move, RoundOutcome, RoundRecord};
pub use session::{
    InvalidTransition, Notice, Phase, Session, SessionEvent, Transition, TransitionError,
};
pub use timers::{ScheduledTimer, TimerDelays, TimerKind, TimerQueue, TimerTicket};
