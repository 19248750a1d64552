//! RPS Session Library
//!
//! Client-side session state for a two-player rock-paper-scissors
//! matchmaking game.
//!
//! # Overview
//!
//! - **Session State Machine** - Tracks where the local player is (idle,
//!   matchmaking, matched, move submitted, round resolved, rematch pending,
//!   terminated) with validated transitions.
//!
//! - **Protocol** - Decodes named server events and encodes the messages
//!   the client sends.
//!
//! - **Dispatcher** - Routes server events, transport lifecycle, user
//!   actions and timers into the state machine, one at a time.
//!
//! - **Presentation** - Projects the session onto a render state for the UI.
//!
//! - **Runtime** - A tokio task that owns the transport, the timers and the
//!   dispatcher.
//!
//! # Design Principles
//!
//! 1. **One writer** - Only the dispatcher mutates the session.
//!
//! 2. **Invalid states are unrepresentable** - A room ID or pending move
//!    only exists inside the phases that need it.
//!
//! 3. **Stale input is dropped** - Events for another room, events out of
//!    phase and timers from an earlier epoch never change state.
//!
//! 4. **No sockets** - The transport is a trait; this crate never opens a
//!    connection.
//!
//! # Example
//!
//! ```rust
//! use rps_session::config::ClientConfig;
//! use rps_session::dispatcher::{Dispatcher, UserAction};
//! use rps_session::state::{Move, Phase};
//! use serde_json::json;
//!
//! let mut dispatcher = Dispatcher::new(&ClientConfig::default());
//!
//! dispatcher
//!     .handle_user_action(UserAction::SubmitIdentity { name: "Alice".into() })
//!     .unwrap();
//! dispatcher.handle_user_action(UserAction::FindMatch).unwrap();
//! dispatcher.handle_inbound("match_found", json!({ "room_id": "R1", "opponent_name": "Bob" }));
//!
//! let sent = dispatcher
//!     .handle_user_action(UserAction::SubmitMove(Move::Rock))
//!     .unwrap();
//! assert_eq!(sent.outbound.len(), 1);
//! assert!(matches!(dispatcher.session().phase(), Phase::MoveSubmitted { .. }));
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod presentation;
pub mod protocol;
pub mod runtime;
pub mod state;

pub use config::ClientConfig;
pub use dispatcher::{Dispatch, Dispatcher, UserAction};
pub use error::{ActionError, ConfigError, ProtocolError, TransportError};
pub use presentation::{render, RenderState};
pub use protocol::{OutboundMessage, TransportEvent};
pub use runtime::{ChannelTransport, SessionHandle, SessionRuntime, Transport, TransportPeer};
pub use state::{Move, Phase, Session};
