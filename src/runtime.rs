//! Session event loop.
//!
//! [`SessionRuntime::run`] serialises transport events, user actions and
//! timer expiries into one stream and feeds them to the [`Dispatcher`] one
//! at a time. Render states are published on a watch channel; the UI holds
//! a [`SessionHandle`] to send actions and observe renders.
//!
//! # Example
//!
//! ```rust,ignore
//! let (transport, peer) = ChannelTransport::pair();
//! let (runtime, mut handle) = SessionRuntime::new(&ClientConfig::default(), transport);
//! tokio::spawn(runtime.run());
//!
//! handle.submit_identity("Alice")?;
//! handle.find_match()?;
//! let state = handle.wait_for(|r| r.phase == "Matched").await;
//! ```

use std::future::Future;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info};

use crate::config::ClientConfig;
use crate::dispatcher::{Dispatch, Dispatcher, UserAction};
use crate::error::TransportError;
use crate::presentation::RenderState;
use crate::protocol::{OutboundMessage, TransportEvent};
use crate::state::moves::Move;
use crate::state::timers::TimerQueue;

/// The connection to the game server.
///
/// Connection management and reconnection belong to the implementation;
/// the session only sees lifecycle events and named messages.
pub trait Transport {
    /// Send one message.
    fn send(
        &mut self,
        msg: OutboundMessage,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Next event, or `None` once the transport is gone for good.
    fn recv(&mut self) -> impl Future<Output = Option<TransportEvent>> + Send;
}

/// A [`Transport`] backed by in-process channels.
///
/// The other end ([`TransportPeer`]) is driven by whatever owns the real
/// socket, or by a test.
#[derive(Debug)]
pub struct ChannelTransport {
    outgoing: mpsc::UnboundedSender<OutboundMessage>,
    incoming: mpsc::UnboundedReceiver<TransportEvent>,
}

/// The far side of a [`ChannelTransport`].
#[derive(Debug)]
pub struct TransportPeer {
    pub to_client: mpsc::UnboundedSender<TransportEvent>,
    pub from_client: mpsc::UnboundedReceiver<OutboundMessage>,
}

impl ChannelTransport {
    pub fn pair() -> (Self, TransportPeer) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        (
            Self {
                outgoing: out_tx,
                incoming: in_rx,
            },
            TransportPeer {
                to_client: in_tx,
                from_client: out_rx,
            },
        )
    }
}

impl Transport for ChannelTransport {
    async fn send(&mut self, msg: OutboundMessage) -> Result<(), TransportError> {
        self.outgoing.send(msg).map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        self.incoming.recv().await
    }
}

/// UI-side handle to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    actions: mpsc::UnboundedSender<UserAction>,
    renders: watch::Receiver<RenderState>,
}

impl SessionHandle {
    /// Queue a user action.
    pub fn send(&self, action: UserAction) -> Result<(), TransportError> {
        self.actions.send(action).map_err(|_| TransportError::Closed)
    }

    pub fn submit_identity(&self, name: impl Into<String>) -> Result<(), TransportError> {
        self.send(UserAction::SubmitIdentity { name: name.into() })
    }

    pub fn find_match(&self) -> Result<(), TransportError> {
        self.send(UserAction::FindMatch)
    }

    pub fn submit_move(&self, mv: Move) -> Result<(), TransportError> {
        self.send(UserAction::SubmitMove(mv))
    }

    pub fn request_rematch(&self) -> Result<(), TransportError> {
        self.send(UserAction::RequestRematch)
    }

    pub fn find_new_match(&self) -> Result<(), TransportError> {
        self.send(UserAction::FindNewMatch)
    }

    /// Latest render state.
    pub fn render(&self) -> RenderState {
        self.renders.borrow().clone()
    }

    /// Wait until a render state satisfies `f`.
    ///
    /// Returns `None` if the runtime stopped first.
    pub async fn wait_for(&mut self, f: impl FnMut(&RenderState) -> bool) -> Option<RenderState> {
        self.renders.wait_for(f).await.ok().map(|r| r.clone())
    }

    /// A receiver for every published render state.
    pub fn subscribe(&self) -> watch::Receiver<RenderState> {
        self.renders.clone()
    }
}

enum Input {
    Timer,
    Transport(Option<TransportEvent>),
    Action(Option<UserAction>),
}

/// Owns the dispatcher, the transport and the timer queue.
pub struct SessionRuntime<T> {
    dispatcher: Dispatcher,
    transport: T,
    actions: mpsc::UnboundedReceiver<UserAction>,
    renders: watch::Sender<RenderState>,
    timers: TimerQueue,
}

impl<T: Transport> SessionRuntime<T> {
    pub fn new(config: &ClientConfig, transport: T) -> (Self, SessionHandle) {
        let dispatcher = Dispatcher::new(config);
        let (render_tx, render_rx) = watch::channel(dispatcher.render());
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        (
            Self {
                dispatcher,
                transport,
                actions: action_rx,
                renders: render_tx,
                timers: TimerQueue::new(),
            },
            SessionHandle {
                actions: action_tx,
                renders: render_rx,
            },
        )
    }

    /// Run until the transport is gone.
    ///
    /// Dropping every [`SessionHandle`] stops user input but the loop keeps
    /// draining the transport.
    pub async fn run(mut self) {
        debug!("session loop started");
        let mut actions_open = true;

        loop {
            let next = self.timers.next_deadline();
            let input = tokio::select! {
                biased;
                _ = sleep_until(next.unwrap_or_else(Instant::now)), if next.is_some() => Input::Timer,
                event = self.transport.recv() => Input::Transport(event),
                action = self.actions.recv(), if actions_open => Input::Action(action),
            };

            match input {
                Input::Timer => {
                    for ticket in self.timers.pop_due(Instant::now()) {
                        let dispatch = self.dispatcher.handle_timer(ticket);
                        self.settle(dispatch).await;
                    }
                }
                Input::Transport(Some(event)) => {
                    let dispatch = self.dispatcher.handle_transport(event);
                    self.settle(dispatch).await;
                }
                Input::Transport(None) => {
                    info!("transport closed");
                    let dispatch = self.dispatcher.handle_transport(TransportEvent::Disconnected {
                        reason: Some("transport closed".into()),
                    });
                    self.settle(dispatch).await;
                    break;
                }
                Input::Action(Some(action)) => {
                    let name = action.name();
                    match self.dispatcher.handle_user_action(action) {
                        Ok(dispatch) => self.settle(dispatch).await,
                        Err(err) => {
                            debug!(action = name, error = %err, "action rejected");
                            self.publish();
                        }
                    }
                }
                Input::Action(None) => {
                    debug!("all session handles dropped");
                    actions_open = false;
                }
            }
        }

        debug!("session loop exited");
    }

    /// Carry out a dispatch: send messages, arm timers, publish.
    async fn settle(&mut self, dispatch: Dispatch) {
        if dispatch.timers_invalidated {
            self.timers.retain_from(self.dispatcher.session().epoch());
        }

        let now = Instant::now();
        for timer in dispatch.timers {
            self.timers.schedule(now, timer);
        }

        if dispatch.changed {
            self.publish();
        }

        for msg in dispatch.outbound {
            let event = msg.event_name();
            if let Err(err) = self.transport.send(msg).await {
                error!(event, error = %err, "transport send failed");
                let dispatch = self.dispatcher.handle_transport(TransportEvent::Disconnected {
                    reason: Some(err.to_string()),
                });
                self.timers.clear();
                if dispatch.changed {
                    self.publish();
                }
                return;
            }
        }
    }

    fn publish(&self) {
        self.renders.send_replace(self.dispatcher.render());
    }
}
