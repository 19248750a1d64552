//! Presentation adapter.
//!
//! [`render`] projects a [`Session`] onto everything a UI needs to draw:
//! the status line, which controls are shown and enabled, the result
//! banner, and both player cards. It holds no state and may be called any
//! number of times.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::identity::{RemotePlayer, UNKNOWN_AVATAR, UNKNOWN_OPPONENT};
use crate::state::moves::{RoundOutcome, RoundRecord};
use crate::state::session::{Notice, Phase, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Neutral,
    Success,
    Waiting,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusLine {
    pub text: String,
    pub tone: Tone,
    /// Animate while queued for a match
    pub pulse: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Control {
    pub visible: bool,
    pub enabled: bool,
}

impl Control {
    const HIDDEN: Self = Self {
        visible: false,
        enabled: false,
    };

    fn shown(enabled: bool) -> Self {
        Self {
            visible: true,
            enabled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Controls {
    pub identity_form: Control,
    pub find_match: Control,
    pub moves: Control,
    pub rematch: Control,
    pub new_match: Control,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerKind {
    Win,
    Lose,
    Draw,
    OpponentLeft,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub kind: BannerKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerCard {
    pub name: String,
    pub avatar: String,
    /// Opponent card only: a pairing exists
    pub matched: bool,
}

/// Everything the rendering layer needs for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderState {
    pub phase: &'static str,
    pub room_id: Option<String>,
    pub status: StatusLine,
    pub controls: Controls,
    pub banner: Option<Banner>,
    pub local: Option<PlayerCard>,
    pub opponent: PlayerCard,
    /// When the current pairing was made
    pub matched_at: Option<DateTime<Utc>>,
    /// When the last shown result arrived
    pub result_at: Option<DateTime<Utc>>,
}

/// Project the session onto a render state.
pub fn render(session: &Session) -> RenderState {
    let phase = session.phase();
    let opponent_name = session
        .remote_player()
        .map(RemotePlayer::display_name)
        .unwrap_or(UNKNOWN_OPPONENT);

    let banner = banner(session);
    let result_at = banner
        .as_ref()
        .filter(|b| !matches!(b.kind, BannerKind::Error | BannerKind::OpponentLeft))
        .and(session.last_result())
        .map(|record| record.resolved_at);

    RenderState {
        phase: phase.name(),
        room_id: session.room_id().map(str::to_string),
        status: status_line(session, opponent_name),
        controls: controls(session),
        banner,
        local: session.local_player().map(|p| PlayerCard {
            name: p.name().to_string(),
            avatar: p.avatar().as_str().to_string(),
            matched: false,
        }),
        opponent: opponent_card(session.remote_player(), phase),
        matched_at: session.remote_player().map(|r| r.matched_at),
        result_at,
    }
}

fn status_line(session: &Session, opponent: &str) -> StatusLine {
    let line = |text: String, tone: Tone| StatusLine {
        text,
        tone,
        pulse: false,
    };

    if let Some(notice) = session.notice() {
        match notice {
            Notice::Hint(text) => return line(text.clone(), Tone::Error),
            Notice::ServerError(_) => return line("Something went wrong".into(), Tone::Error),
            Notice::ConnectionLost => {
                return line("Lost connection to server".into(), Tone::Error)
            }
            Notice::OpponentLeft { name } => return line(format!("{} left", name), Tone::Error),
            Notice::RematchDeclined { message } => {
                let text = message
                    .clone()
                    .unwrap_or_else(|| "Opponent doesn't want to play again".into());
                return line(text, Tone::Error);
            }
        }
    }

    match session.phase() {
        Phase::Idle if session.local_player().is_none() => {
            line("Enter your name to play".into(), Tone::Neutral)
        }
        Phase::Idle => line("Ready! Click Find match".into(), Tone::Success),
        Phase::Matchmaking { queued: false } => {
            line("Looking for an opponent...".into(), Tone::Waiting)
        }
        Phase::Matchmaking { queued: true } => StatusLine {
            text: "Waiting for an opponent...".into(),
            tone: Tone::Waiting,
            pulse: true,
        },
        Phase::Matched { .. } if session.rounds_played() > 0 => {
            line("Rematch! Choose your move".into(), Tone::Success)
        }
        Phase::Matched { .. } => match session.remote_player() {
            Some(remote) if remote.is_known() => line(
                format!(
                    "Found! Opponent: {} {}",
                    remote.display_name(),
                    remote.display_avatar()
                ),
                Tone::Success,
            ),
            _ => line("Opponent found! Choose your move".into(), Tone::Success),
        },
        Phase::MoveSubmitted { pending_move, .. } => line(
            format!("Picked {}, waiting for {}...", pending_move.label(), opponent),
            Tone::Info,
        ),
        Phase::RoundResolved {
            rematch_open: false,
            ..
        } => match session.last_result() {
            Some(record) => line(moves_summary(session, record), Tone::Info),
            None => line(String::new(), Tone::Info),
        },
        Phase::RoundResolved {
            rematch_open: true,
            ..
        } => line("Rematch or find a new match".into(), Tone::Success),
        Phase::RematchPending { .. } => {
            line(format!("Waiting for {} to decide...", opponent), Tone::Waiting)
        }
        Phase::Terminated => line("Lost connection to server".into(), Tone::Error),
    }
}

fn moves_summary(session: &Session, record: &RoundRecord) -> String {
    let you = record
        .your_name
        .as_deref()
        .or_else(|| session.local_player().map(|p| p.name()))
        .unwrap_or("You");
    let them = record.opponent_name.as_deref().unwrap_or(UNKNOWN_OPPONENT);
    let label = |mv: Option<crate::state::moves::Move>| mv.map(|m| m.label()).unwrap_or("?");
    format!(
        "{}: {} vs {}: {}",
        you,
        label(record.your_move),
        them,
        label(record.opponent_move)
    )
}

fn controls(session: &Session) -> Controls {
    let identified = session.local_player().is_some();
    let mut c = Controls {
        identity_form: Control::HIDDEN,
        find_match: Control::HIDDEN,
        moves: Control::HIDDEN,
        rematch: Control::HIDDEN,
        new_match: Control::HIDDEN,
    };

    match session.phase() {
        Phase::Idle | Phase::Terminated if !identified => {
            c.identity_form = Control::shown(true);
        }
        Phase::Idle | Phase::Terminated => c.find_match = Control::shown(true),
        Phase::Matchmaking { .. } => {}
        Phase::Matched { .. } => c.moves = Control::shown(true),
        Phase::MoveSubmitted { .. } => c.moves = Control::shown(false),
        Phase::RoundResolved { rematch_open, .. } if *rematch_open => {
            c.rematch = Control::shown(true);
            c.new_match = Control::shown(true);
        }
        Phase::RoundResolved { .. } => {}
        Phase::RematchPending { .. } => {
            c.rematch = Control::shown(false);
            c.new_match = Control::shown(false);
        }
    }
    c
}

fn banner(session: &Session) -> Option<Banner> {
    match session.notice() {
        Some(Notice::ServerError(message)) => {
            return Some(Banner {
                kind: BannerKind::Error,
                text: format!("❌ Error: {}", message),
            })
        }
        Some(Notice::OpponentLeft { .. }) => {
            return Some(Banner {
                kind: BannerKind::OpponentLeft,
                text: "❌ Opponent disconnected".into(),
            })
        }
        _ => {}
    }

    let showing_result = matches!(
        session.phase(),
        Phase::RoundResolved { .. } | Phase::RematchPending { .. }
    ) || matches!(session.notice(), Some(Notice::RematchDeclined { .. }));
    if !showing_result {
        return None;
    }

    let record = session.last_result()?;
    let (kind, text) = match record.outcome {
        RoundOutcome::Win => {
            let you = record
                .your_name
                .as_deref()
                .or_else(|| session.local_player().map(|p| p.name()))
                .unwrap_or("You");
            (BannerKind::Win, format!("🎉 {} WINS! 🎉", you))
        }
        RoundOutcome::Lose => {
            let them = record.opponent_name.as_deref().unwrap_or(UNKNOWN_OPPONENT);
            (BannerKind::Lose, format!("😢 {} WINS! 😢", them))
        }
        RoundOutcome::Draw => (BannerKind::Draw, "🤝 DRAW! 🤝".to_string()),
    };
    Some(Banner { kind, text })
}

fn opponent_card(remote: Option<&RemotePlayer>, phase: &Phase) -> PlayerCard {
    match remote {
        Some(remote) => PlayerCard {
            name: remote.display_name().to_string(),
            avatar: remote.display_avatar().to_string(),
            matched: phase.is_in_session(),
        },
        None => PlayerCard {
            name: "Searching...".into(),
            avatar: UNKNOWN_AVATAR.into(),
            matched: false,
        },
    }
}
