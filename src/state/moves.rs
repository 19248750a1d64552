//! Moves and round outcomes.
//!
//! The client never decides who won a round; the server sends the outcome
//! and this module only gives it a type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ActionError;

/// One of the three legal moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

impl Move {
    pub const ALL: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

    /// Wire name ("ROCK", "PAPER", "SCISSORS").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rock => "ROCK",
            Self::Paper => "PAPER",
            Self::Scissors => "SCISSORS",
        }
    }

    /// Label shown next to a player's name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rock => "✊ Rock",
            Self::Paper => "✋ Paper",
            Self::Scissors => "✌️ Scissors",
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Move {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ROCK" => Ok(Self::Rock),
            "PAPER" => Ok(Self::Paper),
            "SCISSORS" => Ok(Self::Scissors),
            _ => Err(ActionError::InvalidMove(s.to_string())),
        }
    }
}

/// Round outcome from this client's point of view, as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoundOutcome {
    Win,
    Lose,
    Draw,
}

impl RoundOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Win => "WIN",
            Self::Lose => "LOSE",
            Self::Draw => "DRAW",
        }
    }
}

impl fmt::Display for RoundOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the server told us about a finished round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundRecord {
    pub outcome: RoundOutcome,
    pub your_move: Option<Move>,
    pub opponent_move: Option<Move>,
    pub your_name: Option<String>,
    pub opponent_name: Option<String>,
    pub resolved_at: chrono::DateTime<chrono::Utc>,
}
