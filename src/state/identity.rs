//! Player identities.
//!
//! The local player picks a name once per session and gets a random avatar
//! from a fixed set. The remote player is whatever the server reported on
//! `match_found`.

use rand::Rng;

use crate::error::ActionError;

/// Minimum number of visible characters in a display name.
pub const MIN_NAME_CHARS: usize = 2;

/// Shown when the server did not send an opponent name.
pub const UNKNOWN_OPPONENT: &str = "Opponent";

/// Shown when the server did not send an opponent avatar.
pub const UNKNOWN_AVATAR: &str = "❓";

/// The fixed avatar set.
pub const AVATARS: [&str; 30] = [
    "😀", "😃", "😄", "😁", "😆", "😊", "😎", "🤓", "🥳", "🤩", "😺", "😸", "😹", "😻", "🐶",
    "🐱", "🐭", "🐹", "🐰", "🦊", "🐻", "🐼", "🐨", "🐯", "🦁", "🐮", "🐷", "🐸", "🐵", "🙈",
];

/// An avatar token, always one of [`AVATARS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Avatar(usize);

impl Avatar {
    /// Pick an avatar uniformly at random.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.random_range(0..AVATARS.len()))
    }

    /// Look up an avatar by its token.
    pub fn from_token(token: &str) -> Option<Self> {
        AVATARS.iter().position(|a| *a == token).map(Self)
    }

    pub fn as_str(&self) -> &'static str {
        AVATARS[self.0]
    }
}

/// Trim a display name and check it has enough visible characters.
pub fn validate_name(raw: &str) -> Result<String, ActionError> {
    let name = raw.trim();
    let visible = name.chars().filter(|c| is_visible(*c)).count();
    if visible < MIN_NAME_CHARS {
        return Err(ActionError::NameTooShort {
            min: MIN_NAME_CHARS,
        });
    }
    Ok(name.to_string())
}

fn is_visible(c: char) -> bool {
    !c.is_control() && !c.is_whitespace() && !matches!(c, '\u{200B}'..='\u{200D}' | '\u{FEFF}')
}

/// This client's player. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPlayer {
    name: String,
    avatar: Avatar,
}

impl LocalPlayer {
    /// Validate the name and assign an avatar.
    pub fn new(raw_name: &str, avatar: Avatar) -> Result<Self, ActionError> {
        Ok(Self {
            name: validate_name(raw_name)?,
            avatar,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn avatar(&self) -> Avatar {
        self.avatar
    }
}

/// The opponent for the current pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePlayer {
    /// Name as sent by the server, if any
    pub name: Option<String>,

    /// Avatar token as sent by the server, if any
    pub avatar: Option<String>,

    /// When the pairing was made
    pub matched_at: chrono::DateTime<chrono::Utc>,
}

impl RemotePlayer {
    pub fn new(name: Option<String>, avatar: Option<String>) -> Self {
        Self {
            name: name.filter(|n| !n.trim().is_empty()),
            avatar: avatar.filter(|a| !a.is_empty()),
            matched_at: chrono::Utc::now(),
        }
    }

    /// Name to show, falling back to a generic label.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_OPPONENT)
    }

    pub fn display_avatar(&self) -> &str {
        self.avatar.as_deref().unwrap_or(UNKNOWN_AVATAR)
    }

    /// Both name and avatar were provided.
    pub fn is_known(&self) -> bool {
        self.name.is_some() && self.avatar.is_some()
    }
}
