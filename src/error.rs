//! Error types.
//!
//! Nothing here is fatal: every error path leaves the session in a valid,
//! resettable state.

use thiserror::Error;

/// A user action rejected locally. Nothing was sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("name must have at least {min} visible characters")]
    NameTooShort { min: usize },

    #[error("player identity is already set")]
    AlreadyIdentified,

    #[error("enter a name before looking for a match")]
    NotIdentified,

    #[error("invalid move: {0}")]
    InvalidMove(String),

    #[error("a move was already submitted this round")]
    MoveAlreadySubmitted,

    #[error("{action} is not available while {phase}")]
    NotAllowed {
        phase: &'static str,
        action: &'static str,
    },
}

/// An inbound event that could not be decoded.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed payload for '{event}': {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown event '{0}'")]
    UnknownEvent(String),
}

/// Failure in the transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("send failed: {0}")]
    Send(String),
}

/// Failure loading client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_error_messages() {
        assert_eq!(
            ActionError::NameTooShort { min: 2 }.to_string(),
            "name must have at least 2 visible characters"
        );
        assert_eq!(
            ActionError::NotAllowed {
                phase: "Matchmaking",
                action: "request rematch",
            }
            .to_string(),
            "request rematch is not available while Matchmaking"
        );
    }

    #[test]
    fn test_protocol_error_keeps_source() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ProtocolError::Payload {
            event: "match_found".to_string(),
            source,
        };
        assert!(err.to_string().starts_with("malformed payload for 'match_found'"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
