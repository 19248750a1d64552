//! Client configuration.
//!
//! Values resolve in order: defaults, then the TOML file named by
//! `RPS_CONFIG`, then individual `RPS_*` environment variables.

use std::fs;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::state::timers::TimerDelays;

/// Longest delay accepted for any timer.
pub const MAX_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// How long a round result stays on screen before rematch controls show
    pub result_grace: Duration,

    /// Delay before resetting after a declined rematch
    pub decline_reset_delay: Duration,

    /// Delay before resetting after the opponent left
    pub opponent_left_reset_delay: Duration,

    /// Fixed seed for avatar selection (tests, replays)
    pub avatar_seed: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let delays = TimerDelays::default();
        Self {
            result_grace: delays.result_grace,
            decline_reset_delay: delays.decline_reset,
            opponent_left_reset_delay: delays.opponent_left_reset,
            avatar_seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Default,
    File,
    Env,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigSources {
    pub result_grace: ValueSource,
    pub decline_reset_delay: ValueSource,
    pub opponent_left_reset_delay: ValueSource,
    pub avatar_seed: ValueSource,
}

impl Default for ConfigSources {
    fn default() -> Self {
        Self {
            result_grace: ValueSource::Default,
            decline_reset_delay: ValueSource::Default,
            opponent_left_reset_delay: ValueSource::Default,
            avatar_seed: ValueSource::Default,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigResolved {
    pub config: ClientConfig,
    pub sources: ConfigSources,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    result_grace_ms: Option<u64>,
    #[serde(default)]
    decline_reset_ms: Option<u64>,
    #[serde(default)]
    opponent_left_reset_ms: Option<u64>,
    #[serde(default)]
    avatar_seed: Option<u64>,
}

impl ClientConfig {
    /// Timer delays for the dispatcher.
    pub fn delays(&self) -> TimerDelays {
        TimerDelays {
            result_grace: self.result_grace,
            decline_reset: self.decline_reset_delay,
            opponent_left_reset: self.opponent_left_reset_delay,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, delay) in [
            ("result_grace", self.result_grace),
            ("decline_reset_delay", self.decline_reset_delay),
            ("opponent_left_reset_delay", self.opponent_left_reset_delay),
        ] {
            if delay.is_zero() {
                return Err(ConfigError::Invalid(format!("{name} must be > 0")));
            }
            if delay > MAX_DELAY {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be at most {}s",
                    MAX_DELAY.as_secs()
                )));
            }
        }
        Ok(())
    }
}

/// Load configuration from the process environment.
pub fn load() -> Result<ClientConfig, ConfigError> {
    load_with_sources().map(|resolved| resolved.config)
}

pub fn load_with_sources() -> Result<ConfigResolved, ConfigError> {
    let file = match std::env::var("RPS_CONFIG") {
        Ok(path) if !path.is_empty() => Some(fs::read_to_string(path)?),
        _ => None,
    };
    resolve(file.as_deref(), |key| std::env::var(key).ok())
}

/// Resolve configuration from optional TOML text and an environment lookup.
pub fn resolve(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ConfigResolved, ConfigError> {
    let mut cfg = ClientConfig::default();
    let mut sources = ConfigSources::default();

    if let Some(text) = file {
        let f: FileConfig = toml::from_str(text)?;
        if let Some(ms) = f.result_grace_ms {
            cfg.result_grace = Duration::from_millis(ms);
            sources.result_grace = ValueSource::File;
        }
        if let Some(ms) = f.decline_reset_ms {
            cfg.decline_reset_delay = Duration::from_millis(ms);
            sources.decline_reset_delay = ValueSource::File;
        }
        if let Some(ms) = f.opponent_left_reset_ms {
            cfg.opponent_left_reset_delay = Duration::from_millis(ms);
            sources.opponent_left_reset_delay = ValueSource::File;
        }
        if let Some(seed) = f.avatar_seed {
            cfg.avatar_seed = Some(seed);
            sources.avatar_seed = ValueSource::File;
        }
    }

    let var = |key: &str| env(key).filter(|v| !v.is_empty());

    if let Some(v) = var("RPS_RESULT_GRACE_MS") {
        cfg.result_grace = parse_millis("RPS_RESULT_GRACE_MS", &v)?;
        sources.result_grace = ValueSource::Env;
    }
    if let Some(v) = var("RPS_DECLINE_RESET_MS") {
        cfg.decline_reset_delay = parse_millis("RPS_DECLINE_RESET_MS", &v)?;
        sources.decline_reset_delay = ValueSource::Env;
    }
    if let Some(v) = var("RPS_OPPONENT_LEFT_RESET_MS") {
        cfg.opponent_left_reset_delay = parse_millis("RPS_OPPONENT_LEFT_RESET_MS", &v)?;
        sources.opponent_left_reset_delay = ValueSource::Env;
    }
    if let Some(v) = var("RPS_AVATAR_SEED") {
        cfg.avatar_seed = Some(
            v.parse()
                .map_err(|_| ConfigError::Invalid("Invalid RPS_AVATAR_SEED".into()))?,
        );
        sources.avatar_seed = ValueSource::Env;
    }

    cfg.validate()?;
    Ok(ConfigResolved {
        config: cfg,
        sources,
    })
}

fn parse_millis(key: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::Invalid(format!("Invalid {key}: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let resolved = resolve(None, env_of(&[])).unwrap();
        assert_eq!(resolved.config, ClientConfig::default());
        assert_eq!(resolved.config.result_grace, Duration::from_secs(2));
        assert_eq!(resolved.config.opponent_left_reset_delay, Duration::from_secs(3));
        assert_eq!(resolved.sources.result_grace, ValueSource::Default);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = "result_grace_ms = 1500\navatar_seed = 9\n";
        let resolved = resolve(
            Some(file),
            env_of(&[("RPS_RESULT_GRACE_MS", "500"), ("RPS_DECLINE_RESET_MS", "")]),
        )
        .unwrap();

        assert_eq!(resolved.config.result_grace, Duration::from_millis(500));
        assert_eq!(resolved.sources.result_grace, ValueSource::Env);
        assert_eq!(resolved.config.avatar_seed, Some(9));
        assert_eq!(resolved.sources.avatar_seed, ValueSource::File);
        assert_eq!(resolved.sources.decline_reset_delay, ValueSource::Default);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            resolve(None, env_of(&[("RPS_RESULT_GRACE_MS", "soon")])),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            resolve(Some("decline_reset_ms = 0"), env_of(&[])),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            resolve(Some("opponent_left_reset_ms = 120000"), env_of(&[])),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            resolve(Some("result_grace_ms = ["), env_of(&[])),
            Err(ConfigError::Parse(_))
        ));
    }
}
