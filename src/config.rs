use std::env;

use serde::{Deserialize, Serialize};

/// Session configuration, passed explicitly at construction time.
///
/// Verbosity gates all progress and diagnostic emission; there is no ambient
/// process-wide diagnostic state in this crate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Fix the rng seed so identical scripted input replays identically.
    pub deterministic: bool,
    /// Keep conversation state across turns instead of resetting the
    /// absolute position after each end-of-sequence.
    pub multiturn: bool,
    /// Hard budget on the absolute token position before the session is
    /// forced to terminate.
    pub max_tokens: usize,
    /// 0 = silent, 1 = input prompt and response separation, 2 = adds
    /// end-of-turn markers and per-turn token statistics.
    pub verbosity: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            deterministic: false,
            multiturn: false,
            max_tokens: 3072,
            verbosity: 1,
        }
    }
}

impl SessionConfig {
    /// Build a config from the defaults with `GEMMA_CHAT_*` environment
    /// overrides applied.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            deterministic: env_flag("GEMMA_CHAT_DETERMINISTIC", defaults.deterministic),
            multiturn: env_flag("GEMMA_CHAT_MULTITURN", defaults.multiturn),
            max_tokens: env::var("GEMMA_CHAT_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_tokens),
            verbosity: env::var("GEMMA_CHAT_VERBOSITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.verbosity),
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => matches!(v.as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert!(!config.deterministic);
        assert!(!config.multiturn);
        assert_eq!(config.max_tokens, 3072);
        assert_eq!(config.verbosity, 1);
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = SessionConfig {
            deterministic: true,
            multiturn: true,
            max_tokens: 128,
            verbosity: 2,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: SessionConfig = serde_json::from_str(&json).unwrap();
        assert!(back.deterministic);
        assert!(back.multiturn);
        assert_eq!(back.max_tokens, 128);
        assert_eq!(back.verbosity, 2);
    }
}
