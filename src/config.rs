use serde::Deserialize;
use thiserror::Error;
use web_time::Duration;

const DEFAULT_RATE_LIMIT_MAX: u32 = 20;
const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 10_000;
const DEFAULT_MAX_NAME_LENGTH: usize = 20;
const DEFAULT_MAX_CHAT_LENGTH: usize = 200;
const DEFAULT_NAME: &str = "Guest";

/// Per-room tunables. Every field falls back to its default when omitted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoomConfig {
    pub rate_limit_max: u32,
    pub rate_limit_window_ms: u64,
    pub max_name_length: usize,
    pub max_chat_length: usize,
    pub default_name: String,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            rate_limit_max: DEFAULT_RATE_LIMIT_MAX,
            rate_limit_window_ms: DEFAULT_RATE_LIMIT_WINDOW_MS,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            max_chat_length: DEFAULT_MAX_CHAT_LENGTH,
            default_name: DEFAULT_NAME.to_string(),
        }
    }
}

impl RoomConfig {
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.rate_limit_max == 0 {
            return Err(ConfigError::Zero("rateLimitMax"));
        }
        if self.rate_limit_window_ms == 0 {
            return Err(ConfigError::Zero("rateLimitWindowMs"));
        }
        if self.max_name_length == 0 {
            return Err(ConfigError::Zero("maxNameLength"));
        }
        if self.max_chat_length == 0 {
            return Err(ConfigError::Zero("maxChatLength"));
        }
        if self.default_name.trim().is_empty() {
            return Err(ConfigError::EmptyDefaultName);
        }
        Ok(self)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("defaultName must not be blank")]
    EmptyDefaultName,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_fields_take_defaults() {
        let config: RoomConfig = serde_json::from_str(r#"{"maxChatLength": 80}"#).unwrap();

        assert_eq!(config.max_chat_length, 80);
        assert_eq!(config.rate_limit_max, 20);
        assert_eq!(config.rate_limit_window(), Duration::from_secs(10));
        assert_eq!(config.max_name_length, 20);
        assert_eq!(config.default_name, "Guest");
    }

    #[test]
    fn zero_limits_are_rejected() {
        let config = RoomConfig {
            rate_limit_window_ms: 0,
            ..RoomConfig::default()
        };

        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero("rateLimitWindowMs"))
        );
        assert!(RoomConfig::default().validate().is_ok());
    }
}
