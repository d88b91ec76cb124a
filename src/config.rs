//! Client configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use crate::connection::ConnectTarget;

pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8080/ws";
pub const DEFAULT_COUNTDOWN_POLL_MS: u64 = 200;
pub const DEFAULT_TURN_SECS: u64 = 30;
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 1000;

const MIN_COUNTDOWN_POLL_MS: u64 = 10;
const MAX_COUNTDOWN_POLL_MS: u64 = 999;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("server URL must start with ws:// or wss://, got '{0}'")]
    InvalidServerUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Websocket endpoint, without query string.
    pub server_url: String,
    /// How often the turn timer recomputes the countdown. Always sub-second.
    pub countdown_poll: Duration,
    /// Nominal turn length, used for countdown progress display.
    pub turn_secs: u64,
    /// How long a closing socket may take to send its close frame.
    pub shutdown_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_owned(),
            countdown_poll: Duration::from_millis(DEFAULT_COUNTDOWN_POLL_MS),
            turn_secs: DEFAULT_TURN_SECS,
            shutdown_timeout: Duration::from_millis(DEFAULT_SHUTDOWN_TIMEOUT_MS),
        }
    }
}

impl ClientConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `STRIKER_SERVER_URL`: default `ws://localhost:8080/ws`
    /// - `STRIKER_COUNTDOWN_POLL_MS`: default 200, clamped to 10..=999
    /// - `STRIKER_TURN_SECS`: default 30
    /// - `STRIKER_SHUTDOWN_TIMEOUT_MS`: default 1000
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidServerUrl`] when the URL scheme is not
    /// `ws` or `wss`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_url = std::env::var("STRIKER_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_owned());
        let poll_ms = env_parse("STRIKER_COUNTDOWN_POLL_MS", DEFAULT_COUNTDOWN_POLL_MS);

        Self {
            countdown_poll: Duration::from_millis(clamp_poll_ms(poll_ms)),
            turn_secs: env_parse("STRIKER_TURN_SECS", DEFAULT_TURN_SECS),
            shutdown_timeout: Duration::from_millis(env_parse(
                "STRIKER_SHUTDOWN_TIMEOUT_MS",
                DEFAULT_SHUTDOWN_TIMEOUT_MS,
            )),
            ..Self::default()
        }
        .with_server_url(server_url)
    }

    /// Replace the server URL after validating its scheme.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidServerUrl`] for non-websocket URLs.
    pub fn with_server_url(mut self, url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        let trimmed = url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("ws://") || trimmed.starts_with("wss://")) {
            return Err(ConfigError::InvalidServerUrl(url));
        }
        self.server_url = trimmed.to_owned();
        Ok(self)
    }

    /// Full websocket URL for one room/player pair.
    #[must_use]
    pub fn connect_url(&self, target: &ConnectTarget) -> String {
        let separator = if self.server_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{separator}roomID={}&playerID={}",
            self.server_url, target.room_id, target.player_id
        )
    }
}

fn clamp_poll_ms(ms: u64) -> u64 {
    ms.clamp(MIN_COUNTDOWN_POLL_MS, MAX_COUNTDOWN_POLL_MS)
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
