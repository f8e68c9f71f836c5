//! Configuration for the booking engine.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Unparseable values fall back to the default rather than failing startup;
//! [`Config::validate`] catches values that parse but make no sense.

use crate::types::BookingLimits;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Booking service settings
    pub engine: EngineConfig,
    /// Notification dispatch settings
    pub dispatch: DispatchConfig,
    /// Log filter directive
    pub log_filter: String,
}

/// Booking service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Timeout for each persistence and identity call
    pub operation_timeout: Duration,
    /// Reload-and-retry attempts after an optimistic write conflict
    pub max_version_retries: u32,
    /// Longest accepted booking duration in minutes
    pub max_duration_minutes: u32,
}

impl EngineConfig {
    /// Creation limits derived from this configuration
    #[must_use]
    pub const fn limits(&self) -> BookingLimits {
        BookingLimits {
            max_duration_minutes: self.max_duration_minutes,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_millis(5000),
            max_version_retries: 3,
            max_duration_minutes: 24 * 60,
        }
    }
}

/// How notification deliveries relate to the operation that caused them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Spawned onto the runtime; the operation returns without waiting
    #[default]
    Detached,
    /// Awaited before the operation returns; failures are still swallowed
    Inline,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Detached => "detached",
            Self::Inline => "inline",
        })
    }
}

impl FromStr for DispatchMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "detached" => Ok(Self::Detached),
            "inline" => Ok(Self::Inline),
            _ => Err(ConfigError::UnknownDispatchMode(s.to_string())),
        }
    }
}

/// Notification dispatch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Whether deliveries are awaited
    pub mode: DispatchMode,
    /// Timeout for a single delivery
    pub timeout: Duration,
    /// Failed deliveries kept for later replay
    pub dead_letter_capacity: usize,
}

impl DispatchConfig {
    /// Inline dispatch with default limits
    #[must_use]
    pub fn inline() -> Self {
        Self {
            mode: DispatchMode::Inline,
            ..Self::default()
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: DispatchMode::Detached,
            timeout: Duration::from_millis(3000),
            dead_letter_capacity: 1000,
        }
    }
}

/// Configuration that parsed but cannot be used
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A timeout of zero would fail every call
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    /// No booking could ever be created
    #[error("maximum booking duration must be greater than zero")]
    ZeroMaxDuration,

    /// Dispatch mode name not recognized
    #[error("unknown dispatch mode {0:?}; expected detached or inline")]
    UnknownDispatchMode(String),
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `BOOKING_OPERATION_TIMEOUT_MS` | 5000 |
    /// | `BOOKING_MAX_VERSION_RETRIES` | 3 |
    /// | `BOOKING_MAX_DURATION_MINUTES` | 1440 |
    /// | `NOTIFICATION_DISPATCH_MODE` | `detached` |
    /// | `NOTIFICATION_TIMEOUT_MS` | 3000 |
    /// | `NOTIFICATION_DEAD_LETTER_CAPACITY` | 1000 |
    /// | `RUST_LOG` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        let engine_defaults = EngineConfig::default();
        let dispatch_defaults = DispatchConfig::default();

        Self {
            engine: EngineConfig {
                operation_timeout: parse_var("BOOKING_OPERATION_TIMEOUT_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(engine_defaults.operation_timeout),
                max_version_retries: parse_var("BOOKING_MAX_VERSION_RETRIES")
                    .unwrap_or(engine_defaults.max_version_retries),
                max_duration_minutes: parse_var("BOOKING_MAX_DURATION_MINUTES")
                    .unwrap_or(engine_defaults.max_duration_minutes),
            },
            dispatch: DispatchConfig {
                mode: parse_var("NOTIFICATION_DISPATCH_MODE").unwrap_or(dispatch_defaults.mode),
                timeout: parse_var("NOTIFICATION_TIMEOUT_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(dispatch_defaults.timeout),
                dead_letter_capacity: parse_var("NOTIFICATION_DEAD_LETTER_CAPACITY")
                    .unwrap_or(dispatch_defaults.dead_letter_capacity),
            },
            log_filter: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// Reject values that would make the engine unusable
    ///
    /// # Errors
    ///
    /// Returns error if a timeout or the maximum duration is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.operation_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("BOOKING_OPERATION_TIMEOUT_MS"));
        }
        if self.dispatch.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("NOTIFICATION_TIMEOUT_MS"));
        }
        if self.engine.max_duration_minutes == 0 {
            return Err(ConfigError::ZeroMaxDuration);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            dispatch: DispatchConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}
