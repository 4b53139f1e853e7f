// Configuration validation errors

use crate::error::ErrorCode;
use std::fmt;

/// Configuration error code constants
///
/// Error code range: 3001-3005
pub struct ConfigErrorCodes {}

impl ConfigErrorCodes {
    pub const INVALID_SAMPLE_RATE: i32 = 3001;
    pub const INVALID_WINDOW_SIZE: i32 = 3002;
    pub const INVALID_FREQUENCY_BAND: i32 = 3003;
    pub const INVALID_THRESHOLD: i32 = 3004;
    pub const INVALID_QUEUE_CAPACITY: i32 = 3005;
}

/// Rejected configuration values
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Sample rate must be > 0
    InvalidSampleRate { sample_rate: u32 },

    /// Window size must be even and at least 2
    InvalidWindowSize { window_size: usize },

    /// Band must satisfy 0 < min < max
    InvalidFrequencyBand { min_hz: f64, max_hz: f64 },

    /// A threshold or hysteresis count is out of range
    InvalidThreshold { name: &'static str, value: f64 },

    /// Event queue needs at least one slot
    InvalidQueueCapacity { capacity: usize },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> i32 {
        match self {
            ConfigError::InvalidSampleRate { .. } => ConfigErrorCodes::INVALID_SAMPLE_RATE,
            ConfigError::InvalidWindowSize { .. } => ConfigErrorCodes::INVALID_WINDOW_SIZE,
            ConfigError::InvalidFrequencyBand { .. } => ConfigErrorCodes::INVALID_FREQUENCY_BAND,
            ConfigError::InvalidThreshold { .. } => ConfigErrorCodes::INVALID_THRESHOLD,
            ConfigError::InvalidQueueCapacity { .. } => ConfigErrorCodes::INVALID_QUEUE_CAPACITY,
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigError::InvalidSampleRate { sample_rate } => {
                format!("Sample rate must be greater than 0 (got {})", sample_rate)
            }
            ConfigError::InvalidWindowSize { window_size } => {
                format!(
                    "Window size must be an even number >= 2 (got {})",
                    window_size
                )
            }
            ConfigError::InvalidFrequencyBand { min_hz, max_hz } => {
                format!(
                    "Frequency band must satisfy 0 < min < max (got {} - {} Hz)",
                    min_hz, max_hz
                )
            }
            ConfigError::InvalidThreshold { name, value } => {
                format!("Invalid value for {}: {}", name, value)
            }
            ConfigError::InvalidQueueCapacity { capacity } => {
                format!("Event queue capacity must be at least 1 (got {})", capacity)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConfigError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_codes() {
        assert_eq!(
            ConfigError::InvalidSampleRate { sample_rate: 0 }.code(),
            3001
        );
        assert_eq!(
            ConfigError::InvalidWindowSize { window_size: 3 }.code(),
            3002
        );
        assert_eq!(
            ConfigError::InvalidFrequencyBand {
                min_hz: 10.0,
                max_hz: 5.0
            }
            .code(),
            3003
        );
        assert_eq!(
            ConfigError::InvalidThreshold {
                name: "magnitude_floor",
                value: -1.0
            }
            .code(),
            3004
        );
        assert_eq!(
            ConfigError::InvalidQueueCapacity { capacity: 0 }.code(),
            3005
        );
    }

    #[test]
    fn test_config_error_message() {
        let err = ConfigError::InvalidWindowSize { window_size: 7 };
        assert!(err.message().contains("got 7"));
    }
}
