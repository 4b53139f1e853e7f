// Audio capture error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// Error code range: 1001-1006
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// No default input device is available
    pub const NO_INPUT_DEVICE: i32 = 1001;

    /// Failed to open the capture stream
    pub const STREAM_OPEN_FAILED: i32 = 1002;

    /// Device only offers a sample format we cannot consume
    pub const UNSUPPORTED_FORMAT: i32 = 1003;

    /// Stream was opened but refused to start
    pub const STREAM_START_FAILED: i32 = 1004;

    /// Stream could not be stopped cleanly
    pub const STREAM_STOP_FAILED: i32 = 1005;

    /// Hardware error occurred
    pub const HARDWARE_ERROR: i32 = 1006;
}

/// Log an audio error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=AudioEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// Everything except `StreamStopFailed` is fatal at startup: the CLI
/// releases what it already acquired and exits non-zero.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// No default input device
    NoInputDevice,

    /// Failed to open audio stream
    StreamOpenFailed { reason: String },

    /// Input sample format is not f32
    UnsupportedFormat { format: String },

    /// Failed to start the stream
    StreamStartFailed { reason: String },

    /// Failed to stop the stream during teardown
    StreamStopFailed { reason: String },

    /// Running stream reported a device failure (e.g. the device was unplugged)
    HardwareError { details: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::NoInputDevice => AudioErrorCodes::NO_INPUT_DEVICE,
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::UnsupportedFormat { .. } => AudioErrorCodes::UNSUPPORTED_FORMAT,
            AudioError::StreamStartFailed { .. } => AudioErrorCodes::STREAM_START_FAILED,
            AudioError::StreamStopFailed { .. } => AudioErrorCodes::STREAM_STOP_FAILED,
            AudioError::HardwareError { .. } => AudioErrorCodes::HARDWARE_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::NoInputDevice => "No default input device found".to_string(),
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::UnsupportedFormat { format } => {
                format!("Unsupported input sample format: {}", format)
            }
            AudioError::StreamStartFailed { reason } => {
                format!("Failed to start audio stream: {}", reason)
            }
            AudioError::StreamStopFailed { reason } => {
                format!("Failed to stop audio stream: {}", reason)
            }
            AudioError::HardwareError { details } => {
                format!("Hardware error: {}", details)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

impl From<cpal::StreamError> for AudioError {
    fn from(err: cpal::StreamError) -> Self {
        AudioError::HardwareError {
            details: err.to_string(),
        }
    }
}
