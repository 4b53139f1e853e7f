// MIDI output error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// MIDI error code constants
///
/// Error code range: 2001-2004
pub struct MidiErrorCodes {}

impl MidiErrorCodes {
    /// No MIDI output port is available
    pub const NO_OUTPUT_PORT: i32 = 2001;

    /// MIDI subsystem could not be initialised
    pub const INIT_FAILED: i32 = 2002;

    /// Opening the output port failed
    pub const CONNECT_FAILED: i32 = 2003;

    /// Writing a message to the port failed
    pub const SEND_FAILED: i32 = 2004;
}

/// Log a MIDI error with structured context
pub fn log_midi_error(err: &MidiError, context: &str) {
    error!(
        "MIDI error in {}: code={}, component=MidiWriter, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// MIDI output errors
#[derive(Debug, Clone, PartialEq)]
pub enum MidiError {
    /// No output port found
    NoOutputPort,

    /// MIDI backend initialisation failed
    InitFailed { reason: String },

    /// Port connection failed
    ConnectFailed { reason: String },

    /// Message delivery failed
    SendFailed { reason: String },
}

impl ErrorCode for MidiError {
    fn code(&self) -> i32 {
        match self {
            MidiError::NoOutputPort => MidiErrorCodes::NO_OUTPUT_PORT,
            MidiError::InitFailed { .. } => MidiErrorCodes::INIT_FAILED,
            MidiError::ConnectFailed { .. } => MidiErrorCodes::CONNECT_FAILED,
            MidiError::SendFailed { .. } => MidiErrorCodes::SEND_FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            MidiError::NoOutputPort => concat!(
                "No MIDI output device found. ",
                "You may need a virtual MIDI cable or a connected device."
            )
            .to_string(),
            MidiError::InitFailed { reason } => format!("MIDI initialisation failed: {}", reason),
            MidiError::ConnectFailed { reason } => {
                format!("Failed to open MIDI output: {}", reason)
            }
            MidiError::SendFailed { reason } => format!("Failed to send MIDI message: {}", reason),
        }
    }
}

impl fmt::Display for MidiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MidiError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for MidiError {}
