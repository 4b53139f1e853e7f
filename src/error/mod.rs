// Error types for the live transcriber
//
// Each subsystem that can fail at its boundary (audio capture, MIDI output,
// configuration) gets its own enum with stable numeric codes. Analysis itself
// cannot fail: the estimator and note mapper return "no pitch"/"no note".

mod audio;
mod config;
mod midi;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use config::{ConfigError, ConfigErrorCodes};
pub use midi::{log_midi_error, MidiError, MidiErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, so the CLI can report failures uniformly.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
