// Live Transcriber Core - real-time monophonic pitch to note events
// Analysis runs inside the audio callback; a lock-free bridge hands note
// events and metering to the consumer thread.

// Module declarations
pub mod analysis;
pub mod audio;
pub mod bridge;
pub mod config;
pub mod detections;
pub mod error;
pub mod midi;
pub mod offline;
pub mod pitch;
pub mod session;

// Re-exports for convenience
pub use analysis::{Detector, NoteEvent, NoteEventKind};
pub use config::AppConfig;
pub use pitch::{frequency_to_note, note_name, note_to_frequency};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        let config = AppConfig::default();
        let (producer, _consumer) = bridge::channel(config.audio.event_queue_capacity);
        assert!(Detector::new(&config, producer).is_ok());
        assert_eq!(frequency_to_note(440.0), 69);
        assert_eq!(note_name(69), "A4");
    }
}
