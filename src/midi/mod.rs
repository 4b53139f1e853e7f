// MIDI output - channel-voice note messages for detected notes
//
// MidiWriter turns NoteEvents into Note-On/Note-Off messages and hands them
// to a MidiSink. Both on and off use status 0x90 (channel 1); note-off is
// expressed as velocity 0.

use crate::analysis::{NoteEvent, NoteEventKind};
use crate::error::MidiError;
use crate::pitch::{NoteNumber, NO_NOTE};

/// Note-On status byte, channel 1
pub const NOTE_ON_STATUS: u8 = 0x90;

/// Velocity used for every Note-On
pub const NOTE_ON_VELOCITY: u8 = 100;

/// A three-byte channel-voice message with its delivery time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiMessage {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
    pub timestamp_sec: f64,
}

impl MidiMessage {
    pub fn note_on(note: NoteNumber, timestamp_sec: f64) -> Self {
        Self {
            status: NOTE_ON_STATUS,
            data1: note,
            data2: NOTE_ON_VELOCITY,
            timestamp_sec,
        }
    }

    pub fn note_off(note: NoteNumber, timestamp_sec: f64) -> Self {
        Self {
            status: NOTE_ON_STATUS,
            data1: note,
            data2: 0,
            timestamp_sec,
        }
    }

    pub fn bytes(&self) -> [u8; 3] {
        [self.status, self.data1, self.data2]
    }

    pub fn is_note_off(&self) -> bool {
        self.data2 == 0
    }
}

/// Destination for MIDI messages
pub trait MidiSink {
    fn send(&mut self, message: &MidiMessage) -> Result<(), MidiError>;
}

/// Sink that only traces the messages it receives
#[derive(Debug, Default)]
pub struct LogMidiSink {
    sent: usize,
}

impl LogMidiSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> usize {
        self.sent
    }
}

impl MidiSink for LogMidiSink {
    fn send(&mut self, message: &MidiMessage) -> Result<(), MidiError> {
        self.sent += 1;
        tracing::debug!(
            "[MidiWriter] {:#04x} {} {} at {:.3}s",
            message.status,
            message.data1,
            message.data2,
            message.timestamp_sec
        );
        Ok(())
    }
}

impl<S: MidiSink + ?Sized> MidiSink for Box<S> {
    fn send(&mut self, message: &MidiMessage) -> Result<(), MidiError> {
        (**self).send(message)
    }
}

/// Tracks the sounding note and forwards note events to a sink
pub struct MidiWriter<S: MidiSink> {
    sink: S,
    sounding: NoteNumber,
}

impl<S: MidiSink> MidiWriter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            sounding: NO_NOTE,
        }
    }

    /// Note currently held on the output, or [`NO_NOTE`]
    pub fn sounding_note(&self) -> NoteNumber {
        self.sounding
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Send the message for one note event
    ///
    /// A Note-On while another note is still held first releases that note,
    /// so the output never has two notes sounding. A Note-On for the note
    /// already held is ignored.
    pub fn apply(&mut self, event: &NoteEvent) -> Result<(), MidiError> {
        match event.kind {
            NoteEventKind::On => {
                if self.sounding == event.note {
                    return Ok(());
                }
                if self.sounding != NO_NOTE {
                    self.send_off(event.timestamp_sec)?;
                }
                self.sink
                    .send(&MidiMessage::note_on(event.note, event.timestamp_sec))?;
                self.sounding = event.note;
            }
            NoteEventKind::Off => {
                if self.sounding == event.note {
                    self.send_off(event.timestamp_sec)?;
                } else {
                    self.sink
                        .send(&MidiMessage::note_off(event.note, event.timestamp_sec))?;
                }
            }
        }
        Ok(())
    }

    /// Final Note-Off at shutdown if a note is still held
    ///
    /// # Returns
    /// The released note, if any
    pub fn release(&mut self, timestamp_sec: f64) -> Result<Option<NoteNumber>, MidiError> {
        if self.sounding == NO_NOTE {
            return Ok(None);
        }
        let note = self.sounding;
        self.send_off(timestamp_sec)?;
        Ok(Some(note))
    }

    fn send_off(&mut self, timestamp_sec: f64) -> Result<(), MidiError> {
        let message = MidiMessage::note_off(self.sounding, timestamp_sec);
        self.sounding = NO_NOTE;
        self.sink.send(&message)
    }
}

/// Output to the first available hardware or virtual MIDI port
///
/// Messages are sent immediately; the timestamp is not used for scheduling.
#[cfg(feature = "midi")]
pub struct PortMidiSink {
    connection: midir::MidiOutputConnection,
    port_name: String,
}

#[cfg(feature = "midi")]
impl PortMidiSink {
    pub fn open_first() -> Result<Self, MidiError> {
        let output = midir::MidiOutput::new("live_transcriber").map_err(|e| {
            MidiError::InitFailed {
                reason: e.to_string(),
            }
        })?;

        let ports = output.ports();
        let port = ports.first().ok_or(MidiError::NoOutputPort)?;
        let port_name = output
            .port_name(port)
            .unwrap_or_else(|_| "unknown".to_string());

        let connection = output
            .connect(port, "live_transcriber-out")
            .map_err(|e| MidiError::ConnectFailed {
                reason: e.to_string(),
            })?;

        tracing::info!("[MidiWriter] Opened MIDI output '{}'", port_name);
        Ok(Self {
            connection,
            port_name,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

#[cfg(feature = "midi")]
impl MidiSink for PortMidiSink {
    fn send(&mut self, message: &MidiMessage) -> Result<(), MidiError> {
        self.connection
            .send(&message.bytes())
            .map_err(|e| MidiError::SendFailed {
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        messages: Vec<MidiMessage>,
        fail: bool,
    }

    impl MidiSink for RecordingSink {
        fn send(&mut self, message: &MidiMessage) -> Result<(), MidiError> {
            if self.fail {
                return Err(MidiError::SendFailed {
                    reason: "port closed".to_string(),
                });
            }
            self.messages.push(*message);
            Ok(())
        }
    }

    fn bytes(writer: &MidiWriter<RecordingSink>) -> Vec<[u8; 3]> {
        writer.sink().messages.iter().map(MidiMessage::bytes).collect()
    }

    #[test]
    fn test_message_bytes() {
        assert_eq!(MidiMessage::note_on(69, 0.0).bytes(), [0x90, 69, 100]);
        assert_eq!(MidiMessage::note_off(69, 0.0).bytes(), [0x90, 69, 0]);
        assert!(MidiMessage::note_off(69, 0.0).is_note_off());
    }

    #[test]
    fn test_on_then_off() {
        let mut writer = MidiWriter::new(RecordingSink::default());
        writer.apply(&NoteEvent::on(0.1, 69, 440.0)).unwrap();
        assert_eq!(writer.sounding_note(), 69);
        writer.apply(&NoteEvent::off(0.2, 69)).unwrap();
        assert_eq!(writer.sounding_note(), NO_NOTE);
        assert_eq!(bytes(&writer), vec![[0x90, 69, 100], [0x90, 69, 0]]);
        assert_eq!(writer.sink().messages[1].timestamp_sec, 0.2);
    }

    #[test]
    fn test_switch_releases_previous_note_first() {
        let mut writer = MidiWriter::new(RecordingSink::default());
        writer.apply(&NoteEvent::on(0.1, 60, 261.6)).unwrap();
        // A lost Off must not leave the old note hanging
        writer.apply(&NoteEvent::on(0.2, 64, 329.6)).unwrap();
        assert_eq!(
            bytes(&writer),
            vec![[0x90, 60, 100], [0x90, 60, 0], [0x90, 64, 100]]
        );
    }

    #[test]
    fn test_repeated_on_for_sounding_note_is_not_resent() {
        let mut writer = MidiWriter::new(RecordingSink::default());
        writer.apply(&NoteEvent::on(0.1, 69, 440.0)).unwrap();
        writer.apply(&NoteEvent::on(0.2, 69, 441.0)).unwrap();
        assert_eq!(writer.sounding_note(), 69);
        assert_eq!(bytes(&writer), vec![[0x90, 69, 100]]);

        writer.apply(&NoteEvent::off(0.3, 69)).unwrap();
        assert_eq!(bytes(&writer), vec![[0x90, 69, 100], [0x90, 69, 0]]);
    }

    #[test]
    fn test_release_sends_final_off_once() {
        let mut writer = MidiWriter::new(RecordingSink::default());
        assert_eq!(writer.release(0.0).unwrap(), None);

        writer.apply(&NoteEvent::on(0.1, 72, 523.3)).unwrap();
        assert_eq!(writer.release(2.0).unwrap(), Some(72));
        assert_eq!(writer.release(2.1).unwrap(), None);
        assert_eq!(bytes(&writer), vec![[0x90, 72, 100], [0x90, 72, 0]]);
    }

    #[test]
    fn test_send_failure_propagates() {
        let mut writer = MidiWriter::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let err = writer.apply(&NoteEvent::on(0.0, 69, 440.0)).unwrap_err();
        assert!(matches!(err, MidiError::SendFailed { .. }));
        assert_eq!(writer.sounding_note(), NO_NOTE);
    }

    #[test]
    fn test_log_sink_counts() {
        let mut writer = MidiWriter::new(LogMidiSink::new());
        writer.apply(&NoteEvent::on(0.0, 69, 440.0)).unwrap();
        writer.release(1.0).unwrap();
        assert_eq!(writer.sink().sent(), 2);
    }

    #[test]
    fn test_boxed_sink() {
        let sink: Box<dyn MidiSink> = Box::new(LogMidiSink::new());
        let mut writer = MidiWriter::new(sink);
        writer.apply(&NoteEvent::on(0.0, 69, 440.0)).unwrap();
        assert_eq!(writer.sounding_note(), 69);
    }
}
