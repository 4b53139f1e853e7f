//! Pitch-to-note mapping
//!
//! Pure conversions between frequencies and MIDI-style note numbers using
//! equal temperament with A4 = note 69 = 440 Hz.

/// MIDI-style note number; 0 means "no note".
pub type NoteNumber = u8;

/// Note number reported for silence or unmappable frequencies
pub const NO_NOTE: NoteNumber = 0;

/// Highest valid note number
pub const MAX_NOTE: NoteNumber = 127;

/// Returned by [`note_name`] for numbers outside 1..=127
pub const NOTE_NAME_UNAVAILABLE: &str = "N/A";

const A4_NOTE: f64 = 69.0;
const A4_FREQUENCY_HZ: f64 = 440.0;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Nearest note number for a frequency.
///
/// Returns [`NO_NOTE`] for non-positive or non-finite input, and for
/// frequencies whose nearest note falls outside 1..=127.
pub fn frequency_to_note(frequency_hz: f64) -> NoteNumber {
    if !(frequency_hz > 0.0) || !frequency_hz.is_finite() {
        return NO_NOTE;
    }
    let note = (A4_NOTE + 12.0 * (frequency_hz / A4_FREQUENCY_HZ).log2()).round();
    if note >= 1.0 && note <= MAX_NOTE as f64 {
        note as NoteNumber
    } else {
        NO_NOTE
    }
}

/// Human-readable name such as `"A4"` or `"C#3"`.
pub fn note_name(note: NoteNumber) -> String {
    if note == NO_NOTE || note > MAX_NOTE {
        return NOTE_NAME_UNAVAILABLE.to_string();
    }
    let octave = (note / 12) as i32 - 1;
    format!("{}{}", NOTE_NAMES[(note % 12) as usize], octave)
}

/// Equal-tempered frequency of a note number.
pub fn note_to_frequency(note: NoteNumber) -> f64 {
    A4_FREQUENCY_HZ * 2f64.powf((note as f64 - A4_NOTE) / 12.0)
}
