// NoteStateMachine - hysteresis over per-window pitch estimates
//
// Turns a noisy stream of per-window candidates into note-on/note-off events.
// A note turns on after `detections_required` consecutive windows agree on it
// and turns off after `silences_required` consecutive windows without a
// confident pitch. Switching directly between notes emits Off(old) then
// On(new) from the same window.
//
// Invariants:
// - at most one active note (monophonic)
// - never two On events without an Off in between
// - never an Off while no note is active
// - consecutive_detections and consecutive_silences are never both > 0

use serde::{Deserialize, Serialize};

use super::peak::PitchCandidate;
use crate::config::HysteresisConfig;
use crate::pitch::{frequency_to_note, NoteNumber, NO_NOTE};

/// Start or end of a sounding note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteEventKind {
    On,
    Off,
}

/// A note transition at the centre time of the window that caused it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub timestamp_sec: f64,
    pub note: NoteNumber,
    pub kind: NoteEventKind,
    /// Detected frequency; only present on `On` events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_hz: Option<f64>,
}

impl NoteEvent {
    pub fn on(timestamp_sec: f64, note: NoteNumber, frequency_hz: f64) -> Self {
        Self {
            timestamp_sec,
            note,
            kind: NoteEventKind::On,
            frequency_hz: Some(frequency_hz),
        }
    }

    pub fn off(timestamp_sec: f64, note: NoteNumber) -> Self {
        Self {
            timestamp_sec,
            note,
            kind: NoteEventKind::Off,
            frequency_hz: None,
        }
    }

    pub fn is_on(&self) -> bool {
        self.kind == NoteEventKind::On
    }
}

/// Counters and notes tracked between windows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HysteresisState {
    pub active_note: NoteNumber,
    pub pending_note: NoteNumber,
    pub consecutive_detections: u32,
    pub consecutive_silences: u32,
}

/// Up to two events produced by a single window (Off then On)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transitions {
    events: [Option<NoteEvent>; 2],
}

impl Transitions {
    fn push(&mut self, event: NoteEvent) {
        if let Some(slot) = self.events.iter_mut().find(|slot| slot.is_none()) {
            *slot = Some(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events[0].is_none()
    }

    pub fn len(&self) -> usize {
        self.events.iter().flatten().count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NoteEvent> {
        self.events.iter().flatten()
    }
}

impl IntoIterator for Transitions {
    type Item = NoteEvent;
    type IntoIter = std::iter::Flatten<std::array::IntoIter<Option<NoteEvent>, 2>>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter().flatten()
    }
}

/// Monophonic note tracker with detection/silence hysteresis
#[derive(Debug, Clone)]
pub struct NoteStateMachine {
    detections_required: u32,
    silences_required: u32,
    min_confidence_hz: f64,
    state: HysteresisState,
}

impl NoteStateMachine {
    pub fn new(config: &HysteresisConfig) -> Self {
        Self {
            detections_required: config.detections_required.max(1),
            silences_required: config.silences_required.max(1),
            min_confidence_hz: config.min_confidence_hz,
            state: HysteresisState::default(),
        }
    }

    pub fn state(&self) -> HysteresisState {
        self.state
    }

    /// Currently sounding note, or [`NO_NOTE`]
    pub fn active_note(&self) -> NoteNumber {
        self.state.active_note
    }

    /// Feed the candidate of one window
    ///
    /// # Arguments
    /// * `candidate` - Peak estimate for the window, `None` for silence
    /// * `timestamp_sec` - Centre time of the window
    ///
    /// # Returns
    /// The events this window triggered, in emission order
    pub fn observe(
        &mut self,
        candidate: Option<PitchCandidate>,
        timestamp_sec: f64,
    ) -> Transitions {
        let mut transitions = Transitions::default();

        let confident = candidate
            .map(|c| (frequency_to_note(c.frequency_hz), c.frequency_hz))
            .filter(|&(note, frequency)| note != NO_NOTE && frequency > self.min_confidence_hz);

        let state = &mut self.state;
        match confident {
            Some((note, frequency_hz)) => {
                if note == state.pending_note {
                    state.consecutive_detections += 1;
                } else {
                    state.consecutive_detections = 1;
                    state.pending_note = note;
                }
                state.consecutive_silences = 0;

                if state.consecutive_detections >= self.detections_required
                    && note != state.active_note
                {
                    if state.active_note != NO_NOTE {
                        transitions.push(NoteEvent::off(timestamp_sec, state.active_note));
                    }
                    transitions.push(NoteEvent::on(timestamp_sec, note, frequency_hz));
                    state.active_note = note;
                }
            }
            None => {
                state.consecutive_silences += 1;
                state.consecutive_detections = 0;

                if state.consecutive_silences >= self.silences_required
                    && state.active_note != NO_NOTE
                {
                    transitions.push(NoteEvent::off(timestamp_sec, state.active_note));
                    state.active_note = NO_NOTE;
                }
            }
        }

        transitions
    }

    /// Forget all state without emitting anything
    pub fn reset(&mut self) {
        self.state = HysteresisState::default();
    }
}
