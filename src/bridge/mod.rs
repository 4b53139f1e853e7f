//! Realtime event bridge between the audio callback and the consumer thread
//!
//! Two paths cross the thread boundary:
//! - **Events**: every note-on/off goes through a bounded lock-free SPSC ring
//!   buffer (rtrb). Pushing never blocks; if the consumer falls so far behind
//!   that the queue is full, the event is counted in `dropped_events`.
//! - **Meter**: "now playing" state packed into a single `AtomicU64`, so the
//!   consumer always reads a consistent snapshot and only the latest value
//!   matters.
//!
//! The producer side performs no allocation after construction.
//!
//! # Example
//! ```ignore
//! let (mut producer, mut consumer) = bridge::channel(1024);
//!
//! // In the audio callback:
//! producer.publish_event(NoteEvent::on(0.085, 69, 439.45));
//! producer.publish_meter(69, 439.45);
//!
//! // In the consumer loop:
//! for event in consumer.drain_events() { /* ... */ }
//! let meter = consumer.poll_meter();
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};

use crate::analysis::NoteEvent;
use crate::pitch::{NoteNumber, NO_NOTE};

/// Latest "now playing" state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterSnapshot {
    /// Sounding note, or 0
    pub note: NoteNumber,
    /// Frequency the sounding note was detected at (0.0 when silent)
    pub frequency_hz: f32,
    /// Most recent note that was turned off
    pub last_note_off: NoteNumber,
    /// Wrapping update counter; changes whenever the snapshot is republished
    pub sequence: u16,
}

impl MeterSnapshot {
    fn pack(&self) -> u64 {
        self.frequency_hz.to_bits() as u64
            | (self.note as u64) << 32
            | (self.last_note_off as u64) << 40
            | (self.sequence as u64) << 48
    }

    fn unpack(word: u64) -> Self {
        Self {
            frequency_hz: f32::from_bits(word as u32),
            note: (word >> 32) as u8,
            last_note_off: (word >> 40) as u8,
            sequence: (word >> 48) as u16,
        }
    }
}

struct Shared {
    meter: AtomicU64,
    callbacks: AtomicU64,
    published_events: AtomicU64,
    dropped_events: AtomicU64,
}

/// Create a connected producer/consumer pair
///
/// # Panics
/// Panics if capacity is 0
pub fn channel(capacity: usize) -> (BridgeProducer, BridgeConsumer) {
    assert!(capacity > 0, "capacity must be greater than 0");

    let (events_tx, events_rx) = RingBuffer::new(capacity);
    let shared = Arc::new(Shared {
        meter: AtomicU64::new(MeterSnapshot::default().pack()),
        callbacks: AtomicU64::new(0),
        published_events: AtomicU64::new(0),
        dropped_events: AtomicU64::new(0),
    });

    (
        BridgeProducer {
            events: events_tx,
            shared: Arc::clone(&shared),
            meter: MeterSnapshot::default(),
        },
        BridgeConsumer {
            events: events_rx,
            shared,
        },
    )
}

/// Real-time side of the bridge
pub struct BridgeProducer {
    events: Producer<NoteEvent>,
    shared: Arc<Shared>,
    meter: MeterSnapshot,
}

impl BridgeProducer {
    /// Queue an event for the consumer
    ///
    /// Returns false (and counts a drop) if the queue is full.
    pub fn publish_event(&mut self, event: NoteEvent) -> bool {
        match self.events.push(event) {
            Ok(()) => {
                self.shared.published_events.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                self.shared.dropped_events.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Overwrite the meter with the current note and its frequency
    ///
    /// When the note changes away from a sounding note, that note becomes
    /// `last_note_off`. Unchanged values are not republished.
    pub fn publish_meter(&mut self, note: NoteNumber, frequency_hz: f64) {
        let frequency_hz = if note == NO_NOTE { 0.0 } else { frequency_hz as f32 };
        if note == self.meter.note && frequency_hz == self.meter.frequency_hz {
            return;
        }

        if self.meter.note != NO_NOTE && note != self.meter.note {
            self.meter.last_note_off = self.meter.note;
        }
        self.meter.note = note;
        self.meter.frequency_hz = frequency_hz;
        self.meter.sequence = self.meter.sequence.wrapping_add(1);

        self.shared.meter.store(self.meter.pack(), Ordering::Release);
    }

    /// Count one audio callback for throughput reporting
    pub fn record_callback(&self) {
        self.shared.callbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Free slots left in the event queue
    pub fn free_slots(&self) -> usize {
        self.events.slots()
    }
}

/// Non-real-time side of the bridge
pub struct BridgeConsumer {
    events: Consumer<NoteEvent>,
    shared: Arc<Shared>,
}

impl BridgeConsumer {
    /// Latest meter snapshot (intermediate updates may have been skipped)
    pub fn poll_meter(&self) -> MeterSnapshot {
        MeterSnapshot::unpack(self.shared.meter.load(Ordering::Acquire))
    }

    /// Oldest queued event, if any
    pub fn pop_event(&mut self) -> Option<NoteEvent> {
        self.events.pop().ok()
    }

    /// Pop every queued event in publication order
    pub fn drain_events(&mut self) -> impl Iterator<Item = NoteEvent> + '_ {
        std::iter::from_fn(move || self.pop_event())
    }

    /// Events waiting in the queue
    pub fn pending_events(&self) -> usize {
        self.events.slots()
    }

    /// Callbacks recorded since the previous call
    pub fn take_callback_count(&self) -> u64 {
        self.shared.callbacks.swap(0, Ordering::Relaxed)
    }

    /// Total events accepted by the queue
    pub fn published_events(&self) -> u64 {
        self.shared.published_events.load(Ordering::Relaxed)
    }

    /// Total events lost to a full queue
    pub fn dropped_events(&self) -> u64 {
        self.shared.dropped_events.load(Ordering::Relaxed)
    }

    /// True once the producer has been dropped
    pub fn is_producer_gone(&self) -> bool {
        self.events.is_abandoned()
    }
}
