//! Non-real-time consumer side of a transcription run
//!
//! `TranscriptionSession` polls the bridge on a coarse interval, forwards
//! every note event to the MIDI writer and to an observer (console output in
//! the CLI), collects detections for the log, and reports callback
//! throughput periodically. Shutdown is cooperative: a [`StopFlag`] is set by
//! any cancellation source, e.g. the stdin listener thread.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::analysis::NoteEvent;
use crate::bridge::{BridgeConsumer, MeterSnapshot};
use crate::config::OutputConfig;
use crate::detections::Detection;
use crate::error::{log_midi_error, MidiError};
use crate::midi::{MidiSink, MidiWriter};
use crate::pitch::NoteNumber;

/// Shared cooperative shutdown flag
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Spawn a thread that blocks on one line of stdin, then sets `flag`
///
/// EOF and read errors also set the flag.
pub fn spawn_stdin_listener(flag: StopFlag) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("stop-listener".to_string())
        .spawn(move || {
            let mut line = String::new();
            if let Err(err) = io::stdin().read_line(&mut line) {
                tracing::warn!("[Session] stdin read failed: {}", err);
            }
            flag.request_stop();
        })
}

/// Periodic throughput snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputReport {
    pub interval: Duration,
    pub callbacks: u64,
    pub meter: MeterSnapshot,
    pub dropped_events: u64,
}

/// Outcome of a finished session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionReport {
    /// One entry per note-on, in emission order
    pub detections: Vec<Detection>,
    /// Note released by the final Note-Off, if one was still sounding
    pub released_note: Option<NoteNumber>,
    pub events_received: u64,
    pub dropped_events: u64,
    pub midi_errors: u64,
}

pub struct TranscriptionSession<S: MidiSink> {
    consumer: BridgeConsumer,
    midi: MidiWriter<S>,
    detections: Vec<Detection>,
    poll_interval: Duration,
    throughput_interval: Duration,
    last_report: Instant,
    last_event_sec: f64,
    events_received: u64,
    midi_errors: u64,
}

impl<S: MidiSink> TranscriptionSession<S> {
    pub fn new(consumer: BridgeConsumer, sink: S, output: &OutputConfig) -> Self {
        Self {
            consumer,
            midi: MidiWriter::new(sink),
            detections: Vec::new(),
            poll_interval: Duration::from_millis(output.poll_interval_ms.max(1)),
            throughput_interval: Duration::from_secs(output.throughput_log_secs.max(1)),
            last_report: Instant::now(),
            last_event_sec: 0.0,
            events_received: 0,
            midi_errors: 0,
        }
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn meter(&self) -> MeterSnapshot {
        self.consumer.poll_meter()
    }

    pub fn midi(&self) -> &MidiWriter<S> {
        &self.midi
    }

    /// Handle every event currently queued
    ///
    /// # Returns
    /// Number of events handled
    pub fn pump<F>(&mut self, observer: &mut F) -> usize
    where
        F: FnMut(&NoteEvent),
    {
        let mut handled = 0;
        while let Some(event) = self.consumer.pop_event() {
            self.handle(&event, observer);
            handled += 1;
        }
        handled
    }

    /// Poll until `stop` is set
    ///
    /// The final drain happens in [`finish`](Self::finish), after the
    /// capture stream has been stopped.
    pub fn run_until_stopped<F>(&mut self, stop: &StopFlag, observer: &mut F)
    where
        F: FnMut(&NoteEvent),
    {
        while !stop.is_stopped() {
            self.pump(observer);
            if let Some(report) = self.poll_throughput(Instant::now()) {
                log_throughput(&report);
            }
            thread::sleep(self.poll_interval);
        }
    }

    /// Emit a throughput report if the interval has elapsed since the last one
    pub fn poll_throughput(&mut self, now: Instant) -> Option<ThroughputReport> {
        let interval = now.saturating_duration_since(self.last_report);
        if interval < self.throughput_interval {
            return None;
        }
        self.last_report = now;
        Some(ThroughputReport {
            interval,
            callbacks: self.consumer.take_callback_count(),
            meter: self.consumer.poll_meter(),
            dropped_events: self.consumer.dropped_events(),
        })
    }

    /// Drain what is left, release any sounding note and hand back the results
    ///
    /// # Arguments
    /// * `end_time_sec` - Timestamp for the final Note-Off; clamped so it is
    ///   never earlier than the last event
    pub fn finish<F>(mut self, end_time_sec: f64, observer: &mut F) -> SessionReport
    where
        F: FnMut(&NoteEvent),
    {
        self.pump(observer);

        let end_time_sec = end_time_sec.max(self.last_event_sec);
        let released_note = match self.midi.release(end_time_sec) {
            Ok(note) => note,
            Err(err) => {
                log_midi_error(&err, "release");
                self.midi_errors += 1;
                None
            }
        };
        if let Some(note) = released_note {
            observer(&NoteEvent::off(end_time_sec, note));
        }

        let dropped_events = self.consumer.dropped_events();
        if dropped_events > 0 {
            tracing::warn!(
                "[Session] {} note events were dropped because the queue was full",
                dropped_events
            );
        }

        SessionReport {
            detections: self.detections,
            released_note,
            events_received: self.events_received,
            dropped_events,
            midi_errors: self.midi_errors,
        }
    }

    fn handle<F>(&mut self, event: &NoteEvent, observer: &mut F)
    where
        F: FnMut(&NoteEvent),
    {
        self.events_received += 1;
        self.last_event_sec = event.timestamp_sec;

        if let Some(detection) = Detection::from_event(event) {
            self.detections.push(detection);
        }
        if let Err(err) = self.midi.apply(event) {
            self.record_midi_error(&err);
        }
        observer(event);
    }

    fn record_midi_error(&mut self, err: &MidiError) {
        self.midi_errors += 1;
        log_midi_error(err, "pump");
    }
}

/// Log a throughput report
pub fn log_throughput(report: &ThroughputReport) {
    tracing::info!(
        "[Session] Callbacks processed in last {}s: {}",
        report.interval.as_secs(),
        report.callbacks
    );
    tracing::info!(
        "[Session] Meter: note={} frequency={:.2}Hz last_off={} dropped_events={}",
        report.meter.note,
        report.meter.frequency_hz,
        report.meter.last_note_off,
        report.dropped_events
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{self, BridgeProducer};
    use crate::midi::{LogMidiSink, MidiMessage};

    fn session(capacity: usize) -> (BridgeProducer, TranscriptionSession<LogMidiSink>) {
        let (producer, consumer) = bridge::channel(capacity);
        let session =
            TranscriptionSession::new(consumer, LogMidiSink::new(), &OutputConfig::default());
        (producer, session)
    }

    #[test]
    fn test_pump_collects_detections_and_notifies() {
        let (mut producer, mut session) = session(16);
        producer.publish_event(NoteEvent::on(0.085, 69, 439.45));
        producer.publish_event(NoteEvent::off(0.17, 69));
        producer.publish_event(NoteEvent::on(0.25, 72, 521.48));

        let mut seen = Vec::new();
        assert_eq!(session.pump(&mut |e: &NoteEvent| seen.push(*e)), 3);
        assert_eq!(seen.len(), 3);
        assert_eq!(
            session.detections(),
            &[
                Detection::new(0.085, 439.45, 69),
                Detection::new(0.25, 521.48, 72)
            ]
        );
        assert_eq!(session.midi().sounding_note(), 72);
        assert_eq!(session.midi().sink().sent(), 3);
    }

    #[test]
    fn test_finish_releases_sounding_note() {
        let (mut producer, session) = session(16);
        producer.publish_event(NoteEvent::on(0.5, 60, 263.67));

        let mut seen = Vec::new();
        let report = session.finish(0.2, &mut |e: &NoteEvent| seen.push(*e));
        assert_eq!(report.released_note, Some(60));
        assert_eq!(report.detections.len(), 1);
        assert_eq!(report.events_received, 1);
        // End time is clamped to the last event
        assert_eq!(seen.last(), Some(&NoteEvent::off(0.5, 60)));
    }

    #[test]
    fn test_finish_without_sounding_note() {
        let (mut producer, session) = session(16);
        producer.publish_event(NoteEvent::on(0.5, 60, 263.67));
        producer.publish_event(NoteEvent::off(1.0, 60));
        let report = session.finish(2.0, &mut |_: &NoteEvent| {});
        assert_eq!(report.released_note, None);
        assert_eq!(report.dropped_events, 0);
    }

    #[test]
    fn test_throughput_report_interval() {
        let (producer, mut session) = session(4);
        let start = session.last_report;
        producer.record_callback();
        producer.record_callback();

        assert!(session.poll_throughput(start + Duration::from_secs(1)).is_none());
        let report = session
            .poll_throughput(start + Duration::from_secs(5))
            .unwrap();
        assert_eq!(report.callbacks, 2);
        assert_eq!(report.interval, Duration::from_secs(5));
        assert!(session.poll_throughput(start + Duration::from_secs(6)).is_none());
    }

    #[test]
    fn test_run_until_stopped_returns_after_flag() {
        let (mut producer, mut session) = session(16);
        let stop = StopFlag::new();
        let remote = stop.clone();

        let handle = thread::spawn(move || {
            producer.publish_event(NoteEvent::on(0.1, 69, 440.0));
            thread::sleep(Duration::from_millis(50));
            remote.request_stop();
            producer
        });

        let mut seen = 0;
        session.run_until_stopped(&stop, &mut |_: &NoteEvent| seen += 1);
        let _producer = handle.join().unwrap();
        session.pump(&mut |_: &NoteEvent| seen += 1);
        assert_eq!(seen, 1);
        assert!(stop.is_stopped());
    }

    struct FailingSink;

    impl MidiSink for FailingSink {
        fn send(&mut self, _message: &MidiMessage) -> Result<(), MidiError> {
            Err(MidiError::SendFailed {
                reason: "unplugged".to_string(),
            })
        }
    }

    #[test]
    fn test_midi_errors_do_not_stop_the_session() {
        let (mut producer, consumer) = bridge::channel(4);
        let mut session =
            TranscriptionSession::new(consumer, FailingSink, &OutputConfig::default());
        producer.publish_event(NoteEvent::on(0.1, 69, 440.0));
        producer.publish_event(NoteEvent::on(0.2, 70, 466.2));

        let mut seen = 0;
        session.pump(&mut |_: &NoteEvent| seen += 1);
        assert_eq!(seen, 2);
        let report = session.finish(1.0, &mut |_: &NoteEvent| {});
        assert_eq!(report.midi_errors, 2);
        assert_eq!(report.detections.len(), 2);
    }
}
