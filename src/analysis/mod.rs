// Analysis module - streaming pitch detection
//
// The Detector runs inside the audio callback. Each incoming buffer is
// appended to the overlap window buffer; every complete window then goes
// through the pipeline:
//
//   NoiseGate → SpectralTransform → PeakEstimator → NoteStateMachine
//
// Resulting note events and the meter snapshot are published through the
// bridge producer. After construction nothing here allocates (as long as
// buffers do not exceed the configured frames_per_buffer), locks, or logs.

pub mod fft;
pub mod gate;
pub mod note_state;
pub mod peak;

pub use fft::{RustFftTransform, SpectralTransform};
pub use gate::NoiseGate;
pub use note_state::{HysteresisState, NoteEvent, NoteEventKind, NoteStateMachine, Transitions};
pub use peak::{PeakEstimator, PitchCandidate};

use crate::audio::OverlapWindowBuffer;
use crate::bridge::BridgeProducer;
use crate::config::AppConfig;
use crate::error::ConfigError;
use crate::pitch::NoteNumber;

/// Owns all per-stream analysis state
pub struct Detector<T: SpectralTransform = RustFftTransform> {
    sample_rate: u32,
    windows: OverlapWindowBuffer,
    gate: NoiseGate,
    transform: T,
    estimator: PeakEstimator,
    notes: NoteStateMachine,
    bridge: BridgeProducer,
    active_frequency_hz: f64,
}

impl Detector<RustFftTransform> {
    /// Build a detector with a rustfft transform sized to the window
    pub fn new(config: &AppConfig, bridge: BridgeProducer) -> Result<Self, ConfigError> {
        config.validate()?;
        let transform = RustFftTransform::new(config.analysis.window_size);
        Self::with_transform(config, transform, bridge)
    }
}

impl<T: SpectralTransform> Detector<T> {
    pub fn with_transform(
        config: &AppConfig,
        transform: T,
        bridge: BridgeProducer,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let analysis = &config.analysis;
        if transform.len() != analysis.window_size {
            return Err(ConfigError::InvalidWindowSize {
                window_size: transform.len(),
            });
        }

        Ok(Self {
            sample_rate: config.audio.sample_rate,
            windows: OverlapWindowBuffer::new(
                analysis.window_size,
                config.audio.frames_per_buffer,
            ),
            gate: NoiseGate::new(analysis.amplitude_threshold),
            transform,
            estimator: PeakEstimator::new(
                config.audio.sample_rate,
                analysis.window_size,
                analysis.min_frequency_hz,
                analysis.max_frequency_hz,
                analysis.magnitude_floor,
            ),
            notes: NoteStateMachine::new(&config.hysteresis),
            bridge,
            active_frequency_hz: 0.0,
        })
    }

    /// Consume one buffer of mono samples
    ///
    /// # Returns
    /// Number of windows analysed during this call
    pub fn process(&mut self, samples: &[f32]) -> usize {
        self.bridge.record_callback();
        self.windows.push(samples);

        let mut analysed = 0;
        while let Some(window) = self.windows.next_window() {
            let timestamp_sec = window.center_time_sec(self.sample_rate);

            let candidate = if self.gate.passes(window.samples) {
                let spectrum = self.transform.transform(window.samples);
                self.estimator.estimate(spectrum)
            } else {
                None
            };

            for event in self.notes.observe(candidate, timestamp_sec) {
                if let Some(frequency_hz) = event.frequency_hz {
                    self.active_frequency_hz = frequency_hz;
                }
                self.bridge.publish_event(event);
            }
            self.bridge
                .publish_meter(self.notes.active_note(), self.active_frequency_hz);

            analysed += 1;
        }
        analysed
    }

    pub fn active_note(&self) -> NoteNumber {
        self.notes.active_note()
    }

    pub fn hysteresis_state(&self) -> HysteresisState {
        self.notes.state()
    }

    /// Cumulative frame offset of the next window
    pub fn frames_processed(&self) -> u64 {
        self.windows.frames_processed()
    }

    /// Stream time in seconds up to which windows have been analysed
    pub fn stream_time_sec(&self) -> f64 {
        self.frames_processed() as f64 / self.sample_rate as f64
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
