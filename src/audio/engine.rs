//! AudioEngine - cpal capture driving the Detector
//!
//! Opens the default input device at the configured sample rate and moves
//! the Detector into the input callback. Interleaved input is reduced to its
//! first channel before analysis.
//!
//! # Real-Time Safety Guarantees
//! - The callback only de-interleaves into a preallocated scratch buffer and
//!   calls `Detector::process`
//! - No locks, no logging, no blocking I/O in the callback
//! - The scratch buffer only grows if the device delivers more frames than
//!   `frames_per_buffer`
//!
//! # Example
//! ```ignore
//! let (producer, consumer) = bridge::channel(config.audio.event_queue_capacity);
//! let detector = Detector::new(&config, producer)?;
//! let mut engine = AudioEngine::start(&config.audio, detector)?;
//! // ... consumer polls the bridge
//! engine.stop()?;
//! ```

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::analysis::{Detector, SpectralTransform};
use crate::config::AudioConfig;
use crate::error::{log_audio_error, AudioError};

/// Running capture stream
pub struct AudioEngine {
    stream: Option<cpal::Stream>,
    device_name: String,
    sample_rate: u32,
    channels: u16,
}

impl AudioEngine {
    /// Open the default input device and start streaming into `detector`
    ///
    /// # Errors
    /// - `NoInputDevice` if the host has no default input
    /// - `UnsupportedFormat` if the device offers no f32 config at the rate
    /// - `StreamOpenFailed` / `StreamStartFailed` from the backend
    pub fn start<T>(config: &AudioConfig, mut detector: Detector<T>) -> Result<Self, AudioError>
    where
        T: SpectralTransform + 'static,
    {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(AudioError::NoInputDevice)?;
        let device_name = device
            .name()
            .unwrap_or_else(|_| "unknown input".to_string());

        let sample_rate = cpal::SampleRate(config.sample_rate);
        let supported = device
            .supported_input_configs()
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Failed to query input configs: {}", e),
            })?
            .find(|range| {
                range.sample_format() == cpal::SampleFormat::F32
                    && range.min_sample_rate() <= sample_rate
                    && range.max_sample_rate() >= sample_rate
            })
            .map(|range| range.with_sample_rate(sample_rate))
            .ok_or_else(|| AudioError::UnsupportedFormat {
                format: format!("f32 at {} Hz", config.sample_rate),
            })?;

        let stream_config: cpal::StreamConfig = supported.into();
        let channels = stream_config.channels;
        let channels_count = channels as usize;
        let mut mono = Vec::with_capacity(config.frames_per_buffer);

        let err_fn = |err: cpal::StreamError| {
            log_audio_error(&AudioError::from(err), "input stream");
        };

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if channels_count <= 1 {
                        detector.process(data);
                    } else {
                        // De-interleave: take first channel
                        mono.clear();
                        mono.extend(data.chunks(channels_count).map(|frame| frame[0]));
                        detector.process(&mono);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("{}", e),
            })?;

        stream.play().map_err(|e| AudioError::StreamStartFailed {
            reason: format!("{}", e),
        })?;

        tracing::info!(
            "[AudioEngine] Capturing from '{}' at {} Hz, {} channel(s)",
            device_name,
            config.sample_rate,
            channels
        );

        Ok(Self {
            stream: Some(stream),
            device_name,
            sample_rate: config.sample_rate,
            channels,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Pause and close the stream
    ///
    /// The stream is released even when pausing fails; the error is returned
    /// for the caller to log.
    pub fn stop(&mut self) -> Result<(), AudioError> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        let result = stream.pause().map_err(|e| AudioError::StreamStopFailed {
            reason: format!("{}", e),
        });
        drop(stream);
        tracing::info!("[AudioEngine] Input stream closed");
        result
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            log_audio_error(&err, "drop");
        }
    }
}
