//! Configuration management for dynamic parameter tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling fast iteration without recompilation. Window size, gate and
//! peak thresholds, and the hysteresis counts can all be adjusted via the
//! config file or overridden from the command line.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub analysis: AnalysisConfig,
    pub hysteresis: HysteresisConfig,
    pub output: OutputConfig,
}

/// Capture and real-time transfer parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture sample rate in Hz
    pub sample_rate: u32,
    /// Frames per device buffer (and per chunk in offline mode)
    pub frames_per_buffer: usize,
    /// Slots in the note event queue between the audio and consumer threads
    pub event_queue_capacity: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            frames_per_buffer: 4096,
            event_queue_capacity: 1024,
        }
    }
}

/// Windowing and spectral peak parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Analysis window length in samples; hop is half of this
    pub window_size: usize,
    /// Peak amplitude a window must exceed to be analysed at all
    pub amplitude_threshold: f32,
    /// Minimum spectral magnitude for a peak to count as a pitch
    pub magnitude_floor: f32,
    pub min_frequency_hz: f64,
    pub max_frequency_hz: f64,
}

impl AnalysisConfig {
    pub fn hop_size(&self) -> usize {
        self.window_size / 2
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_size: 8192,
            amplitude_threshold: 0.005,
            magnitude_floor: 5.0,
            min_frequency_hz: 80.0,
            max_frequency_hz: 2000.0,
        }
    }
}

/// Note on/off smoothing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HysteresisConfig {
    /// Consecutive windows agreeing on a note before it is turned on
    pub detections_required: u32,
    /// Consecutive silent windows before the active note is turned off
    pub silences_required: u32,
    /// Detections at or below this frequency are treated as silence
    pub min_confidence_hz: f64,
}

impl Default for HysteresisConfig {
    fn default() -> Self {
        Self {
            detections_required: 1,
            silences_required: 1,
            min_confidence_hz: 200.0,
        }
    }
}

/// Consumer-side output parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Detection log written at shutdown
    pub detections_path: PathBuf,
    /// How often the consumer polls the bridge
    pub poll_interval_ms: u64,
    /// Interval of the throughput log line
    pub throughput_log_secs: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            detections_path: PathBuf::from("frequency_data.txt"),
            poll_interval_ms: 10,
            throughput_log_secs: 5,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or defaults if the file is missing or invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    tracing::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                tracing::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Check every section for values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audio.sample_rate == 0 {
            return Err(ConfigError::InvalidSampleRate {
                sample_rate: self.audio.sample_rate,
            });
        }
        if self.audio.event_queue_capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity {
                capacity: self.audio.event_queue_capacity,
            });
        }

        let analysis = &self.analysis;
        if analysis.window_size < 2 || analysis.window_size % 2 != 0 {
            return Err(ConfigError::InvalidWindowSize {
                window_size: analysis.window_size,
            });
        }
        if !(analysis.min_frequency_hz > 0.0
            && analysis.min_frequency_hz < analysis.max_frequency_hz)
        {
            return Err(ConfigError::InvalidFrequencyBand {
                min_hz: analysis.min_frequency_hz,
                max_hz: analysis.max_frequency_hz,
            });
        }
        check_threshold("amplitude_threshold", analysis.amplitude_threshold as f64)?;
        check_threshold("magnitude_floor", analysis.magnitude_floor as f64)?;

        let hysteresis = &self.hysteresis;
        check_threshold("min_confidence_hz", hysteresis.min_confidence_hz)?;
        if hysteresis.detections_required == 0 {
            return Err(ConfigError::InvalidThreshold {
                name: "detections_required",
                value: 0.0,
            });
        }
        if hysteresis.silences_required == 0 {
            return Err(ConfigError::InvalidThreshold {
                name: "silences_required",
                value: 0.0,
            });
        }

        Ok(())
    }
}

fn check_threshold(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold { name, value })
    }
}
