//! Offline transcription of recorded audio
//!
//! Runs the same Detector and session the live pipeline uses, feeding the
//! samples in `frames_per_buffer` chunks the way the capture callback would
//! and pumping the bridge after every chunk.

use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::analysis::{Detector, NoteEvent};
use crate::bridge;
use crate::config::AppConfig;
use crate::error::ConfigError;
use crate::midi::MidiSink;
use crate::session::{SessionReport, TranscriptionSession};

/// Events and session results of an offline run
#[derive(Debug, Clone)]
pub struct Transcript {
    /// Every note event in order, including the final release
    pub events: Vec<NoteEvent>,
    pub report: SessionReport,
    /// Length of the input in seconds
    pub duration_sec: f64,
}

/// Transcribe mono samples recorded at `config.audio.sample_rate`
pub fn transcribe<S: MidiSink>(
    config: &AppConfig,
    samples: &[f32],
    sink: S,
) -> Result<Transcript, ConfigError> {
    let (producer, consumer) = bridge::channel(config.audio.event_queue_capacity);
    let mut detector = Detector::new(config, producer)?;
    let mut session = TranscriptionSession::new(consumer, sink, &config.output);

    let mut events = Vec::new();
    let mut collect = |event: &NoteEvent| events.push(*event);

    for chunk in samples.chunks(config.audio.frames_per_buffer.max(1)) {
        detector.process(chunk);
        session.pump(&mut collect);
    }

    let duration_sec = samples.len() as f64 / config.audio.sample_rate as f64;
    let report = session.finish(duration_sec, &mut collect);

    tracing::info!(
        "[Offline] {} windows analysed, {} detections, {} events",
        detector.frames_processed() / (config.analysis.hop_size() as u64),
        report.detections.len(),
        events.len()
    );

    Ok(Transcript {
        events,
        report,
        duration_sec,
    })
}

/// Read a WAV file as mono f32 samples
///
/// Multi-channel files are reduced to their first channel. Integer formats
/// are scaled to [-1, 1].
///
/// # Returns
/// The samples and the file's sample rate
pub fn read_wav_mono(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(|err| anyhow!(err)))
            .collect::<Result<Vec<f32>>>()?,
        hound::SampleFormat::Int => {
            let max = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f32;
            match spec.bits_per_sample {
                8 | 16 | 24 | 32 => reader
                    .samples::<i32>()
                    .map(|sample| {
                        sample
                            .map(|value| value as f32 / max)
                            .map_err(|err| anyhow!(err))
                    })
                    .collect::<Result<Vec<f32>>>()?,
                other => {
                    return Err(anyhow!(
                        "Unsupported bits per sample {} in {}",
                        other,
                        path.display()
                    ))
                }
            }
        }
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved.chunks(channels).map(|frame| frame[0]).collect()
    };

    Ok((samples, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::NoteEventKind;
    use crate::midi::LogMidiSink;

    fn tone(frequency: f64, seconds: f64, sample_rate: u32) -> Vec<f32> {
        let len = (seconds * sample_rate as f64) as usize;
        (0..len)
            .map(|i| {
                0.5 * (2.0 * std::f64::consts::PI * frequency * i as f64 / sample_rate as f64)
                    .sin() as f32
            })
            .collect()
    }

    #[test]
    fn test_sustained_tone_is_released_at_end() {
        let config = AppConfig::default();
        let transcript =
            transcribe(&config, &tone(440.0, 1.0, 48_000), LogMidiSink::new()).unwrap();

        assert_eq!(transcript.events.len(), 2);
        assert_eq!(transcript.events[0].kind, NoteEventKind::On);
        assert_eq!(transcript.events[1], NoteEvent::off(1.0, 69));
        assert_eq!(transcript.report.released_note, Some(69));
        assert_eq!(transcript.report.detections.len(), 1);
    }

    #[test]
    fn test_silence_yields_nothing() {
        let config = AppConfig::default();
        let transcript = transcribe(&config, &vec![0.0; 48_000], LogMidiSink::new()).unwrap();
        assert!(transcript.events.is_empty());
        assert!(transcript.report.detections.is_empty());
    }

    #[test]
    fn test_read_wav_takes_first_channel() {
        let dir = std::env::temp_dir().join(format!("offline_wav_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("stereo.wav");

        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..100 {
            writer.write_sample(i as i16 * 100).unwrap();
            writer.write_sample(-1000i16).unwrap();
        }
        writer.finalize().unwrap();

        let (samples, sample_rate) = read_wav_mono(&path).unwrap();
        assert_eq!(sample_rate, 22_050);
        assert_eq!(samples.len(), 100);
        assert!((samples[10] - 1000.0 / 32767.0).abs() < 1e-6);

        std::fs::remove_dir_all(&dir).ok();
    }
}
