use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use live_transcriber::analysis::{Detector, NoteEvent, NoteEventKind};
use live_transcriber::audio::AudioEngine;
use live_transcriber::bridge;
use live_transcriber::config::AppConfig;
use live_transcriber::detections::{self, Detection};
use live_transcriber::error::log_audio_error;
use live_transcriber::midi::{LogMidiSink, MidiSink};
use live_transcriber::offline;
use live_transcriber::pitch::note_name;
use live_transcriber::session::{spawn_stdin_listener, StopFlag, TranscriptionSession};

#[derive(Parser, Debug)]
#[command(
    name = "transcriber_cli",
    about = "Real-time monophonic audio to note-on/note-off transcription"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Transcribe the default input device until Enter is pressed
    Live {
        #[command(flatten)]
        overrides: ConfigOverrides,
    },
    /// Transcribe a WAV file and print note events as JSON lines
    File {
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        overrides: ConfigOverrides,
    },
    /// Print the contents of a detection log
    Show {
        #[arg(long)]
        log: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
struct ConfigOverrides {
    /// JSON configuration file (defaults are used when absent)
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    window_size: Option<usize>,
    #[arg(long)]
    detections_required: Option<u32>,
    #[arg(long)]
    silences_required: Option<u32>,
    /// Detection log destination
    #[arg(long)]
    log: Option<PathBuf>,
}

impl ConfigOverrides {
    fn resolve(&self) -> Result<AppConfig> {
        let mut config = self
            .config
            .as_ref()
            .map(AppConfig::load_from_file)
            .unwrap_or_default();

        if let Some(window_size) = self.window_size {
            config.analysis.window_size = window_size;
        }
        if let Some(detections) = self.detections_required {
            config.hysteresis.detections_required = detections;
        }
        if let Some(silences) = self.silences_required {
            config.hysteresis.silences_required = silences;
        }
        if let Some(path) = &self.log {
            config.output.detections_path = path.clone();
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Live { overrides } => run_live(overrides.resolve()?),
        Commands::File { input, overrides } => {
            let write_log = overrides.log.is_some();
            run_file(&input, overrides.resolve()?, write_log)
        }
        Commands::Show { log } => run_show(&log),
    }
}

fn run_live(config: AppConfig) -> Result<ExitCode> {
    let sink = open_midi_sink()?;

    let (producer, consumer) = bridge::channel(config.audio.event_queue_capacity);
    let detector = Detector::new(&config, producer).context("building detector")?;
    let mut engine = AudioEngine::start(&config.audio, detector)
        .map_err(|err| {
            log_audio_error(&err, "start");
            err
        })
        .context("starting audio capture")?;
    let started = Instant::now();

    let stop = StopFlag::new();
    let listener = spawn_stdin_listener(stop.clone()).context("spawning stop listener")?;
    println!(
        "Listening on '{}' ({} Hz, {} channel(s)). Press Enter to stop.",
        engine.device_name(),
        engine.sample_rate(),
        engine.channels()
    );

    let mut session = TranscriptionSession::new(consumer, sink, &config.output);
    session.run_until_stopped(&stop, &mut print_event);

    listener
        .join()
        .map_err(|_| anyhow!("stop listener thread panicked"))?;
    if let Err(err) = engine.stop() {
        log_audio_error(&err, "stop");
    }

    let report = session.finish(started.elapsed().as_secs_f64(), &mut print_event);
    tracing::info!(
        "[Session] {} events received, {} dropped",
        report.events_received,
        report.dropped_events
    );
    save_detections(&config.output.detections_path, &report.detections);

    Ok(ExitCode::SUCCESS)
}

fn run_file(input: &Path, mut config: AppConfig, write_log: bool) -> Result<ExitCode> {
    let (samples, sample_rate) = offline::read_wav_mono(input)?;
    if sample_rate != config.audio.sample_rate {
        tracing::info!(
            "[Offline] Using the file's sample rate of {} Hz",
            sample_rate
        );
        config.audio.sample_rate = sample_rate;
    }

    let transcript = offline::transcribe(&config, &samples, LogMidiSink::new())
        .with_context(|| format!("transcribing {}", input.display()))?;

    for event in &transcript.events {
        println!("{}", serde_json::to_string(event)?);
    }

    if write_log {
        save_detections(&config.output.detections_path, &transcript.report.detections);
    }

    Ok(ExitCode::SUCCESS)
}

fn run_show(log: &Path) -> Result<ExitCode> {
    let entries =
        detections::read_log(log).with_context(|| format!("reading {}", log.display()))?;
    if entries.is_empty() {
        println!("No detections in {}", log.display());
        return Ok(ExitCode::SUCCESS);
    }

    for entry in entries {
        let time = entry
            .time_sec
            .map(|t| format!("{:>9.3}s", t))
            .unwrap_or_else(|| format!("{:>10}", "-"));
        let note = entry
            .note
            .map(|n| format!("{:>3} {}", n, note_name(n)))
            .unwrap_or_else(|| "  - N/A".to_string());
        println!("{}  {:>9.2} Hz  {}", time, entry.frequency_hz, note);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_event(event: &NoteEvent) {
    match event.kind {
        NoteEventKind::On => println!(
            "Detected Frequency: {} Hz -> Transcribed Note: {}",
            event.frequency_hz.unwrap_or_default(),
            note_name(event.note)
        ),
        NoteEventKind::Off => println!("Note Off: {}", note_name(event.note)),
    }
}

/// Write the detection log; failures are reported but never fatal
fn save_detections(path: &Path, entries: &[Detection]) {
    match detections::write_log(path, entries) {
        Ok(()) => tracing::info!(
            "[Detections] Wrote {} detections to {}",
            entries.len(),
            path.display()
        ),
        Err(err) => tracing::warn!(
            "[Detections] Unable to write {}: {}. Detections discarded.",
            path.display(),
            err
        ),
    }
}

#[cfg(feature = "midi")]
fn open_midi_sink() -> Result<Box<dyn MidiSink>> {
    use live_transcriber::error::log_midi_error;
    use live_transcriber::midi::PortMidiSink;

    let sink = PortMidiSink::open_first()
        .map_err(|err| {
            log_midi_error(&err, "open");
            err
        })
        .context("opening MIDI output")?;
    Ok(Box::new(sink))
}

#[cfg(not(feature = "midi"))]
fn open_midi_sink() -> Result<Box<dyn MidiSink>> {
    tracing::info!("[MidiWriter] Built without the `midi` feature; MIDI messages are only logged");
    Ok(Box::new(LogMidiSink::new()))
}
