use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_transcriber_cli"))
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("transcriber_cli_{}_{}", name, std::process::id()));
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

/// Write a 16-bit mono WAV: `tone_secs` of A4 followed by `silence_secs` of silence
fn write_tone_wav(path: &Path, sample_rate: u32, tone_secs: f64, silence_secs: f64) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
    let tone_len = (tone_secs * sample_rate as f64) as usize;
    let silence_len = (silence_secs * sample_rate as f64) as usize;
    for i in 0..tone_len {
        let phase = 2.0 * std::f64::consts::PI * 440.0 * i as f64 / sample_rate as f64;
        let value = 0.5 * phase.sin();
        writer
            .write_sample((value * i16::MAX as f64) as i16)
            .expect("write sample");
    }
    for _ in 0..silence_len {
        writer.write_sample(0i16).expect("write sample");
    }
    writer.finalize().expect("finalize wav");
}

fn json_lines(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8(stdout.to_vec())
        .expect("stdout UTF-8")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("JSON event line"))
        .collect()
}

#[test]
fn file_mode_reports_note_on_and_off() {
    let dir = scratch_dir("file_mode");
    let wav = dir.join("a4.wav");
    write_tone_wav(&wav, 48_000, 2.0, 1.0);

    let output = cli()
        .args(["file", "--input"])
        .arg(&wav)
        .output()
        .expect("failed to run transcriber_cli file");
    assert!(
        output.status.success(),
        "CLI exited with {:?}: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );

    let events = json_lines(&output.stdout);
    assert_eq!(events.len(), 2, "events: {:?}", events);
    assert_eq!(events[0]["kind"], "on");
    assert_eq!(events[0]["note"], 69);
    let on_time = events[0]["timestamp_sec"].as_f64().unwrap();
    assert!((on_time - 4096.0 / 48_000.0).abs() < 1e-9);
    assert_eq!(events[1]["kind"], "off");
    assert_eq!(events[1]["note"], 69);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn file_mode_writes_detection_log() {
    let dir = scratch_dir("file_log");
    let wav = dir.join("a4.wav");
    let log = dir.join("frequency_data.txt");
    write_tone_wav(&wav, 48_000, 1.0, 0.5);

    let output = cli()
        .args(["file", "--input"])
        .arg(&wav)
        .arg("--log")
        .arg(&log)
        .output()
        .expect("failed to run transcriber_cli file --log");
    assert!(output.status.success());

    let text = fs::read_to_string(&log).expect("detection log written");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1);
    let fields: Vec<&str> = lines[0].split(',').collect();
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[2], "69");

    let output = cli()
        .args(["show", "--log"])
        .arg(&log)
        .output()
        .expect("failed to run transcriber_cli show");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    assert!(stdout.contains("A4"), "expected note name, got {stdout}");

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn file_mode_honours_hysteresis_override() {
    let dir = scratch_dir("hysteresis");
    let wav = dir.join("a4.wav");
    write_tone_wav(&wav, 48_000, 1.0, 0.0);

    let output = cli()
        .args(["file", "--detections-required", "3", "--input"])
        .arg(&wav)
        .output()
        .expect("failed to run transcriber_cli file");
    assert!(output.status.success());

    let events = json_lines(&output.stdout);
    let on_time = events[0]["timestamp_sec"].as_f64().unwrap();
    assert!((on_time - 3.0 * 4096.0 / 48_000.0).abs() < 1e-9);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn invalid_window_size_fails() {
    let dir = scratch_dir("invalid");
    let wav = dir.join("a4.wav");
    write_tone_wav(&wav, 48_000, 0.2, 0.0);

    let output = cli()
        .args(["file", "--window-size", "1001", "--input"])
        .arg(&wav)
        .output()
        .expect("failed to run transcriber_cli file");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("invalid configuration"), "got {stderr}");

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn file_mode_unwritable_log_is_only_a_warning() {
    let dir = scratch_dir("unwritable_log");
    let wav = dir.join("a4.wav");
    write_tone_wav(&wav, 48_000, 1.0, 0.5);

    let output = cli()
        .args(["file", "--input"])
        .arg(&wav)
        .args(["--log", "/nonexistent_transcriber_dir/frequency_data.txt"])
        .output()
        .expect("failed to run transcriber_cli file --log");
    assert_eq!(output.status.code(), Some(0));

    let events = json_lines(&output.stdout);
    assert_eq!(events.len(), 2, "events: {:?}", events);
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("Unable to write"), "got {stderr}");

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn show_missing_log_fails() {
    let output = cli()
        .args(["show", "--log", "/nonexistent/frequency_data.txt"])
        .output()
        .expect("failed to run transcriber_cli show");
    assert_eq!(output.status.code(), Some(1));
}
