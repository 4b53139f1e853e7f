//! Detection log
//!
//! Plain-text record of every note-on, one `time,frequency,note` line per
//! detection in emission order. The writer uses Rust's default float
//! formatting. The reader is lenient: it also accepts `frequency,note` and
//! bare `frequency` lines and skips anything it cannot parse.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use crate::analysis::NoteEvent;
use crate::pitch::NoteNumber;

/// One logged detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub time_sec: Option<f64>,
    pub frequency_hz: f64,
    pub note: Option<NoteNumber>,
}

impl Detection {
    pub fn new(time_sec: f64, frequency_hz: f64, note: NoteNumber) -> Self {
        Self {
            time_sec: Some(time_sec),
            frequency_hz,
            note: Some(note),
        }
    }

    /// Detection for a note-on event; `None` for note-offs
    pub fn from_event(event: &NoteEvent) -> Option<Self> {
        if !event.is_on() {
            return None;
        }
        event
            .frequency_hz
            .map(|frequency_hz| Self::new(event.timestamp_sec, frequency_hz, event.note))
    }

    fn parse_line(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        match fields.as_slice() {
            [time, frequency, note] => Some(Self {
                time_sec: Some(time.parse().ok()?),
                frequency_hz: frequency.parse().ok()?,
                note: Some(note.parse().ok()?),
            }),
            [frequency, note] => Some(Self {
                time_sec: None,
                frequency_hz: frequency.parse().ok()?,
                note: Some(note.parse().ok()?),
            }),
            [frequency] => Some(Self {
                time_sec: None,
                frequency_hz: frequency.parse().ok()?,
                note: None,
            }),
            _ => None,
        }
    }
}

/// Render detections in log format
///
/// Entries without a time or note are written with the fields they have.
pub fn format_log(detections: &[Detection]) -> String {
    let mut out = String::new();
    for detection in detections {
        let _ = match (detection.time_sec, detection.note) {
            (Some(time), Some(note)) => {
                writeln!(out, "{},{},{}", time, detection.frequency_hz, note)
            }
            (None, Some(note)) => writeln!(out, "{},{}", detection.frequency_hz, note),
            (_, None) => writeln!(out, "{}", detection.frequency_hz),
        };
    }
    out
}

/// Parse log text, skipping blank and malformed lines
pub fn parse_log(text: &str) -> Vec<Detection> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let parsed = Detection::parse_line(line);
            if parsed.is_none() {
                tracing::debug!("[Detections] Skipping unparsable line: {:?}", line);
            }
            parsed
        })
        .collect()
}

/// Write the whole log, replacing any existing file
pub fn write_log<P: AsRef<Path>>(path: P, detections: &[Detection]) -> io::Result<()> {
    fs::write(path, format_log(detections))
}

pub fn read_log<P: AsRef<Path>>(path: P) -> io::Result<Vec<Detection>> {
    Ok(parse_log(&fs::read_to_string(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_event_only_for_note_on() {
        let on = NoteEvent::on(0.08533333333333333, 69, 439.453125);
        assert_eq!(
            Detection::from_event(&on),
            Some(Detection::new(0.08533333333333333, 439.453125, 69))
        );
        assert_eq!(Detection::from_event(&NoteEvent::off(1.0, 69)), None);
    }

    #[test]
    fn test_format_uses_default_float_text() {
        let text = format_log(&[
            Detection::new(0.08533333333333333, 439.453125, 69),
            Detection::new(1.0, 262.5, 60),
        ]);
        assert_eq!(text, "0.08533333333333333,439.453125,69\n1,262.5,60\n");
    }

    #[test]
    fn test_write_then_read_preserves_order() {
        let dir = std::env::temp_dir().join(format!("detections_test_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("frequency_data.txt");

        let detections: Vec<Detection> = (0..20)
            .map(|i| {
                let note = 50 + i as u8;
                Detection::new(
                    i as f64 * 0.0853,
                    crate::pitch::note_to_frequency(note) * 1.001,
                    note,
                )
            })
            .collect();

        write_log(&path, &detections).unwrap();
        let read = read_log(&path).unwrap();
        assert_eq!(read, detections);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_lenient_reader() {
        let text = "\
0.5,440,69
not,a,line
261.63,60

987.77
1,2,3,4
0.7, 523.25 , 72
";
        let parsed = parse_log(text);
        assert_eq!(
            parsed,
            vec![
                Detection::new(0.5, 440.0, 69),
                Detection {
                    time_sec: None,
                    frequency_hz: 261.63,
                    note: Some(60)
                },
                Detection {
                    time_sec: None,
                    frequency_hz: 987.77,
                    note: None
                },
                Detection::new(0.7, 523.25, 72),
            ]
        );
    }

    #[test]
    fn test_read_missing_file_is_error() {
        assert!(read_log("/nonexistent/dir/frequency_data.txt").is_err());
    }
}
