//! Telemetry line grammar
//!
//! Lines are comma-separated `KEY:VALUE` tokens. Keys are matched by
//! case-sensitive substring, checked in this order: `BPM`/`HR` (heart rate),
//! `SpO2`/`O2` (oxygen saturation), `BEAT` (explicit beat flag). Tokens with
//! unknown keys or unparseable values are skipped.

use serde::{Deserialize, Serialize};

/// Recognized readings of one telemetry line
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryLine {
    pub heart_rate: Option<f64>,
    pub spo2: Option<f64>,
    /// Explicit beat flag, true when the `BEAT` value is positive
    pub beat: Option<bool>,
}

impl TelemetryLine {
    /// Whether the line carries a heart-rate or SpO2 reading
    pub fn has_vitals(&self) -> bool {
        self.heart_rate.is_some() || self.spo2.is_some()
    }
}

/// Parse one line. Returns `None` when no recognized key carries a number.
pub fn parse_line(line: &str) -> Option<TelemetryLine> {
    let mut parsed = TelemetryLine::default();
    let mut recognized = false;

    for token in line.trim().split(',') {
        let Some((key, value)) = token.split_once(':') else {
            continue;
        };
        let Ok(value) = value.trim().parse::<f64>() else {
            continue;
        };
        if !value.is_finite() {
            continue;
        }

        let key = key.trim();
        if key.contains("BPM") || key.contains("HR") {
            parsed.heart_rate = Some(value);
        } else if key.contains("SpO2") || key.contains("O2") {
            parsed.spo2 = Some(value);
        } else if key.contains("BEAT") {
            parsed.beat = Some(value > 0.0);
        } else {
            continue;
        }
        recognized = true;
    }

    recognized.then_some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_full_line() {
        let line = parse_line("BPM:72,SpO2:98,BEAT:1").unwrap();
        assert_eq!(
            line,
            TelemetryLine {
                heart_rate: Some(72.0),
                spo2: Some(98.0),
                beat: Some(true),
            }
        );
        assert!(line.has_vitals());
    }

    #[test]
    fn test_key_substring_matching() {
        let line = parse_line("HeartHR:65.5,O2Sat:97").unwrap();
        assert_eq!(line.heart_rate, Some(65.5));
        assert_eq!(line.spo2, Some(97.0));
        assert_eq!(line.beat, None);
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        assert_eq!(parse_line("bpm:72,spo2:98"), None);
    }

    #[test]
    fn test_malformed_lines_are_ignored() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("garbage"), None);
        assert_eq!(parse_line("BPM:abc"), None);
        assert_eq!(parse_line("TEMP:36.6"), None);
    }

    #[test]
    fn test_bad_tokens_do_not_spoil_good_ones() {
        let line = parse_line("BPM:,SpO2:99,junk").unwrap();
        assert_eq!(line.heart_rate, None);
        assert_eq!(line.spo2, Some(99.0));
    }

    #[test]
    fn test_beat_only_line_has_no_vitals() {
        let line = parse_line("BEAT:0").unwrap();
        assert_eq!(line.beat, Some(false));
        assert!(!line.has_vitals());
    }

    #[test]
    fn test_trailing_newline() {
        let line = parse_line("BPM:80\r\n").unwrap();
        assert_eq!(line.heart_rate, Some(80.0));
    }
}
