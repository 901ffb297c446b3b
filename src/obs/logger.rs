//! Structured JSON logger
//!
//! - Structured logs (JSON)
//! - Deterministic key ordering (event first, then alphabetical)
//! - Explicit severity levels
//! - One log line = one event
//! - Synchronous, no buffering

use std::fmt;
use std::io::{self, Write};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Debug-level detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues
    Warn = 2,
    /// Operation failures
    Error = 3,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structured logger that outputs one JSON line per event
pub struct Logger;

impl Logger {
    /// Log an event with the given severity and fields.
    ///
    /// Fields are output in deterministic order (alphabetical by key).
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        Self::log_to_writer(severity, event, fields, &mut io::stdout());
    }

    /// Log to stderr (for error events)
    pub fn log_stderr(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        Self::log_to_writer(severity, event, fields, &mut io::stderr());
    }

    fn log_to_writer<W: Write>(
        severity: Severity,
        event: &str,
        fields: &[(&str, &str)],
        writer: &mut W,
    ) {
        // Build the line manually to keep key ordering deterministic
        let mut output = String::with_capacity(128);
        output.push('{');

        output.push_str("\"event\":");
        Self::push_escaped(&mut output, event);
        output.push_str(",\"severity\":");
        Self::push_escaped(&mut output, severity.as_str());

        let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
        sorted.sort_by_key(|entry| entry.0);
        for (key, value) in sorted {
            output.push(',');
            Self::push_escaped(&mut output, key);
            output.push(':');
            Self::push_escaped(&mut output, value);
        }

        output.push('}');
        output.push('\n');

        // Logging must never take the process down
        let _ = writer.write_all(output.as_bytes());
    }

    fn push_escaped(output: &mut String, text: &str) {
        output.push('"');
        for c in text.chars() {
            match c {
                '"' => output.push_str("\\\""),
                '\\' => output.push_str("\\\\"),
                '\n' => output.push_str("\\n"),
                '\r' => output.push_str("\\r"),
                '\t' => output.push_str("\\t"),
                c if (c as u32) < 0x20 => {
                    output.push_str(&format!("\\u{:04x}", c as u32));
                }
                c => output.push(c),
            }
        }
        output.push('"');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut buffer = Vec::new();
        Logger::log_to_writer(severity, event, fields, &mut buffer);
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_event_and_severity_first() {
        let line = render(Severity::Info, "deferred_execute", &[]);
        assert_eq!(
            line,
            "{\"event\":\"deferred_execute\",\"severity\":\"INFO\"}\n"
        );
    }

    #[test]
    fn test_fields_sorted_alphabetically() {
        let line = render(
            Severity::Warn,
            "ev",
            &[("zeta", "1"), ("alpha", "2")],
        );
        let alpha = line.find("alpha").unwrap();
        let zeta = line.find("zeta").unwrap();
        assert!(alpha < zeta);
    }

    #[test]
    fn test_escaping() {
        let line = render(Severity::Error, "ev", &[("msg", "a\"b\\c\nd")]);
        assert!(line.contains("a\\\"b\\\\c\\nd"));
    }

    #[test]
    fn test_one_line_per_event() {
        let line = render(Severity::Trace, "ev", &[("k", "v")]);
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.ends_with('\n'));
    }
}
