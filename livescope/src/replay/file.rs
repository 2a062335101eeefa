//! Capture files in JSON Lines form.
//!
//! ```text
//! {"type":"session","process_id":4242,"module_biases":{"/opt/game":4096},"functions":[...]}
//! {"type":"thread_name","thread_id":7,"name":"render"}
//! {"type":"timer","function_address":4352,"thread_id":7,"start_ns":100,"end_ns":160}
//! ...
//! ```
//!
//! Exactly one `session` line, first. Every other line is a [`CaptureEvent`].
//! Blank lines are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use livescope_common::CaptureEvent;
use serde_json::Value;

use crate::capture::SessionInfo;
use crate::domain::ReplayError;

const SESSION_TAG: &str = "session";

/// A capture loaded from disk, ready to be replayed.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureFile {
    pub session: SessionInfo,
    /// Events in file order.
    pub events: Vec<CaptureEvent>,
}

impl CaptureFile {
    /// Load a capture file.
    ///
    /// # Errors
    ///
    /// I/O failures, lines that are not valid JSON for their `type`, and a
    /// missing or repeated session header.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse a capture from any line source.
    ///
    /// # Errors
    ///
    /// See [`CaptureFile::from_file`]. Parse errors carry the 1-based line.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, ReplayError> {
        let mut session = None;
        let mut events = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line_number = index + 1;
            let line = line?;
            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            let parse_error = |source| ReplayError::Parse { line: line_number, source };
            let value: Value = serde_json::from_str(text).map_err(parse_error)?;

            if value["type"].as_str() == Some(SESSION_TAG) {
                if session.is_some() {
                    return Err(ReplayError::DuplicateSession(line_number));
                }
                session = Some(serde_json::from_value::<SessionInfo>(value).map_err(parse_error)?);
            } else {
                if session.is_none() {
                    return Err(ReplayError::MissingSession);
                }
                events.push(serde_json::from_value::<CaptureEvent>(value).map_err(parse_error)?);
            }
        }

        let session = session.ok_or(ReplayError::MissingSession)?;
        Ok(Self { session, events })
    }

    #[must_use]
    pub fn timer_count(&self) -> usize {
        self.events.iter().filter(|e| matches!(e, CaptureEvent::Timer(_))).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livescope_common::TimerRecord;

    const HEADER: &str =
        r#"{"type":"session","process_id":7,"functions":[{"name":"tick","address":16}]}"#;
    const THREAD_NAME: &str = r#"{"type":"thread_name","thread_id":1,"name":"main"}"#;
    const TIMER: &str =
        r#"{"type":"timer","function_address":16,"thread_id":1,"start_ns":5,"end_ns":9}"#;

    fn parse(text: &str) -> Result<CaptureFile, ReplayError> {
        CaptureFile::from_reader(text.as_bytes())
    }

    #[test]
    fn test_parse_header_and_events() {
        let text = format!("{HEADER}\n\n{TIMER}\n{THREAD_NAME}\n");
        let capture = parse(&text).unwrap();

        assert_eq!(capture.session.process_id, 7);
        assert_eq!(capture.session.functions[0].name, "tick");
        assert!(capture.session.module_biases.is_empty());
        assert_eq!(capture.events[0], CaptureEvent::Timer(TimerRecord::new(16, 1, 5, 9)));
        assert_eq!(
            capture.events[1],
            CaptureEvent::ThreadName { thread_id: 1, name: "main".to_owned() }
        );
        assert_eq!(capture.timer_count(), 1);
    }

    #[test]
    fn test_header_only_capture_is_valid() {
        let capture = parse(HEADER).unwrap();
        assert!(capture.events.is_empty());
    }

    #[test]
    fn test_missing_session() {
        assert!(matches!(parse(""), Err(ReplayError::MissingSession)));
        assert!(matches!(parse(TIMER), Err(ReplayError::MissingSession)));
    }

    #[test]
    fn test_duplicate_session_reports_line() {
        let text = format!("{HEADER}\n{TIMER}\n{HEADER}\n");
        assert!(matches!(parse(&text), Err(ReplayError::DuplicateSession(3))));
    }

    #[test]
    fn test_parse_error_reports_line() {
        let text = format!("{HEADER}\n{TIMER}\n{{\"type\":\"timer\",\"thread_id\":1}}\n");
        let err = parse(&text).unwrap_err();
        assert!(matches!(err, ReplayError::Parse { line: 3, .. }));
        assert!(err.to_string().starts_with("Failed to parse capture line 3"));

        let err = parse("not json").unwrap_err();
        assert!(matches!(err, ReplayError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.jsonl");
        std::fs::write(&path, format!("{HEADER}\n{TIMER}\n")).unwrap();
        assert_eq!(CaptureFile::from_file(&path).unwrap().events.len(), 1);

        let missing = dir.path().join("absent.jsonl");
        assert!(matches!(CaptureFile::from_file(missing), Err(ReplayError::Io(_))));
    }
}
