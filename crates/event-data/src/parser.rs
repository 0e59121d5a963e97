//! Reader and writer for JSON-lines event files.
//!
//! Format: one JSON-encoded `Event` per line. Blank lines are skipped;
//! line numbers in errors are 1-based.

use crate::error::{DataError, Result};
use crate::types::Event;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Parse every event from a JSON-lines reader.
pub fn parse_events<R: BufRead>(reader: R) -> Result<Vec<Event>> {
    let mut events = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_trimmed = line.trim();
        if line_trimmed.is_empty() {
            continue;
        }

        let event: Event = serde_json::from_str(line_trimmed).map_err(|e| DataError::Json {
            line: idx + 1,
            source: e,
        })?;
        events.push(event);
    }

    Ok(events)
}

/// Load all events from a JSON-lines file.
pub fn read_events(path: &Path) -> Result<Vec<Event>> {
    let file = File::open(path)?;
    let events = parse_events(BufReader::new(file))?;
    tracing::debug!("Read {} events from {:?}", events.len(), path);
    Ok(events)
}

/// Write events as JSON lines.
pub fn write_events(path: &Path, events: &[Event]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for (idx, event) in events.iter().enumerate() {
        let line = serde_json::to_string(event).map_err(|e| DataError::Json {
            line: idx + 1,
            source: e,
        })?;
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_minimal_event() {
        let input = r#"{"id": {"run": 1, "lumi": 7, "event": 42}}"#;
        let events = parse_events(Cursor::new(input)).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id.event, 42);
        assert_eq!(events[0].weight, 1.0);
        assert!(events[0].triggers.is_none());
    }

    #[test]
    fn test_parse_collections_and_blank_lines() {
        let input = concat!(
            r#"{"id": {"run": 1, "lumi": 1, "event": 1}, "jets": {"jets": [{"p4": {"pt": 35.0, "eta": 0.4, "phi": 1.0}, "n_constituents": 5}]}}"#,
            "\n\n",
            r#"{"id": {"run": 1, "lumi": 1, "event": 2}, "triggers": [{"name": "HLT_IsoMu24_v1", "fired": true}]}"#,
            "\n"
        );
        let events = parse_events(Cursor::new(input)).unwrap();

        assert_eq!(events.len(), 2);
        let jets = events[0].jets("jets").unwrap();
        assert_eq!(jets.len(), 1);
        assert_eq!(jets[0].n_constituents, 5);
        assert_eq!(jets[0].p4.mass, 0.0);

        let triggers = events[1].trigger_paths().unwrap();
        assert_eq!(triggers[0].prescale, 1);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let input = "{\"id\": {\"run\": 1, \"lumi\": 1, \"event\": 1}}\nnot json\n";
        let err = parse_events(Cursor::new(input)).unwrap_err();
        assert!(matches!(err, DataError::Json { line: 2, .. }));
    }
}
