use std::path::Path;

use anyhow::{Context, Result};

use crate::models::{TimedLine, TranscriptionDocument};

/// Parse a transcription JSON file into timed lines
pub fn read_timed_lines(path: &Path) -> Result<Vec<TimedLine>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    parse_transcription_json(&content)
}

/// Parse a transcription JSON string (`{"segments": [...]}`) into timed lines
pub fn parse_transcription_json(json: &str) -> Result<Vec<TimedLine>> {
    let document =
        TranscriptionDocument::from_json(json).context("Failed to parse transcription JSON")?;
    document
        .into_timed_lines()
        .context("Transcription contains invalid timing")
}

/// Read a raw lyric text file
pub fn read_reference_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transcription_json() {
        let json = r#"{
            "segments": [
                {"start": 4.0, "end": 5.5, "text_ja": "二行目", "text_romaji": "ni gyoume"},
                {"start": 0.5, "end": 2.0, "text": "First line"},
                {"start": 2.0, "end": 3.0, "text": "   "}
            ]
        }"#;

        let lines = parse_transcription_json(json).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "First line");
        assert_eq!(lines[1].romanized.as_deref(), Some("ni gyoume"));
    }

    #[test]
    fn test_invalid_timing_rejected() {
        let json = r#"{"segments": [{"start": 3.0, "end": 1.0, "text": "backwards"}]}"#;

        assert!(parse_transcription_json(json).is_err());
    }

    #[test]
    fn test_read_files() {
        let dir = tempfile::tempdir().unwrap();
        let captions = dir.path().join("captions.json");
        let lyrics = dir.path().join("lyrics.txt");
        std::fs::write(&captions, r#"{"segments": [{"start": 0.0, "end": 1.0, "text": "la"}]}"#)
            .unwrap();
        std::fs::write(&lyrics, "la\n").unwrap();

        assert_eq!(read_timed_lines(&captions).unwrap().len(), 1);
        assert_eq!(read_reference_text(&lyrics).unwrap(), "la\n");
        assert!(read_reference_text(&dir.path().join("missing.txt")).is_err());
    }
}
