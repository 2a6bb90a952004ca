use serde::{Deserialize, Serialize};

use super::TimedLine;
use crate::error::AlignError;

/// Document printed by the forced-transcription tool (and stored for caption files)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscriptionDocument {
    pub segments: Vec<TranscriptionSegment>,
}

/// A single recognized segment
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscriptionSegment {
    /// Start timestamp in seconds
    pub start: f64,
    /// End timestamp in seconds
    pub end: f64,
    /// Recognized text in the source script
    #[serde(alias = "text_ja")]
    pub text: String,
    /// Romanized text, when the tool produced it
    #[serde(default)]
    pub text_romaji: Option<String>,
    #[serde(default)]
    pub text_romaji_normalized: Option<String>,
}

impl TranscriptionDocument {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Convert to timed lines ordered by start time, dropping blank segments
    pub fn into_timed_lines(self) -> Result<Vec<TimedLine>, AlignError> {
        let mut lines = Vec::with_capacity(self.segments.len());

        for segment in self.segments {
            let text = segment.text.trim();
            if text.is_empty() {
                continue;
            }

            let mut line = TimedLine::new(segment.start, segment.end, text)?;
            if let Some(romanized) = segment.text_romaji_normalized.or(segment.text_romaji) {
                line = line.with_romanized(romanized);
            }
            lines.push(line);
        }

        // Chunked transcription can emit segments out of order
        lines.sort_by(|a, b| a.start.total_cmp(&b.start));

        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transcription_document() {
        let json = r#"{
            "segments": [
                {"start": 4.0, "end": 6.5, "text_ja": "夜に駆ける", "text_romaji": "yoru ni kakeru", "text_romaji_normalized": "yoru ni kakeru"},
                {"start": 0.5, "end": 3.0, "text": "  "},
                {"start": 1.0, "end": 3.5, "text": "Shizumu you ni"}
            ]
        }"#;

        let lines = TranscriptionDocument::from_json(json)
            .unwrap()
            .into_timed_lines()
            .unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Shizumu you ni");
        assert_eq!(lines[0].normalized, "shizumu you ni");
        assert_eq!(lines[0].romanized, None);
        assert_eq!(lines[1].text, "夜に駆ける");
        assert_eq!(lines[1].romanized.as_deref(), Some("yoru ni kakeru"));
    }

    #[test]
    fn test_invalid_segment_timing() {
        let json = r#"{"segments": [{"start": 5.0, "end": 1.0, "text": "oops"}]}"#;

        let result = TranscriptionDocument::from_json(json)
            .unwrap()
            .into_timed_lines();

        assert!(result.is_err());
    }
}
