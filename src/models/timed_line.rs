use serde::{Deserialize, Serialize};

use crate::error::AlignError;
use crate::text::normalize;

/// A caption or transcription line with timing, as delivered by a timed source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedLine {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Text as delivered by the source
    pub text: String,
    /// Comparable form of `text` (see `text::normalize`)
    pub normalized: String,
    /// Romanized form supplied by the source, if it already produced one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub romanized: Option<String>,
}

impl TimedLine {
    /// Create a line, rejecting timings that violate `end >= start >= 0`
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Result<Self, AlignError> {
        // Written so NaN fails too
        if !(start >= 0.0 && end >= start) {
            return Err(AlignError::InvalidTiming { start, end });
        }

        let text = text.into();
        Ok(Self {
            start,
            end,
            normalized: normalize(&text),
            text,
            romanized: None,
        })
    }

    /// Attach a source-provided romanization
    pub fn with_romanized(mut self, romanized: impl Into<String>) -> Self {
        self.romanized = Some(romanized.into());
        self
    }

    /// Duration of this line in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Final output unit: text from the reference lyrics, timing from the captions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl TimedSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

impl From<&TimedLine> for TimedSegment {
    fn from(line: &TimedLine) -> Self {
        Self::new(line.start, line.end, line.text.clone())
    }
}
