use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{AlignmentResult, TimedSegment};
use crate::orchestrator::{Outcome, StepAttempt};

/// Machine-readable output format
#[derive(Debug, Clone, Serialize)]
pub struct MachineOutput {
    pub result: AlignmentResult,
    pub metadata: OutputMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputMetadata {
    pub identifier: Option<String>,
    pub run_id: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub caption_lines: usize,
    pub reference_lines: usize,
    pub segment_count: usize,
    /// Rejected result returned on request
    pub low_confidence: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<StepAttempt>,
}

impl MachineOutput {
    /// Wrap a single aligner result
    pub fn from_result(result: AlignmentResult, caption_lines: usize, reference_lines: usize) -> Self {
        let metadata = OutputMetadata {
            identifier: None,
            run_id: None,
            generated_at: Utc::now(),
            caption_lines,
            reference_lines,
            segment_count: result.segment_count(),
            low_confidence: false,
            attempts: Vec::new(),
        };
        Self { result, metadata }
    }

    /// Wrap a ladder outcome
    pub fn from_outcome(outcome: Outcome) -> Self {
        let metadata = OutputMetadata {
            identifier: Some(outcome.identifier),
            run_id: Some(outcome.run_id),
            generated_at: Utc::now(),
            caption_lines: 0,
            reference_lines: 0,
            segment_count: outcome.result.segment_count(),
            low_confidence: outcome.low_confidence,
            attempts: outcome.attempts,
        };
        Self {
            result: outcome.result,
            metadata,
        }
    }

    /// Write to a JSON file
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        serde_json::to_writer_pretty(file, self).context("Failed to write JSON")?;
        Ok(())
    }
}

/// Human-readable subtitle blocks
pub struct SubtitleDocument<'a> {
    segments: &'a [TimedSegment],
}

impl<'a> SubtitleDocument<'a> {
    pub fn new(segments: &'a [TimedSegment]) -> Self {
        Self { segments }
    }

    /// One `MM:SS.mmm --> MM:SS.mmm` block per segment
    pub fn format(&self) -> String {
        let mut output = String::new();

        for segment in self.segments {
            output.push_str(&format!(
                "{} --> {}\n{}\n\n",
                format_timestamp(segment.start),
                format_timestamp(segment.end),
                segment.text
            ));
        }

        output
    }

    /// Write to a text file
    pub fn write_file(&self, path: &Path) -> Result<()> {
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        write!(file, "{}", self.format())?;
        Ok(())
    }
}

/// Format seconds as MM:SS.mmm
fn format_timestamp(seconds: f64) -> String {
    let ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let total_secs = ms / 1000;
    let millis = ms % 1000;
    let minutes = total_secs / 60;
    let secs = total_secs % 60;
    format!("{:02}:{:02}.{:03}", minutes, secs, millis)
}
