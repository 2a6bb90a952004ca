use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::TimedSegment;

/// One step of a sequence alignment between donor (timed) and target (lyric) lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AlignmentOp {
    /// Donor line maps 1:1 to a target line
    Match { donor: usize, target: usize },
    /// Two consecutive donor lines map to one target line
    MergeDonor { donor: [usize; 2], target: usize },
    /// One donor line maps to two consecutive target lines
    SplitTarget { donor: usize, target: [usize; 2] },
    /// Donor line with no lyric counterpart
    SkipDonor { donor: usize },
    /// Lyric line with no donor counterpart
    SkipTarget { target: usize },
}

impl AlignmentOp {
    /// Donor indices consumed by this op, if any
    pub fn donor_range(&self) -> Option<Range<usize>> {
        match *self {
            AlignmentOp::Match { donor, .. }
            | AlignmentOp::SplitTarget { donor, .. }
            | AlignmentOp::SkipDonor { donor } => Some(donor..donor + 1),
            AlignmentOp::MergeDonor { donor, .. } => Some(donor[0]..donor[1] + 1),
            AlignmentOp::SkipTarget { .. } => None,
        }
    }

    /// Target indices consumed by this op, if any
    pub fn target_range(&self) -> Option<Range<usize>> {
        match *self {
            AlignmentOp::Match { target, .. }
            | AlignmentOp::MergeDonor { target, .. }
            | AlignmentOp::SkipTarget { target } => Some(target..target + 1),
            AlignmentOp::SplitTarget { target, .. } => Some(target[0]..target[1] + 1),
            AlignmentOp::SkipDonor { .. } => None,
        }
    }

    /// Whether this op drops a line instead of producing timed output
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            AlignmentOp::SkipDonor { .. } | AlignmentOp::SkipTarget { .. }
        )
    }
}

/// Strategy that produced an `AlignmentResult`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlignmentMethod {
    ContentMatching,
    PositionFallback,
    DpAlignment,
    /// Timed source used as final segments, no reference text involved
    SourceVerbatim,
}

impl fmt::Display for AlignmentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlignmentMethod::ContentMatching => "content-matching",
            AlignmentMethod::PositionFallback => "position-fallback",
            AlignmentMethod::DpAlignment => "dp-alignment",
            AlignmentMethod::SourceVerbatim => "source-verbatim",
        };
        f.write_str(name)
    }
}

/// Why an alignment attempt (or a ladder step) did not produce an accepted result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NoLyricLines,
    NoCaptionLines,
    InputTooLarge,
    LowConfidence,
    LowCoverage,
    DependencyUnavailable,
    SourceUnavailable,
    EmptySource,
    Timeout,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::NoLyricLines => "no_lyric_lines",
            FailureReason::NoCaptionLines => "no_caption_lines",
            FailureReason::InputTooLarge => "input_too_large",
            FailureReason::LowConfidence => "low_confidence",
            FailureReason::LowCoverage => "low_coverage",
            FailureReason::DependencyUnavailable => "dependency_unavailable",
            FailureReason::SourceUnavailable => "source_unavailable",
            FailureReason::EmptySource => "empty_source",
            FailureReason::Timeout => "timeout",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single alignment attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    /// Whether the result cleared its acceptance thresholds
    pub ok: bool,
    /// Produced segments; kept on low-confidence rejections for review
    pub segments: Option<Vec<TimedSegment>>,
    /// Aggregate similarity in [0, 1]
    pub confidence: f64,
    /// Fraction of reference lines that received timing
    pub coverage: f64,
    pub method: AlignmentMethod,
    pub reason: Option<FailureReason>,
}

impl AlignmentResult {
    pub fn accepted(
        method: AlignmentMethod,
        segments: Vec<TimedSegment>,
        confidence: f64,
        coverage: f64,
    ) -> Self {
        Self {
            ok: true,
            segments: Some(segments),
            confidence,
            coverage,
            method,
            reason: None,
        }
    }

    pub fn rejected(
        method: AlignmentMethod,
        reason: FailureReason,
        segments: Option<Vec<TimedSegment>>,
        confidence: f64,
        coverage: f64,
    ) -> Self {
        Self {
            ok: false,
            segments,
            confidence,
            coverage,
            method,
            reason: Some(reason),
        }
    }

    /// Rejection before any computation took place
    pub fn invalid_input(method: AlignmentMethod, reason: FailureReason) -> Self {
        Self::rejected(method, reason, None, 0.0, 0.0)
    }

    pub fn segment_count(&self) -> usize {
        self.segments.as_ref().map_or(0, Vec::len)
    }
}

/// How a caption cue obtained its text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssignmentKind {
    /// Matched against `lines` consecutive reference lines by content
    Matched { lines: usize },
    /// Timing split of the previous cue; reuses its text
    Continuation,
    /// Nothing matched well; took the next reference line in order
    Sequential,
    /// Placed by index without any content comparison
    Positional,
    /// Reference exhausted; no text
    Blank,
}

/// Text chosen for one caption cue by the content or position aligner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CueAssignment {
    pub cue_index: usize,
    pub text: String,
    pub score: f64,
    pub kind: AssignmentKind,
}

impl CueAssignment {
    pub fn blank(cue_index: usize) -> Self {
        Self {
            cue_index,
            text: String::new(),
            score: 0.0,
            kind: AssignmentKind::Blank,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}
