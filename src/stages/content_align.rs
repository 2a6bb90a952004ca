use tracing::{debug, info};

use super::segment_build::segments_from_assignments;
use crate::error::AlignError;
use crate::models::{
    AlignmentMethod, AlignmentResult, AssignmentKind, CueAssignment, FailureReason, TimedLine,
};
use crate::sources::Romanizer;
use crate::text::{compact, is_continuation, normalize, similarity};

/// Configuration for the greedy content aligner
#[derive(Debug, Clone)]
pub struct ContentAlignConfig {
    /// Widest window of consecutive reference lines tried per cue
    pub max_combination: usize,
    /// A window scoring above this is accepted without trying wider ones
    pub early_accept: f64,
    /// Minimum score for a window to be accepted
    pub accept_threshold: f64,
    /// Lookahead: next cue must score above this against a later line in the window
    pub lookahead_score: f64,
    /// Lookahead: that line must cover more than this fraction of the next cue
    pub lookahead_coverage: f64,
    /// Score credited to a continuation cue
    pub continuation_score: f64,
    /// Score credited when falling back to the next line in order
    pub sequential_score: f64,
    /// Overall confidence needed to accept the result
    pub min_confidence: f64,
}

impl Default for ContentAlignConfig {
    fn default() -> Self {
        Self {
            max_combination: 4,
            early_accept: 0.90,
            accept_threshold: 0.4,
            lookahead_score: 0.75,
            lookahead_coverage: 0.80,
            continuation_score: 0.95,
            sequential_score: 0.3,
            min_confidence: 0.45,
        }
    }
}

/// Window of consecutive reference lines chosen for one cue
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Combination {
    /// Number of reference lines consumed
    pub len: usize,
    pub score: f64,
}

/// Join comparable lines, skipping ones that normalized to nothing
fn join_comparable(lines: &[String]) -> String {
    lines
        .iter()
        .filter(|line| !line.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pick the window of upcoming reference lines that best matches `cue`
///
/// Tries 1..=`max_combination` lines from the front of `remaining`, stopping
/// early on a near-exact hit. If the winner spans several lines and the next
/// cue clearly belongs to one of its later lines, the window is cut just
/// before that line so the next cue can still claim it. Returns `None` only
/// when `remaining` is empty.
pub fn choose_combination(
    cue: &str,
    remaining: &[String],
    next_cue: Option<&str>,
    config: &ContentAlignConfig,
) -> Option<Combination> {
    let widest = config.max_combination.min(remaining.len());
    let mut best: Option<Combination> = None;

    for len in 1..=widest {
        let score = similarity(cue, &join_comparable(&remaining[..len]));
        if best.is_none_or(|b| score > b.score) {
            best = Some(Combination { len, score });
        }
        if score > config.early_accept {
            break;
        }
    }

    let best = best?;
    if best.len < 2 {
        return Some(best);
    }

    let Some(next) = next_cue.filter(|next| !next.is_empty()) else {
        return Some(best);
    };

    match lookahead_cut(next, remaining, best.len, config) {
        Some(len) => {
            let score = similarity(cue, &join_comparable(&remaining[..len]));
            debug!(
                "Lookahead shrank window from {} to {} lines (score {:.2})",
                best.len, len, score
            );
            Some(Combination { len, score })
        }
        None => Some(best),
    }
}

/// Number of lines to keep if the next cue should own a later line of the window
fn lookahead_cut(
    next: &str,
    remaining: &[String],
    window: usize,
    config: &ContentAlignConfig,
) -> Option<usize> {
    let next_chars = compact(next).chars().count();
    if next_chars == 0 {
        return None;
    }

    // What the next cue would get if the window stayed intact
    let following = remaining
        .get(window)
        .map_or(0.0, |line| similarity(next, line));

    (1..window).find(|&k| {
        let line = &remaining[k];
        let score = similarity(next, line);
        let coverage = compact(line).chars().count() as f64 / next_chars as f64;
        score > config.lookahead_score && coverage > config.lookahead_coverage && score >= following
    })
}

/// Inputs shared by every step of the content fold
struct ContentContext<'a> {
    cues: &'a [String],
    targets: &'a [String],
    targets_comparable: &'a [String],
    config: &'a ContentAlignConfig,
}

/// Running state of the greedy pass, threaded through each cue
#[derive(Debug, Default)]
struct ContentFold {
    target_cursor: usize,
    total_score: f64,
    outputs: Vec<CueAssignment>,
}

impl ContentFold {
    fn push(mut self, assignment: CueAssignment) -> Self {
        self.total_score += assignment.score;
        self.outputs.push(assignment);
        self
    }

    /// Take the next reference line in order, or a blank once exhausted
    fn take_next(
        mut self,
        ctx: &ContentContext,
        cue_index: usize,
        score: f64,
        kind: AssignmentKind,
    ) -> Self {
        match ctx.targets.get(self.target_cursor) {
            Some(text) => {
                let text = text.clone();
                self.target_cursor += 1;
                self.push(CueAssignment {
                    cue_index,
                    text,
                    score,
                    kind,
                })
            }
            None => self.push(CueAssignment::blank(cue_index)),
        }
    }

    fn advance(self, ctx: &ContentContext, cue_index: usize) -> Self {
        let cue = ctx.cues[cue_index].as_str();

        // Nothing to compare: place positionally
        if cue.is_empty() {
            return self.take_next(ctx, cue_index, 0.0, AssignmentKind::Positional);
        }

        // Timing split of the previous cue: reuse its text
        if cue_index > 0 {
            if let Some(previous) = self.outputs.last().filter(|p| !p.is_blank()) {
                if is_continuation(&ctx.cues[cue_index - 1], cue) {
                    let text = previous.text.clone();
                    debug!("Cue {} continues cue {}", cue_index, cue_index - 1);
                    return self.push(CueAssignment {
                        cue_index,
                        text,
                        score: ctx.config.continuation_score,
                        kind: AssignmentKind::Continuation,
                    });
                }
            }
        }

        let remaining = &ctx.targets_comparable[self.target_cursor..];
        let next_cue = ctx.cues.get(cue_index + 1).map(String::as_str);

        match choose_combination(cue, remaining, next_cue, ctx.config) {
            Some(combination) if combination.score > ctx.config.accept_threshold => {
                let start = self.target_cursor;
                let end = start + combination.len;
                let text = ctx.targets[start..end].join(" ");
                debug!(
                    "Cue {} -> lines {}..{} (score {:.2})",
                    cue_index, start, end, combination.score
                );

                let mut fold = self;
                fold.target_cursor = end;
                fold.push(CueAssignment {
                    cue_index,
                    text,
                    score: combination.score,
                    kind: AssignmentKind::Matched {
                        lines: combination.len,
                    },
                })
            }
            _ => self.take_next(
                ctx,
                cue_index,
                ctx.config.sequential_score,
                AssignmentKind::Sequential,
            ),
        }
    }
}

/// Per-cue assignments and the averaged confidence of a content pass
#[derive(Debug, Clone, PartialEq)]
pub struct ContentAssignment {
    pub assignments: Vec<CueAssignment>,
    pub confidence: f64,
    /// Reference lines consumed
    pub lines_consumed: usize,
}

/// Greedy content pass over already-comparable cue and reference texts
///
/// `targets` holds the display text; `targets_comparable` the same lines in
/// comparable form, index for index.
pub fn assign_by_content(
    cues: &[String],
    targets: &[String],
    targets_comparable: &[String],
    config: &ContentAlignConfig,
) -> ContentAssignment {
    let ctx = ContentContext {
        cues,
        targets,
        targets_comparable,
        config,
    };

    let fold = (0..cues.len()).fold(ContentFold::default(), |fold, i| fold.advance(&ctx, i));

    let confidence = if cues.is_empty() {
        0.0
    } else {
        fold.total_score / cues.len() as f64
    };

    ContentAssignment {
        assignments: fold.outputs,
        confidence,
        lines_consumed: fold.target_cursor,
    }
}

/// Slack for averaged scores that land a rounding step below a threshold
const SCORE_EPSILON: f64 = 1e-9;

/// Acceptance gate; a score at the threshold passes, including averages
/// such as (0.6 + 0.3) / 2 that round to just below it
pub fn meets_confidence(confidence: f64, threshold: f64) -> bool {
    confidence + SCORE_EPSILON >= threshold
}

/// Comparable form of a line: romanize, then normalize
fn comparable(text: &str, romanizer: &dyn Romanizer) -> Result<String, AlignError> {
    Ok(normalize(&romanizer.romanize(text)?))
}

/// Align caption cues against reference lyric lines by content
///
/// Requires a ready romanizer; without one the result is rejected with
/// `dependency_unavailable` and the caller should go to position alignment.
pub fn align_by_content(
    cues: &[TimedLine],
    reference: &[String],
    romanizer: &dyn Romanizer,
    config: &ContentAlignConfig,
) -> AlignmentResult {
    let method = AlignmentMethod::ContentMatching;

    if reference.is_empty() {
        return AlignmentResult::invalid_input(method, FailureReason::NoLyricLines);
    }
    if cues.is_empty() {
        return AlignmentResult::invalid_input(method, FailureReason::NoCaptionLines);
    }
    if !romanizer.is_ready() {
        return AlignmentResult::invalid_input(method, FailureReason::DependencyUnavailable);
    }

    let comparable_cues: Result<Vec<String>, _> = cues
        .iter()
        .map(|cue| match &cue.romanized {
            Some(romanized) => Ok(normalize(romanized)),
            None => comparable(&cue.text, romanizer),
        })
        .collect();
    let comparable_targets: Result<Vec<String>, _> = reference
        .iter()
        .map(|line| comparable(line, romanizer))
        .collect();

    let (comparable_cues, comparable_targets) = match (comparable_cues, comparable_targets) {
        (Ok(c), Ok(t)) => (c, t),
        (Err(e), _) | (_, Err(e)) => {
            info!("Romanizer failed, content matching unavailable: {}", e);
            return AlignmentResult::invalid_input(method, FailureReason::DependencyUnavailable);
        }
    };

    let pass = assign_by_content(&comparable_cues, reference, &comparable_targets, config);
    let segments = segments_from_assignments(&pass.assignments, cues);
    let coverage = pass.lines_consumed as f64 / reference.len() as f64;

    info!(
        "Content matching: {} cues, {} lines consumed, confidence {:.2}",
        cues.len(),
        pass.lines_consumed,
        pass.confidence
    );

    if meets_confidence(pass.confidence, config.min_confidence) {
        AlignmentResult::accepted(method, segments, pass.confidence, coverage)
    } else {
        AlignmentResult::rejected(
            method,
            FailureReason::LowConfidence,
            Some(segments),
            pass.confidence,
            coverage,
        )
    }
}
