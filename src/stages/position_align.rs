use tracing::info;

use super::segment_build::segments_from_assignments;
use crate::models::{
    AlignmentMethod, AlignmentResult, AssignmentKind, CueAssignment, FailureReason, TimedLine,
};

/// Fixed confidence reported for position alignment. It is a last resort, not a measurement.
pub const POSITION_CONFIDENCE: f64 = 0.70;

/// Widest reference/cue ratio for which lines are windowed and joined per cue
const MAX_WINDOW_RATIO: f64 = 1.5;

/// Map cues to reference lines purely by relative position
///
/// With `ratio = lines / cues`:
/// - `1 <= ratio <= 1.5`: each cue gets the window `floor(i*ratio)..floor((i+1)*ratio)`, joined with ", "
/// - otherwise: each cue gets the single line at `floor(i*ratio)`, clamped to the last line
pub fn assign_by_position(cue_count: usize, reference: &[String]) -> Vec<CueAssignment> {
    if cue_count == 0 || reference.is_empty() {
        return Vec::new();
    }

    let last = reference.len() - 1;
    let ratio = reference.len() as f64 / cue_count as f64;
    let index_at = |position: usize| ((position as f64 * ratio).floor() as usize).min(last);

    (0..cue_count)
        .map(|i| {
            let text = if (1.0..=MAX_WINDOW_RATIO).contains(&ratio) {
                let start = index_at(i);
                let end = ((i + 1) as f64 * ratio).floor() as usize;
                let end = end.min(reference.len());
                if end > start + 1 {
                    reference[start..end].join(", ")
                } else {
                    reference[start].clone()
                }
            } else {
                reference[index_at(i)].clone()
            };

            CueAssignment {
                cue_index: i,
                text,
                score: POSITION_CONFIDENCE,
                kind: AssignmentKind::Positional,
            }
        })
        .collect()
}

/// Position-only fallback alignment; never compares content
pub fn align_by_position(cues: &[TimedLine], reference: &[String]) -> AlignmentResult {
    let method = AlignmentMethod::PositionFallback;

    if reference.is_empty() {
        return AlignmentResult::invalid_input(method, FailureReason::NoLyricLines);
    }
    if cues.is_empty() {
        return AlignmentResult::invalid_input(method, FailureReason::NoCaptionLines);
    }

    let assignments = assign_by_position(cues.len(), reference);
    let segments = segments_from_assignments(&assignments, cues);

    // Spreading and windowing touch every line; sampling skips some
    let ratio = reference.len() as f64 / cues.len() as f64;
    let coverage = if ratio <= MAX_WINDOW_RATIO {
        1.0
    } else {
        cues.len() as f64 / reference.len() as f64
    };

    info!(
        "Position fallback: {} cues over {} lines (ratio {:.2})",
        cues.len(),
        reference.len(),
        ratio
    );

    AlignmentResult::accepted(method, segments, POSITION_CONFIDENCE, coverage)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    fn texts(assignments: &[CueAssignment]) -> Vec<&str> {
        assignments.iter().map(|a| a.text.as_str()).collect()
    }

    #[test]
    fn test_sparse_reference_is_spread() {
        let reference = strings(&["first", "second"]);

        let assignments = assign_by_position(5, &reference);

        assert_eq!(
            texts(&assignments),
            vec!["first", "first", "first", "second", "second"]
        );
    }

    #[test]
    fn test_windowed_ratio_joins_lines() {
        // ratio 1.5
        let reference = strings(&["a", "b", "c", "d", "e", "f"]);

        let assignments = assign_by_position(4, &reference);

        assert_eq!(texts(&assignments), vec!["a", "b, c", "d", "e, f"]);
    }

    #[test]
    fn test_equal_counts_map_one_to_one() {
        let reference = strings(&["a", "b", "c"]);

        assert_eq!(texts(&assign_by_position(3, &reference)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_dense_reference_is_sampled() {
        // ratio 2.5
        let reference = strings(&["a", "b", "c", "d", "e"]);

        assert_eq!(texts(&assign_by_position(2, &reference)), vec!["a", "c"]);
    }

    #[test]
    fn test_align_by_position_result() {
        let cues: Vec<TimedLine> = (0..5)
            .map(|i| TimedLine::new(i as f64, i as f64 + 0.5, "cue").unwrap())
            .collect();
        let reference = strings(&["first", "second"]);

        let result = align_by_position(&cues, &reference);

        assert!(result.ok);
        assert_eq!(result.method, AlignmentMethod::PositionFallback);
        assert_eq!(result.confidence, POSITION_CONFIDENCE);
        assert_eq!(result.coverage, 1.0);
        let segments = result.segments.unwrap();
        assert_eq!(segments.len(), 5);
        assert_eq!(segments[4].text, "second");
        assert_eq!(segments[4].start, 4.0);
    }

    #[test]
    fn test_align_by_position_empty_inputs() {
        let result = align_by_position(&[], &strings(&["a"]));
        assert_eq!(result.reason, Some(FailureReason::NoCaptionLines));

        let cues = vec![TimedLine::new(0.0, 1.0, "x").unwrap()];
        let result = align_by_position(&cues, &[]);
        assert_eq!(result.reason, Some(FailureReason::NoLyricLines));
    }
}
