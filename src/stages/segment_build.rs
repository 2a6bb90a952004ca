use tracing::warn;

use crate::models::{AlignmentOp, AssignmentKind, CueAssignment, TimedLine, TimedSegment};

/// Turn alignment ops into timed segments
///
/// Text always comes from `target`, timing from `donor`:
/// - Match: the donor line's span
/// - MergeDonor: first donor start to second donor end
/// - SplitTarget: the donor span cut into equal contiguous slices, one per target line
/// - Skips produce nothing
///
/// Output is in target order. Ops pointing outside the inputs are dropped.
pub fn build_segments(
    ops: &[AlignmentOp],
    donor: &[TimedLine],
    target: &[String],
) -> Vec<TimedSegment> {
    let mut segments = Vec::with_capacity(target.len());

    for op in ops {
        match *op {
            AlignmentOp::Match {
                donor: d,
                target: t,
            } => {
                let (Some(line), Some(text)) = (donor.get(d), target.get(t)) else {
                    warn!("Dropping out-of-range op {:?}", op);
                    continue;
                };
                segments.push(TimedSegment::new(line.start, line.end, text.clone()));
            }
            AlignmentOp::MergeDonor {
                donor: [first, second],
                target: t,
            } => {
                let (Some(first), Some(second), Some(text)) =
                    (donor.get(first), donor.get(second), target.get(t))
                else {
                    warn!("Dropping out-of-range op {:?}", op);
                    continue;
                };
                segments.push(TimedSegment::new(first.start, second.end, text.clone()));
            }
            AlignmentOp::SplitTarget {
                donor: d,
                target: [first, second],
            } => {
                let (Some(line), Some(first), Some(second)) =
                    (donor.get(d), target.get(first), target.get(second))
                else {
                    warn!("Dropping out-of-range op {:?}", op);
                    continue;
                };
                segments.extend(split_span(line, &[first, second]));
            }
            AlignmentOp::SkipDonor { .. } | AlignmentOp::SkipTarget { .. } => {}
        }
    }

    segments
}

/// Divide a donor span evenly across several target lines
fn split_span(line: &TimedLine, texts: &[&String]) -> Vec<TimedSegment> {
    let parts = texts.len();
    let slice = line.duration() / parts as f64;

    texts
        .iter()
        .enumerate()
        .map(|(k, text)| {
            let start = line.start + slice * k as f64;
            // Pin the final edge so the slices cover the span exactly
            let end = if k + 1 == parts {
                line.end
            } else {
                line.start + slice * (k + 1) as f64
            };
            TimedSegment::new(start, end, (*text).clone())
        })
        .collect()
}

/// Turn per-cue assignments into timed segments
///
/// Each cue keeps its own timing. A continuation cue extends the previous
/// segment instead of opening a new one, and blank cues produce nothing.
pub fn segments_from_assignments(
    assignments: &[CueAssignment],
    cues: &[TimedLine],
) -> Vec<TimedSegment> {
    let mut segments: Vec<TimedSegment> = Vec::with_capacity(assignments.len());

    for assignment in assignments {
        if assignment.is_blank() {
            continue;
        }
        let Some(cue) = cues.get(assignment.cue_index) else {
            continue;
        };

        if assignment.kind == AssignmentKind::Continuation {
            if let Some(last) = segments.last_mut() {
                if last.text == assignment.text {
                    last.end = last.end.max(cue.end);
                    continue;
                }
            }
        }

        segments.push(TimedSegment::new(cue.start, cue.end, assignment.text.clone()));
    }

    segments
}
