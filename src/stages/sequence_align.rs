use tracing::{debug, info};

use super::content_align::meets_confidence;
use super::segment_build::build_segments;
use crate::models::{AlignmentMethod, AlignmentOp, AlignmentResult, FailureReason, TimedLine};
use crate::text::{levenshtein, normalize, similarity};

/// Configuration for the DP sequence aligner
#[derive(Debug, Clone)]
pub struct SequenceAlignConfig {
    /// Cost of dropping a timed line
    pub skip_donor_cost: usize,
    /// Cost of dropping a lyric line; higher than a donor skip since lyric text is authoritative
    pub skip_target_cost: usize,
    /// Largest `donor x target` table we are willing to fill
    pub max_cells: usize,
    /// Minimum mean similarity over aligned ops
    pub min_confidence: f64,
    /// Minimum fraction of lyric lines that must receive timing
    pub min_coverage: f64,
}

impl Default for SequenceAlignConfig {
    fn default() -> Self {
        Self {
            skip_donor_cost: 2,
            skip_target_cost: 3,
            max_cells: 250_000,
            min_confidence: 0.45,
            min_coverage: 0.5,
        }
    }
}

/// Optimal op sequence and its total cost
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceAlignment {
    pub ops: Vec<AlignmentOp>,
    pub total_cost: usize,
}

/// Transition recorded in each DP cell for backtracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Match,
    MergeDonor,
    SplitTarget,
    SkipDonor,
    SkipTarget,
}

impl Step {
    /// (donor, target) lines consumed
    fn movement(self) -> (usize, usize) {
        match self {
            Step::Match => (1, 1),
            Step::MergeDonor => (2, 1),
            Step::SplitTarget => (1, 2),
            Step::SkipDonor => (1, 0),
            Step::SkipTarget => (0, 1),
        }
    }

    /// Op produced when backtracking through this step into cell (i, j)
    fn op_at(self, i: usize, j: usize) -> AlignmentOp {
        match self {
            Step::Match => AlignmentOp::Match {
                donor: i - 1,
                target: j - 1,
            },
            Step::MergeDonor => AlignmentOp::MergeDonor {
                donor: [i - 2, i - 1],
                target: j - 1,
            },
            Step::SplitTarget => AlignmentOp::SplitTarget {
                donor: i - 1,
                target: [j - 2, j - 1],
            },
            Step::SkipDonor => AlignmentOp::SkipDonor { donor: i - 1 },
            Step::SkipTarget => AlignmentOp::SkipTarget { target: j - 1 },
        }
    }
}

/// Keep the cheaper of the current best and a candidate; ties keep the earlier one
fn relax(best: &mut Option<(usize, Step)>, cost: usize, step: Step) {
    if best.is_none_or(|(current, _)| cost < current) {
        *best = Some((cost, step));
    }
}

/// Globally align donor (timed) lines against target (lyric) lines
///
/// Needleman-Wunsch over an `(n+1) x (m+1)` table minimizing total cost, with
/// match, merge-two-donors, split-into-two-targets and skip transitions. The
/// returned ops partition `0..n` and `0..m` in order. O(n*m) time and space;
/// callers bound the input size (see `align_sequences`).
pub fn align(
    donor: &[TimedLine],
    target: &[String],
    config: &SequenceAlignConfig,
) -> SequenceAlignment {
    let n = donor.len();
    let m = target.len();
    let donor_norm: Vec<&str> = donor.iter().map(|d| d.normalized.as_str()).collect();
    let target_norm: Vec<String> = target.iter().map(|t| normalize(t)).collect();

    let mut costs = vec![vec![0usize; m + 1]; n + 1];
    let mut steps: Vec<Vec<Option<Step>>> = vec![vec![None; m + 1]; n + 1];

    for i in 0..=n {
        for j in 0..=m {
            if i == 0 && j == 0 {
                continue;
            }

            let mut best: Option<(usize, Step)> = None;

            if i > 0 && j > 0 {
                let cost = levenshtein(donor_norm[i - 1], &target_norm[j - 1]);
                relax(&mut best, costs[i - 1][j - 1] + cost, Step::Match);
            }
            if i > 1 && j > 0 {
                let merged = format!("{} {}", donor_norm[i - 2], donor_norm[i - 1]);
                let cost = levenshtein(&merged, &target_norm[j - 1]);
                relax(&mut best, costs[i - 2][j - 1] + cost, Step::MergeDonor);
            }
            if i > 0 && j > 1 {
                let split = format!("{} {}", target_norm[j - 2], target_norm[j - 1]);
                let cost = levenshtein(donor_norm[i - 1], &split);
                relax(&mut best, costs[i - 1][j - 2] + cost, Step::SplitTarget);
            }
            if i > 0 {
                relax(
                    &mut best,
                    costs[i - 1][j] + config.skip_donor_cost,
                    Step::SkipDonor,
                );
            }
            if j > 0 {
                relax(
                    &mut best,
                    costs[i][j - 1] + config.skip_target_cost,
                    Step::SkipTarget,
                );
            }

            if let Some((cost, step)) = best {
                costs[i][j] = cost;
                steps[i][j] = Some(step);
            }
        }
    }

    // Backtrack from (n, m) to (0, 0)
    let mut ops = Vec::new();
    let (mut i, mut j) = (n, m);
    while let Some(step) = steps[i][j] {
        ops.push(step.op_at(i, j));
        let (di, dj) = step.movement();
        i -= di;
        j -= dj;
    }
    ops.reverse();

    SequenceAlignment {
        ops,
        total_cost: costs[n][m],
    }
}

/// Mean similarity of the texts joined by each non-skip op, and the fraction
/// of target lines those ops consumed
fn score_ops(ops: &[AlignmentOp], donor: &[TimedLine], target_norm: &[String]) -> (f64, f64) {
    let mut total = 0.0;
    let mut scored = 0usize;
    let mut covered = 0usize;

    for op in ops.iter().filter(|op| !op.is_skip()) {
        let (Some(donor_range), Some(target_range)) = (op.donor_range(), op.target_range()) else {
            continue;
        };
        let donor_text = donor[donor_range]
            .iter()
            .map(|d| d.normalized.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let target_text = target_norm[target_range.clone()].join(" ");

        total += similarity(&donor_text, &target_text);
        scored += 1;
        covered += target_range.len();
    }

    let confidence = if scored > 0 {
        total / scored as f64
    } else {
        0.0
    };
    let coverage = if target_norm.is_empty() {
        0.0
    } else {
        covered as f64 / target_norm.len() as f64
    };

    (confidence, coverage)
}

/// Run the DP aligner end to end and gate the result on confidence and coverage
pub fn align_sequences(
    donor: &[TimedLine],
    target: &[String],
    config: &SequenceAlignConfig,
) -> AlignmentResult {
    if target.is_empty() {
        return AlignmentResult::invalid_input(
            AlignmentMethod::DpAlignment,
            FailureReason::NoLyricLines,
        );
    }
    if donor.is_empty() {
        return AlignmentResult::invalid_input(
            AlignmentMethod::DpAlignment,
            FailureReason::NoCaptionLines,
        );
    }
    if donor.len().saturating_mul(target.len()) > config.max_cells {
        info!(
            "DP alignment refused: {} x {} exceeds {} cells",
            donor.len(),
            target.len(),
            config.max_cells
        );
        return AlignmentResult::invalid_input(
            AlignmentMethod::DpAlignment,
            FailureReason::InputTooLarge,
        );
    }

    let alignment = align(donor, target, config);
    let target_norm: Vec<String> = target.iter().map(|t| normalize(t)).collect();
    let (confidence, coverage) = score_ops(&alignment.ops, donor, &target_norm);
    let segments = build_segments(&alignment.ops, donor, target);

    debug!("DP ops: {:?}", alignment.ops);
    info!(
        "DP alignment: {} ops, cost {}, confidence {:.2}, coverage {:.2}",
        alignment.ops.len(),
        alignment.total_cost,
        confidence,
        coverage
    );

    if !meets_confidence(confidence, config.min_confidence) {
        AlignmentResult::rejected(
            AlignmentMethod::DpAlignment,
            FailureReason::LowConfidence,
            Some(segments),
            confidence,
            coverage,
        )
    } else if !meets_confidence(coverage, config.min_coverage) {
        AlignmentResult::rejected(
            AlignmentMethod::DpAlignment,
            FailureReason::LowCoverage,
            Some(segments),
            confidence,
            coverage,
        )
    } else {
        AlignmentResult::accepted(AlignmentMethod::DpAlignment, segments, confidence, coverage)
    }
}
