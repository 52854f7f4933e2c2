//! Drives episodes (`BranchTracer` → `Eraser` → `TreeBuilder`) until the
//! coverage target is reached or no further progress is possible.

use crate::config::{TraceConfig, Variant};
use crate::eraser::Eraser;
use crate::gradient::GradientField;
use crate::node::Tree;
use crate::tracer::{BranchResult, BranchTracer, StopReason};
use crate::tree_builder;
use crate::volume::BinaryMask;
use crate::working_time::WorkingTime;

/// Outcome of running the loop to completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSummary {
    /// Number of episodes run.
    pub episodes: u32,
    /// Fraction of foreground voxels no longer `Unvisited` when the loop stopped.
    pub final_coverage: f64,
    /// Set if the loop stopped early because the furthest remaining
    /// unvisited voxel had a non-positive time value, rather than because
    /// the coverage target was reached or the volume was exhausted.
    pub degenerate: bool,
}

/// Run episodes until `config.coverage` is reached, the time map is
/// exhausted, or a degenerate (non-positive) seed time forces early
/// termination. Mutates `working` and `tree` in place.
pub fn run(
    tree: &mut Tree,
    field: &GradientField,
    mask: &BinaryMask,
    working: &mut WorkingTime,
    eraser: &mut Eraser,
    config: &TraceConfig,
    soma_pos: [f64; 3],
    soma_radius: f64,
) -> LoopSummary {
    let mut episodes: u32 = 0;
    let mut degenerate = false;

    loop {
        let coverage = working.coverage(mask);
        if coverage >= config.coverage {
            break;
        }

        let Some((_, seed_time)) = working.argmax_unvisited() else {
            break;
        };
        if seed_time <= 0.0 {
            degenerate = true;
            break;
        }

        let result = {
            let tracer = BranchTracer {
                field,
                mask,
                working: &*working,
                tree: &*tree,
                soma_pos,
                soma_radius,
                config,
            };
            tracer.run()
        };
        let Some(result) = result else { break };

        let commit = should_commit(&result, config);
        let low_conf = result.stop_reason == StopReason::LowConfidence;
        eraser.erase(working, &result.points, &result.radii, config.variant, config.erase_ratio, low_conf);

        if commit {
            tree_builder::add_branch(tree, &result.points, &result.radii, result.connect_hint, result.stop_reason);
        }

        episodes += 1;
        if !config.silence {
            tracing::debug!(
                episode = episodes,
                coverage,
                points = result.points.len(),
                stop_reason = ?result.stop_reason,
                committed = commit,
                "trace episode complete"
            );
        }
    }

    let final_coverage = working.coverage(mask);
    tracing::info!(episodes, final_coverage, nodes = tree.len(), degenerate, "trace loop finished");

    LoopSummary { episodes, final_coverage, degenerate }
}

/// Whether a finished episode should be wired into the tree.
///
/// Rivulet-2: commit iff the branch did not stop for low online confidence
/// and its forward confidence at the tail is at least `0.5`.
/// Rivulet-1: commit iff at least `30%` of steps landed on foreground, and
/// the branch isn't a tiny stub that only exists because the gap counter
/// tripped immediately.
fn should_commit(result: &BranchResult, config: &TraceConfig) -> bool {
    match config.variant {
        Variant::Rivulet2 => {
            if result.stop_reason == StopReason::LowConfidence {
                return false;
            }
            result.forward_confidence.last().copied().unwrap_or(0.0) >= 0.5
        }
        Variant::Rivulet1 => {
            let enough_foreground = result.foreground_ratio >= 0.3;
            let gap_stub =
                result.stop_reason == StopReason::GapExceeded && result.points.len() < config.min_length as usize;
            enough_foreground && !gap_stub
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Volume;

    fn straight_tube() -> (GradientField, BinaryMask, WorkingTime) {
        let shape = (30, 30, 30);
        let mut mask = BinaryMask::filled(shape, false);
        let mut time = Volume::filled(shape, -1.0_f64);
        for x in 0..30 {
            mask[(x, 15, 15)] = true;
            time[(x, 15, 15)] = x as f64;
        }
        let field = GradientField::from_time_map(&time);
        let working = WorkingTime::new(&time, &mask);
        (field, mask, working)
    }

    #[test]
    fn straight_tube_commits_a_branch_and_reaches_full_coverage() {
        let (field, mask, mut working) = straight_tube();
        let mut tree = Tree::new();
        let mut eraser = Eraser::new(mask.shape());
        let config = TraceConfig::default();
        let summary =
            run(&mut tree, &field, &mask, &mut working, &mut eraser, &config, [0.0, 15.0, 15.0], 1.0);
        assert!(summary.episodes >= 1);
        assert!(summary.final_coverage >= config.coverage);
        assert!(!tree.is_empty());
    }

    #[test]
    fn degenerate_time_map_terminates_without_progress() {
        let shape = (5, 5, 5);
        let mask = BinaryMask::filled(shape, true);
        let time = Volume::filled(shape, 0.0_f64);
        let field = GradientField::from_time_map(&time);
        let mut working = WorkingTime::new(&time, &mask);
        let mut tree = Tree::new();
        let mut eraser = Eraser::new(shape);
        let config = TraceConfig::default();
        let summary = run(&mut tree, &field, &mask, &mut working, &mut eraser, &config, [0.0, 0.0, 0.0], 1.0);
        assert!(summary.degenerate);
        assert_eq!(summary.episodes, 0);
        assert!(tree.is_empty());
    }

    #[test]
    fn empty_mask_converges_immediately_at_full_coverage() {
        let shape = (3, 3, 3);
        let mask = BinaryMask::filled(shape, false);
        let time = Volume::filled(shape, 0.0_f64);
        let field = GradientField::from_time_map(&time);
        let mut working = WorkingTime::new(&time, &mask);
        let mut tree = Tree::new();
        let mut eraser = Eraser::new(shape);
        let config = TraceConfig::default();
        let summary = run(&mut tree, &field, &mask, &mut working, &mut eraser, &config, [0.0, 0.0, 0.0], 1.0);
        assert_eq!(summary.episodes, 0);
        assert!(!summary.degenerate);
        assert_eq!(summary.final_coverage, 1.0);
    }
}
