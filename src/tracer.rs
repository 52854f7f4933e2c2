//! One back-tracking episode: repeatedly step against the time-map gradient
//! from the current furthest unvisited voxel until a stopping criterion
//! fires, accumulating a branch polyline and its per-node radii.

use crate::confidence::forward_confidence;
use crate::config::{TraceConfig, Variant};
use crate::gradient::GradientField;
use crate::integrator::rk4_step;
use crate::node::{dist, Tree};
use crate::radius::estimate_radius;
use crate::tree_builder::match_point;
use crate::volume::{floor_coord, in_bounds_real, BinaryMask};
use crate::working_time::WorkingTime;

/// Why an episode's step loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Stepped within `1.2 * soma_radius` of the soma.
    ReachedSoma,
    /// Matched an existing tree node while stepping through already-traced
    /// tissue.
    Touched(i64),
    /// Rivulet-2 only: spent 100 steps inside already-traced tissue without
    /// matching any tree node.
    TouchedTimeout,
    /// The branch stalled: `branch[-15]` and the current point are closer
    /// than `1.0` apart.
    NotMoving,
    /// Gradient sampling failed (non-finite value, or the source point
    /// itself fell out of bounds).
    ValueError,
    /// Stepped outside the volume.
    OutOfBound,
    /// Reached already-traced tissue before any branch had ever been
    /// committed.
    NoTree,
    /// Rivulet-1 only: too many consecutive background steps.
    GapExceeded,
    /// Rivulet-2 only: online confidence dropped below `0.25`.
    LowConfidence,
    /// An external cooperative abort flag was observed.
    Aborted,
}

/// How a finished branch should be wired into the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectHint {
    /// Attach to the soma (id `0`).
    Soma,
    /// Attach to an existing node.
    Touched(i64),
    /// Leave `parent_id = -2`, to be resolved later.
    Unresolved,
}

impl From<StopReason> for ConnectHint {
    fn from(reason: StopReason) -> Self {
        match reason {
            StopReason::ReachedSoma => ConnectHint::Soma,
            StopReason::Touched(id) => ConnectHint::Touched(id),
            _ => ConnectHint::Unresolved,
        }
    }
}

/// The outcome of a single episode.
pub struct BranchResult {
    /// The branch polyline, head (episode source) first, tail last.
    pub points: Vec<[f64; 3]>,
    /// Per-point estimated radius, parallel to `points`.
    pub radii: Vec<f64>,
    /// Why the step loop stopped.
    pub stop_reason: StopReason,
    /// How the finished branch should be wired into the tree.
    pub connect_hint: ConnectHint,
    /// `cf[i] = sum(fg(points[0..i])) / (i + 1)`, see [`crate::confidence`].
    pub forward_confidence: Vec<f64>,
    /// `count(foreground steps) / len(points)`, used by the Rivulet-1 commit
    /// threshold.
    pub foreground_ratio: f64,
}

/// Runs a single back-tracking episode against a read-only snapshot of the
/// gradient field, binary mask, and working time map.
pub struct BranchTracer<'a> {
    /// The precomputed, immutable gradient of the time-crossing map.
    pub field: &'a GradientField,
    /// The binary foreground mask.
    pub mask: &'a BinaryMask,
    /// The current working time map episodes seed from and step against.
    pub working: &'a WorkingTime,
    /// The tree built so far, consulted for branch-to-tree matching.
    pub tree: &'a Tree,
    /// Soma center, in voxel-space coordinates.
    pub soma_pos: [f64; 3],
    /// Soma radius.
    pub soma_radius: f64,
    /// Tunable thresholds and variant selection for this run.
    pub config: &'a TraceConfig,
}

impl<'a> BranchTracer<'a> {
    /// Run one episode starting from the current furthest unvisited voxel.
    /// Returns `None` if there is no unvisited voxel left to seed from.
    pub fn run(&self) -> Option<BranchResult> {
        let (src0, _) = self.working.argmax_unvisited()?;
        let shape = self.mask.shape();
        let threshold_len = match self.config.variant {
            Variant::Rivulet2 => 6usize,
            Variant::Rivulet1 => self.config.min_length as usize,
        };

        let mut branch = vec![src0];
        let mut src = src0;
        let mut reached = false;
        let mut steps_after_reach: u32 = 0;
        let mut online_voxsum = 0.0_f64;
        let mut gapctr: u32 = 0;
        let mut fgctr: u32 = 0;

        let stop_reason = loop {
            let end = match rk4_step(self.field, src, 1.0) {
                Ok(p) => p,
                Err(_) => break StopReason::ValueError,
            };

            let end_coord = floor_coord(end, shape);
            let is_fg = end_coord.map(|c| self.mask[c]).unwrap_or(false);

            if self.config.variant == Variant::Rivulet1 {
                gapctr = if is_fg { 0 } else { gapctr + 1 };
                if gapctr > self.config.gap {
                    break StopReason::GapExceeded;
                }
            }
            if is_fg {
                fgctr += 1;
            }
            online_voxsum += if is_fg { 1.0 } else { 0.0 };
            let online_conf = online_voxsum / (branch.len() as f64 + 1.0);

            if dist(self.soma_pos, end) < 1.2 * self.soma_radius {
                break StopReason::ReachedSoma;
            }

            if let Some(c) = end_coord {
                if self.working.is_reached(c) {
                    reached = true;
                }
            }

            if reached {
                if self.tree.is_empty() {
                    break StopReason::NoTree;
                }
                steps_after_reach += 1;
                let end_radius_voxel = end_coord.unwrap_or((0, 0, 0));
                let end_radius = estimate_radius(self.mask, end_radius_voxel) as f64;
                let (touched, touch_id) =
                    match_point(self.tree, end, end_radius, self.config.variant, self.config.wiring);

                match self.config.variant {
                    Variant::Rivulet1 => {
                        break if touched { StopReason::Touched(touch_id) } else { StopReason::TouchedTimeout };
                    }
                    Variant::Rivulet2 => {
                        if touched {
                            break StopReason::Touched(touch_id);
                        }
                        if steps_after_reach >= 100 {
                            break StopReason::TouchedTimeout;
                        }
                    }
                }
            }

            let mut end = end;
            if dist(end, src) <= 0.5 && branch.len() >= threshold_len.max(4) {
                let a = branch[branch.len() - 1];
                let b = branch[branch.len() - 4];
                end = [src[0] + (a[0] - b[0]), src[1] + (a[1] - b[1]), src[2] + (a[2] - b[2])];
            }

            if branch.len() > 15 && dist(branch[branch.len() - 15], end) < 1.0 {
                break StopReason::NotMoving;
            }

            if self.config.variant == Variant::Rivulet2 && online_conf < 0.25 {
                break StopReason::LowConfidence;
            }

            if !in_bounds_real(end, shape) {
                break StopReason::OutOfBound;
            }

            branch.push(end);
            src = end;
        };

        let radii: Vec<f64> = branch
            .iter()
            .map(|&p| {
                let c = floor_coord(p, shape).unwrap_or((0, 0, 0));
                (estimate_radius(self.mask, c) as f64).max(1.0)
            })
            .collect();
        let forward_confidence = forward_confidence(&branch, self.mask);
        let foreground_ratio = fgctr as f64 / branch.len() as f64;
        let connect_hint = ConnectHint::from(stop_reason);

        Some(BranchResult { points: branch, radii, stop_reason, connect_hint, forward_confidence, foreground_ratio })
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
    fn straight_tube_reaches_soma() {
        let (field, mask, working) = straight_tube();
        let tree = Tree::new();
        let config = TraceConfig::default();
        let tracer = BranchTracer {
            field: &field,
            mask: &mask,
            working: &working,
            tree: &tree,
            soma_pos: [0.0, 15.0, 15.0],
            soma_radius: 1.0,
            config: &config,
        };
        let result = tracer.run().unwrap();
        assert_eq!(result.stop_reason, StopReason::ReachedSoma);
        assert!(result.points.len() > 20);
        assert!(result.radii.iter().all(|&r| r >= 1.0));
    }

    #[test]
    fn no_unvisited_voxels_returns_none() {
        let shape = (3, 3, 3);
        let mask = BinaryMask::filled(shape, false);
        let time = Volume::filled(shape, 0.0_f64);
        let field = GradientField::from_time_map(&time);
        let working = WorkingTime::new(&time, &mask);
        let tree = Tree::new();
        let config = TraceConfig::default();
        let tracer = BranchTracer {
            field: &field,
            mask: &mask,
            working: &working,
            tree: &tree,
            soma_pos: [0.0, 0.0, 0.0],
            soma_radius: 1.0,
            config: &config,
        };
        assert!(tracer.run().is_none());
    }

    #[test]
    fn reaching_already_covered_tissue_without_tree_stops_no_tree() {
        let (field, mask, mut working) = straight_tube();
        // Cover voxels 0..10 so the episode walks into already-traced tissue
        // before any branch has been committed.
        for x in 0..10 {
            working.mark((x, 15, 15), true);
        }
        let tree = Tree::new();
        let config = TraceConfig::default();
        let tracer = BranchTracer {
            field: &field,
            mask: &mask,
            working: &working,
            tree: &tree,
            soma_pos: [-100.0, -100.0, -100.0],
            soma_radius: 1.0,
            config: &config,
        };
        let result = tracer.run().unwrap();
        assert_eq!(result.stop_reason, StopReason::NoTree);
    }
}
