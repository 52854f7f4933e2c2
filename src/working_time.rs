//! The mutable time map the trace loop consumes voxels from.
//!
//! The reference algorithm conflates three states into one `f64` field via
//! `-1`/`-2` sentinels (unvisited, covered-by-accepted-branch,
//! masked-out). That's a representation artifact: here the real time value
//! and the voxel's state are kept in separate volumes, so the geodesic time
//! is never destroyed by tracing. [`WorkingTime::effective_time`] still
//! reproduces the original sentinel-laden value wherever the algorithm
//! compares against it directly (e.g. "reached if `tt[idx] == -1`"), so the
//! stepping/erase logic stays bit-for-bit faithful to the source.

use crate::volume::{BinaryMask, Coord, Volume};

/// Tri-state tag for a single voxel of [`WorkingTime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoxelState {
    /// Numeric time value is live; this voxel is a candidate episode seed.
    Unvisited,
    /// Swept by an accepted branch. Corresponds to the source's `-1`.
    Covered,
    /// Never foreground, or swept by a rejected/low-confidence branch.
    /// Corresponds to the source's `-2`.
    Masked,
}

/// Mutable working copy of the time-crossing map, with the tri-state
/// convention described above.
#[derive(Debug, Clone)]
pub struct WorkingTime {
    time: Volume<f64>,
    state: Volume<VoxelState>,
}

impl WorkingTime {
    /// Build from the original time map and binary mask: non-foreground
    /// voxels start `Masked`, foreground voxels start `Unvisited`.
    pub fn new(time_map: &Volume<f64>, mask: &BinaryMask) -> Self {
        let shape = time_map.shape();
        let mut state = Volume::filled(shape, VoxelState::Masked);
        for (c, &is_fg) in mask.iter() {
            if is_fg {
                state[c] = VoxelState::Unvisited;
            }
        }
        Self { time: time_map.clone(), state }
    }

    /// Shape of the underlying volumes.
    #[inline]
    pub fn shape(&self) -> (usize, usize, usize) {
        self.time.shape()
    }

    /// The tri-state tag at `c`.
    #[inline]
    pub fn state(&self, c: Coord) -> VoxelState {
        self.state[c]
    }

    /// The value the original tri-state scheme would hold at `c`: the real
    /// time if `Unvisited`, `-1.0` if `Covered`, `-2.0` if `Masked`.
    #[inline]
    pub fn effective_time(&self, c: Coord) -> f64 {
        match self.state[c] {
            VoxelState::Unvisited => self.time[c],
            VoxelState::Covered => -1.0,
            VoxelState::Masked => -2.0,
        }
    }

    /// `true` if `c` was swept by an accepted branch (the source's `-1`).
    #[inline]
    pub fn is_reached(&self, c: Coord) -> bool {
        self.state[c] == VoxelState::Covered
    }

    /// The furthest unvisited foreground voxel, as a real-valued point, with
    /// its time value. `None` once no `Unvisited` voxel remains.
    pub fn argmax_unvisited(&self) -> Option<([f64; 3], f64)> {
        let mut best: Option<(Coord, f64)> = None;
        for (c, &t) in self.time.iter() {
            if self.state[c] == VoxelState::Unvisited {
                if best.map(|(_, bt)| t > bt).unwrap_or(true) {
                    best = Some((c, t));
                }
            }
        }
        best.map(|(c, t)| ([c.0 as f64, c.1 as f64, c.2 as f64], t))
    }

    /// Mark `c` `Covered` or `Masked`. A no-op if `c` has already left the
    /// `Unvisited` state, preserving the monotonic-state invariant.
    pub fn mark(&mut self, c: Coord, covered: bool) {
        if self.state[c] == VoxelState::Unvisited {
            self.state[c] = if covered { VoxelState::Covered } else { VoxelState::Masked };
        }
    }

    /// Fraction of foreground voxels that are no longer `Unvisited`.
    pub fn coverage(&self, mask: &BinaryMask) -> f64 {
        let total = mask.foreground_count();
        if total == 0 {
            return 1.0;
        }
        let covered = mask
            .iter()
            .filter(|&(c, &is_fg)| is_fg && self.state[c] != VoxelState::Unvisited)
            .count();
        covered as f64 / total as f64
    }
}
