//! Sweeps a finished branch's tube out of the working time map so the next
//! episode picks a different seed.

use crate::config::Variant;
use crate::volume::{BinaryMask, Coord, Volume};
use crate::working_time::WorkingTime;

/// Reusable scratch bitmap for the swept tube, allocated once per trace and
/// cleared after each episode rather than reallocated.
pub struct Eraser {
    bb: Volume<bool>,
}

impl Eraser {
    /// Allocate the scratch bitmap at `shape`, once per trace.
    pub fn new(shape: (usize, usize, usize)) -> Self {
        Self { bb: Volume::filled(shape, false) }
    }

    /// Sweep `branch`'s tube (each point's cube of half-side
    /// `ceil(radius * erase_ratio)`, clipped to the volume) into the
    /// working time map.
    ///
    /// Rivulet-2 restricts erasure to the time-value band between the
    /// branch's endpoints when the branch is long enough and that band is
    /// well-formed (`t_end < t_start`); Rivulet-1 always erases the full
    /// tube. Voxels are marked `Masked` if `low_confidence` (the branch's own
    /// stop reason was `LowConfidence`, Rivulet-2's online-confidence break),
    /// otherwise `Covered` — a branch rejected for any other reason (e.g. a
    /// failing `cf[-1] < 0.5` commit gate) still erases as `Covered`, since
    /// only the online-confidence break is a permanent mask in the source.
    pub fn erase(
        &mut self,
        working: &mut WorkingTime,
        branch: &[[f64; 3]],
        radii: &[f64],
        variant: Variant,
        erase_ratio_cfg: f64,
        low_confidence: bool,
    ) {
        let shape = self.bb.shape();
        let erase_ratio = match variant {
            Variant::Rivulet2 => erase_ratio_cfg,
            Variant::Rivulet1 => 0.8,
        };

        let mut touched: Vec<Coord> = Vec::new();
        for (&p, &r) in branch.iter().zip(radii.iter()) {
            let half = (r * erase_ratio).ceil() as i64;
            let cx = p[0].floor() as i64;
            let cy = p[1].floor() as i64;
            let cz = p[2].floor() as i64;
            let x0 = (cx - half).max(0) as usize;
            let x1 = ((cx + half + 1).min(shape.0 as i64)).max(0) as usize;
            let y0 = (cy - half).max(0) as usize;
            let y1 = ((cy + half + 1).min(shape.1 as i64)).max(0) as usize;
            let z0 = (cz - half).max(0) as usize;
            let z1 = ((cz + half + 1).min(shape.2 as i64)).max(0) as usize;
            for x in x0..x1 {
                for y in y0..y1 {
                    for z in z0..z1 {
                        let c = (x, y, z);
                        if !self.bb[c] {
                            self.bb[c] = true;
                            touched.push(c);
                        }
                    }
                }
            }
        }

        let restrict_band = variant == Variant::Rivulet2 && branch.len() > 6;
        let band = if restrict_band {
            let start = floor_or_zero(branch[0]);
            let end = floor_or_zero(branch[branch.len() - 1]);
            let t_start = working.effective_time(start);
            let t_end = working.effective_time(end);
            if t_end < t_start {
                Some((t_end, t_start))
            } else {
                None
            }
        } else {
            None
        };

        for &c in &touched {
            let in_band = match band {
                Some((lo, hi)) => {
                    let t = working.effective_time(c);
                    t >= lo && t <= hi
                }
                None => true,
            };
            if in_band {
                working.mark(c, !low_confidence);
            }
            self.bb[c] = false;
        }
    }
}

fn floor_or_zero(p: [f64; 3]) -> Coord {
    (p[0].floor().max(0.0) as usize, p[1].floor().max(0.0) as usize, p[2].floor().max(0.0) as usize)
}
