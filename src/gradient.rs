//! Spatial gradient of the time-crossing map, and trilinear interpolation of it.
//!
//! The gradient is computed once per trace (central differences on interior
//! voxels, one-sided differences at the boundary planes — the same scheme as
//! `np.gradient`) and cached as three dense [`Volume`]s. Sampling at
//! real-valued coordinates goes through trilinear interpolation; sampling
//! outside `[0, shape - 1]` on any axis is a hard error rather than a clamp,
//! since a point straying there means the step integrator should fall back
//! to holding position, not silently wrap the data.

use crate::volume::Volume;
use thiserror::Error;

/// Errors raised while sampling the gradient field.
#[derive(Debug, Error, PartialEq)]
pub enum GradientError {
    /// The query point lies outside `[0, shape - 1]` on at least one axis.
    #[error("point {point:?} out of bounds for shape {shape:?}")]
    OutOfBounds { point: [f64; 3], shape: (usize, usize, usize) },
    /// An in-bounds sample produced a non-finite value (NaN or infinite).
    #[error("gradient sample at {0:?} is non-finite")]
    GradientUnavailable([f64; 3]),
}

/// Precomputed gradient of the time-crossing map, with trilinear sampling.
#[derive(Debug, Clone)]
pub struct GradientField {
    shape: (usize, usize, usize),
    gx: Volume<f64>,
    gy: Volume<f64>,
    gz: Volume<f64>,
}

impl GradientField {
    /// Compute the gradient of `time_map` once and cache it.
    pub fn from_time_map(time_map: &Volume<f64>) -> Self {
        let shape = time_map.shape();
        let gx = central_difference(time_map, 0);
        let gy = central_difference(time_map, 1);
        let gz = central_difference(time_map, 2);
        Self { shape, gx, gy, gz }
    }

    /// Shape of the underlying volume.
    #[inline]
    pub fn shape(&self) -> (usize, usize, usize) {
        self.shape
    }

    /// Trilinearly-interpolated gradient vector at real-valued point `p`.
    pub fn sample(&self, p: [f64; 3]) -> Result<[f64; 3], GradientError> {
        if !crate::volume::in_bounds_real(p, self.shape) {
            return Err(GradientError::OutOfBounds { point: p, shape: self.shape });
        }
        let v = [trilinear(&self.gx, p), trilinear(&self.gy, p), trilinear(&self.gz, p)];
        if v.iter().any(|c| !c.is_finite()) {
            return Err(GradientError::GradientUnavailable(p));
        }
        Ok(v)
    }
}

/// Central differences on interior voxels, one-sided differences at the two
/// boundary planes of `axis`, reflecting the convention used by the
/// reference implementation's `distgradient` helper.
fn central_difference(field: &Volume<f64>, axis: usize) -> Volume<f64> {
    let shape = field.shape();
    let mut out = Volume::filled(shape, 0.0_f64);
    let n = match axis {
        0 => shape.0,
        1 => shape.1,
        2 => shape.2,
        _ => unreachable!(),
    };
    for x in 0..shape.0 {
        for y in 0..shape.1 {
            for z in 0..shape.2 {
                let i = match axis {
                    0 => x,
                    1 => y,
                    2 => z,
                    _ => unreachable!(),
                };
                let (lo, hi, denom) = if n == 1 {
                    (i, i, 1.0)
                } else if i == 0 {
                    (i, i + 1, 1.0)
                } else if i == n - 1 {
                    (i - 1, i, 1.0)
                } else {
                    (i - 1, i + 1, 2.0)
                };
                let plus = shift(axis, (x, y, z), hi);
                let minus = shift(axis, (x, y, z), lo);
                let g = if n == 1 { 0.0 } else { (field[plus] - field[minus]) / denom };
                out[(x, y, z)] = g;
            }
        }
    }
    out
}

fn shift(axis: usize, c: (usize, usize, usize), value: usize) -> (usize, usize, usize) {
    match axis {
        0 => (value, c.1, c.2),
        1 => (c.0, value, c.2),
        2 => (c.0, c.1, value),
        _ => unreachable!(),
    }
}

/// Trilinear interpolation of `field` at real-valued point `p`, assuming `p`
/// is already known to be in bounds.
fn trilinear(field: &Volume<f64>, p: [f64; 3]) -> f64 {
    let shape = field.shape();
    let x0 = p[0].floor().clamp(0.0, (shape.0 - 1) as f64) as usize;
    let y0 = p[1].floor().clamp(0.0, (shape.1 - 1) as f64) as usize;
    let z0 = p[2].floor().clamp(0.0, (shape.2 - 1) as f64) as usize;
    let x1 = (x0 + 1).min(shape.0 - 1);
    let y1 = (y0 + 1).min(shape.1 - 1);
    let z1 = (z0 + 1).min(shape.2 - 1);

    let tx = p[0] - x0 as f64;
    let ty = p[1] - y0 as f64;
    let tz = p[2] - z0 as f64;

    let c000 = field[(x0, y0, z0)];
    let c100 = field[(x1, y0, z0)];
    let c010 = field[(x0, y1, z0)];
    let c110 = field[(x1, y1, z0)];
    let c001 = field[(x0, y0, z1)];
    let c101 = field[(x1, y0, z1)];
    let c011 = field[(x0, y1, z1)];
    let c111 = field[(x1, y1, z1)];

    let c00 = c000 * (1.0 - tx) + c100 * tx;
    let c10 = c010 * (1.0 - tx) + c110 * tx;
    let c01 = c001 * (1.0 - tx) + c101 * tx;
    let c11 = c011 * (1.0 - tx) + c111 * tx;

    let c0 = c00 * (1.0 - ty) + c10 * ty;
    let c1 = c01 * (1.0 - ty) + c11 * ty;

    c0 * (1.0 - tz) + c1 * tz
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_time_map(shape: (usize, usize, usize)) -> Volume<f64> {
        let mut v = Volume::filled(shape, 0.0_f64);
        for x in 0..shape.0 {
            for y in 0..shape.1 {
                for z in 0..shape.2 {
                    v[(x, y, z)] = x as f64;
                }
            }
        }
        v
    }

    #[test]
    fn gradient_of_linear_ramp_is_constant_unit_x() {
        let t = linear_time_map((5, 5, 5));
        let g = GradientField::from_time_map(&t);
        let v = g.sample([2.3, 1.1, 3.9]).unwrap();
        assert!((v[0] - 1.0).abs() < 1e-9);
        assert!(v[1].abs() < 1e-9);
        assert!(v[2].abs() < 1e-9);
    }

    #[test]
    fn out_of_bounds_sample_errors() {
        let t = linear_time_map((4, 4, 4));
        let g = GradientField::from_time_map(&t);
        let err = g.sample([4.5, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, GradientError::OutOfBounds { .. }));
    }

    #[test]
    fn single_slab_axis_has_zero_gradient() {
        let t = Volume::filled((1, 3, 3), 5.0_f64);
        let g = GradientField::from_time_map(&t);
        let v = g.sample([0.0, 1.0, 1.0]).unwrap();
        assert_eq!(v[0], 0.0);
    }
}
