//! Fourth-order Runge–Kutta step against the negated time-map gradient.

use crate::gradient::GradientField;
use crate::volume::in_bounds_real;

/// Unit-normalize a gradient sample, dividing by `max(norm, 1)` — not `norm` —
/// so weak gradients produce sub-unit steps instead of unit-length ones. That
/// shrinkage is an intentional stall signal read downstream by the tracer.
fn normalized(v: [f64; 3], step: f64) -> [f64; 3] {
    let norm = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    let scale = step / norm.max(1.0);
    [v[0] * scale, v[1] * scale, v[2] * scale]
}

fn sub(p: [f64; 3], k: [f64; 3], scale: f64) -> [f64; 3] {
    [p[0] - scale * k[0], p[1] - scale * k[1], p[2] - scale * k[2]]
}

/// Take one RK4 step of length `step` from `src` against the negated
/// gradient of the time map, falling back to `src` unchanged whenever an
/// intermediate RK4 stage would land out of bounds.
///
/// Returns `Err` only when an in-bounds sample comes back non-finite
/// (`GradientError::GradientUnavailable`); out-of-bounds intermediate points
/// are a guarded fallback, not an error, per the stepping contract.
pub fn rk4_step(
    field: &GradientField,
    src: [f64; 3],
    step: f64,
) -> Result<[f64; 3], crate::gradient::GradientError> {
    let shape = field.shape();

    let g1 = field.sample(src)?;
    let k1 = normalized(g1, step);

    let p2 = sub(src, k1, 0.5);
    if !in_bounds_real(p2, shape) {
        return Ok(src);
    }
    let g2 = field.sample(p2)?;
    let k2 = normalized(g2, step);

    let p3 = sub(src, k2, 0.5);
    if !in_bounds_real(p3, shape) {
        return Ok(src);
    }
    let g3 = field.sample(p3)?;
    let k3 = normalized(g3, step);

    let p4 = sub(src, k3, 1.0);
    if !in_bounds_real(p4, shape) {
        return Ok(src);
    }
    let g4 = field.sample(p4)?;
    let k4 = normalized(g4, step);

    let mut out = [0.0; 3];
    for i in 0..3 {
        out[i] = src[i] - (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]) / 6.0;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Volume;

    fn ramp(shape: (usize, usize, usize)) -> Volume<f64> {
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
    fn step_descends_gradient_on_linear_ramp() {
        let t = ramp((20, 20, 20));
        let g = crate::gradient::GradientField::from_time_map(&t);
        let next = rk4_step(&g, [10.0, 10.0, 10.0], 1.0).unwrap();
        assert!((next[0] - 9.0).abs() < 1e-9);
        assert!((next[1] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn step_falls_back_to_source_near_boundary() {
        let t = ramp((5, 5, 5));
        let g = crate::gradient::GradientField::from_time_map(&t);
        // Stepping from x=0 would push an RK4 substage below zero.
        let next = rk4_step(&g, [0.0, 2.0, 2.0], 1.0).unwrap();
        assert_eq!(next, [0.0, 2.0, 2.0]);
    }
}
