//! Speed-image helper for callers preparing input to an external
//! fast-marching step. Has no dependency on any other tracer type.

use crate::volume::Volume;

/// `F = dt^4`, with any value `<= threshold` floored to `1e-10` so the
/// fast-marching solver never divides by an exact zero speed.
pub fn makespeed(dt: &Volume<f64>, threshold: f64) -> Volume<f64> {
    let shape = dt.shape();
    let raised: Vec<f64> = dt.as_slice().iter().map(|&v| v.powi(4)).collect();
    let floored: Vec<f64> = raised.into_iter().map(|v| if v <= threshold { 1e-10 } else { v }).collect();
    Volume::from_vec(shape, floored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raises_distance_to_the_fourth_power() {
        let mut dt = Volume::filled((2, 1, 1), 0.0_f64);
        dt[(1, 0, 0)] = 2.0;
        let f = makespeed(&dt, 0.0);
        assert_eq!(f[(1, 0, 0)], 16.0);
    }

    #[test]
    fn values_at_or_below_threshold_are_floored() {
        let dt = Volume::filled((3, 1, 1), 0.0_f64);
        let f = makespeed(&dt, 0.0);
        assert!(f.as_slice().iter().all(|&v| v == 1e-10));
    }

    #[test]
    fn values_above_threshold_are_untouched() {
        let mut dt = Volume::filled((2, 1, 1), 0.0_f64);
        dt[(0, 0, 0)] = 1.5;
        let f = makespeed(&dt, 1.0);
        assert_eq!(f[(0, 0, 0)], 1.5_f64.powi(4));
        assert_eq!(f[(1, 0, 0)], 1e-10);
    }
}
