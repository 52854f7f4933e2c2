//! Forward confidence: the running prefix mean of foreground indicators
//! along a branch, preserved with its original off-by-one quirk.
//!
//! `cf[i] = sum(fg(path[0..i])) / (i + 1)` — note the sum excludes `path[i]`
//! itself. This means `cf[0]` is always `0` (empty prefix) and `cf[len-1]`
//! is `(sum over all but the last point) / len`, not `sum / len`. The
//! `0.5` commit/prune threshold used elsewhere in this crate is tuned
//! against this exact definition, so it is preserved rather than "fixed".

use crate::volume::BinaryMask;

/// Forward confidence vector for `path`, floor-sampling `mask` at each point.
pub fn forward_confidence(path: &[[f64; 3]], mask: &BinaryMask) -> Vec<f64> {
    let fg: Vec<f64> = path.iter().map(|&p| if mask.is_foreground(p) { 1.0 } else { 0.0 }).collect();
    let mut cf = Vec::with_capacity(fg.len());
    let mut running = 0.0;
    for (i, &f) in fg.iter().enumerate() {
        cf.push(running / (i as f64 + 1.0));
        running += f;
    }
    cf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_foreground_path_has_rising_then_near_one_confidence() {
        let mask = BinaryMask::filled((4, 4, 4), true);
        let path = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [3.0, 0.0, 0.0]];
        let cf = forward_confidence(&path, &mask);
        assert_eq!(cf[0], 0.0);
        assert!((cf[3] - 3.0 / 4.0).abs() < 1e-12);
    }

    #[test]
    fn empty_path_yields_empty_confidence() {
        let mask = BinaryMask::filled((2, 2, 2), true);
        assert!(forward_confidence(&[], &mask).is_empty());
    }

    #[test]
    fn all_background_path_is_always_zero() {
        let mask = BinaryMask::filled((3, 3, 3), false);
        let path = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        let cf = forward_confidence(&path, &mask);
        assert!(cf.iter().all(|&c| c == 0.0));
    }
}
