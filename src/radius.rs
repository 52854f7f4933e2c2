//! Local radius estimation from the binary mask by expanding cube search.

use crate::volume::{BinaryMask, Coord};

/// Estimate the local radius at voxel `c` by growing a centered cube until
/// the foreground fraction inside it drops below `0.6`. Returns the first
/// radius at which that happens, or the largest radius that could still be
/// fully indexed if the cube would otherwise run off the edge of the volume.
/// Never returns less than `1`.
pub fn estimate_radius(mask: &BinaryMask, c: Coord) -> u32 {
    let shape = mask.shape();
    let (cx, cy, cz) = (c.0 as i64, c.1 as i64, c.2 as i64);
    let (sx, sy, sz) = (shape.0 as i64, shape.1 as i64, shape.2 as i64);

    let mut r: i64 = 0;
    let mut last_valid = 1;
    loop {
        r += 1;
        let x0 = (cx - r).max(0);
        let x1 = (cx + r + 1).min(sx);
        let y0 = (cy - r).max(0);
        let y1 = (cy + r + 1).min(sy);
        let z0 = (cz - r).max(0);
        let z1 = (cz + r + 1).min(sz);

        if x0 >= x1 || y0 >= y1 || z0 >= z1 {
            // Cube fell entirely off the volume: keep the last radius examined.
            break;
        }

        let mut sum = 0u64;
        for x in x0..x1 {
            for y in y0..y1 {
                for z in z0..z1 {
                    if mask[(x as usize, y as usize, z as usize)] {
                        sum += 1;
                    }
                }
            }
        }
        let side = (2 * r + 1) as u64;
        let volume = side * side * side;
        last_valid = r.max(1) as u32;
        if (sum as f64) / (volume as f64) < 0.6 {
            return last_valid;
        }
    }
    last_valid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_block_grows_until_density_drops() {
        let mut mask = BinaryMask::filled((11, 11, 11), false);
        for x in 3..8 {
            for y in 3..8 {
                for z in 3..8 {
                    mask[(x, y, z)] = true;
                }
            }
        }
        let r = estimate_radius(&mask, (5, 5, 5));
        assert!(r >= 1);
    }

    #[test]
    fn isolated_voxel_returns_minimum_radius() {
        let mut mask = BinaryMask::filled((5, 5, 5), false);
        mask[(2, 2, 2)] = true;
        assert_eq!(estimate_radius(&mask, (2, 2, 2)), 1);
    }

    #[test]
    fn radius_near_edge_does_not_panic() {
        let mask = BinaryMask::filled((3, 3, 3), true);
        let r = estimate_radius(&mask, (0, 0, 0));
        assert!(r >= 1);
    }
}
