//! Nearest-image placement of fixed molecules.
//!
//! Fixed molecules are placed in topology order. Each one is moved to the
//! periodic image closest to a running reference point, which starts at
//! the anchor target and then follows the center of the last placed
//! molecule. Chaining keeps an extended assembly (several fragments of a
//! complex) contiguous instead of imaging every fragment independently.
//!
//! The lattice search only looks from zero to one cell past the rounded
//! offset on each axis. For strongly skewed cells the true nearest image
//! can lie outside that range.

use crate::frame::Frame;
use crate::pbc::BoxGeometry;
use crate::topology::AtomRange;
use crate::util::{add, distance_squared, is_zero, sub};

/// Winning candidate of the lattice search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatticeImage {
    /// Whole cells moved along each cell vector.
    pub cells: [i32; 3],
    /// Real-space translation for `cells`.
    pub translation: [f64; 3],
    /// Squared distance from the translated center to the reference.
    pub distance_squared: f64,
}

/// Offsets beyond this many cells are searched in a short window around
/// the rounded offset instead of scanning from zero.
pub const MAX_SCAN_CELLS: f64 = 64.0;

/// Offsets this large cannot be expressed as `i32` cell counts.
const UNREPRESENTABLE_CELLS: f64 = (i32::MAX / 2) as f64;

/// Candidate cell shifts along one axis for a fractional offset.
///
/// Runs from zero in the direction of the offset up to, but excluding, one
/// cell past the offset rounded away from zero: `+2.3` gives `0, 1, 2, 3`
/// and `-1.1` gives `0, -1, -2`.
///
/// Past [`MAX_SCAN_CELLS`] only the rounded offset and its two neighbours
/// are returned, in the direction of the offset. Non-finite offsets and
/// offsets too large for an `i32` give `[0]`.
pub fn axis_candidates(offset: f64) -> Vec<i32> {
    if !offset.is_finite() || offset.abs() >= UNREPRESENTABLE_CELLS {
        return vec![0];
    }
    let dir = if offset < 0.0 { -1 } else { 1 };
    if offset.abs() > MAX_SCAN_CELLS {
        let near = offset.round() as i32;
        return vec![near - dir, near, near + dir];
    }
    let bound = if offset < 0.0 {
        offset.floor() as i32 - 1
    } else {
        offset.ceil() as i32 + 1
    };
    (0..bound.abs()).map(|k| k * dir).collect()
}

/// Find the translation of `center` that brings it closest to `reference`.
///
/// Candidates are enumerated with z outermost and x innermost; the first
/// strict minimum wins. Within [`MAX_SCAN_CELLS`] the zero translation is
/// a candidate, so the result is never farther from `reference` than
/// `center` itself.
pub fn nearest_image(reference: &[f64; 3], center: &[f64; 3], geometry: &BoxGeometry) -> LatticeImage {
    let offset = geometry.fractional_offset(&sub(reference, center));
    let xs = axis_candidates(offset[0]);
    let ys = axis_candidates(offset[1]);
    let zs = axis_candidates(offset[2]);

    let mut best = LatticeImage {
        cells: [0; 3],
        translation: [0.0; 3],
        distance_squared: f64::INFINITY,
    };
    for &iz in &zs {
        for &iy in &ys {
            for &ix in &xs {
                let translation = geometry.lattice_translation(ix, iy, iz);
                let d2 = distance_squared(reference, &add(center, &translation));
                if d2 < best.distance_squared {
                    best = LatticeImage {
                        cells: [ix, iy, iz],
                        translation,
                        distance_squared: d2,
                    };
                }
            }
        }
    }
    best
}

/// Place each fixed molecule next to the running reference point.
///
/// Returns the final reference point (the center of the last placed
/// molecule, or `start` when there are none).
pub fn place_fixed(
    frame: &mut Frame,
    fixed: &[AtomRange],
    geometry: &BoxGeometry,
    start: [f64; 3],
    use_mass: bool,
) -> [f64; 3] {
    fixed.iter().fold(start, |reference, &range| {
        let center = frame.center(range, use_mass);
        let image = nearest_image(&reference, &center, geometry);
        log::trace!(
            "fixed atoms {}-{} moved {:?} cells, {:.2} A from reference",
            range.first + 1,
            range.last,
            image.cells,
            image.distance_squared.sqrt()
        );
        if !is_zero(&image.translation) {
            frame.translate_range(&image.translation, range);
        }
        add(&center, &image.translation)
    })
}
