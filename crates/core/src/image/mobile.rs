//! Minimum-image wrapping of mobile molecules.
//!
//! Each molecule gets one translation, computed from its reference point
//! and applied to all of its atoms, so molecules are never split across
//! the cell boundary.

use super::{CenteringPolicy, ImagePosition};
use crate::frame::Frame;
use crate::pbc::{BoxGeometry, UnitCell};
use crate::topology::AtomRange;
use crate::util::{add, distance_squared, is_zero};

/// Wrap every molecule in `molecules` into the primary cell around the
/// target point.
pub fn image_mobile(
    frame: &mut Frame,
    molecules: &[AtomRange],
    geometry: &BoxGeometry,
    policy: &CenteringPolicy,
) {
    let target = geometry.target(policy.origin);
    for &range in molecules {
        if range.is_empty() {
            continue;
        }
        let position = match policy.position {
            ImagePosition::Center => frame.center(range, policy.use_mass),
            ImagePosition::FirstAtom => frame.coords()[range.first],
        };
        let trans = minimum_image_translation(&position, geometry, policy.origin, &target);
        if !is_zero(&trans) {
            frame.translate_range(&trans, range);
        }
    }
}

/// Translation that brings `position` into the primary cell.
///
/// `target` is only consulted by the truncated octahedron refinement,
/// which keeps the image closest to it.
pub fn minimum_image_translation(
    position: &[f64; 3],
    geometry: &BoxGeometry,
    origin: bool,
    target: &[f64; 3],
) -> [f64; 3] {
    match geometry {
        BoxGeometry::Orthogonal { lengths } => orthogonal_translation(position, lengths, origin),
        BoxGeometry::Triclinic { cell } => triclinic_translation(position, cell, origin),
        BoxGeometry::TruncatedOctahedron { cell, lengths } => {
            let trans = triclinic_translation(position, cell, origin);
            let wrapped = add(position, &trans);
            let refine = truncated_octahedron_shift(&wrapped, target, cell, lengths, origin);
            add(&trans, &refine)
        }
    }
}

/// Per-axis wrap into `[-L/2, L/2)` (origin) or `[0, L)` (box center).
pub fn orthogonal_translation(position: &[f64; 3], lengths: &[f64; 3], origin: bool) -> [f64; 3] {
    let mut trans = [0.0f64; 3];
    for k in 0..3 {
        let l = lengths[k];
        let low = if origin { -l / 2.0 } else { 0.0 };
        let x = position[k];
        let mut shift = -((x - low) / l).floor() * l;
        // Rounding can land exactly on the upper bound.
        if x + shift >= low + l {
            shift -= l;
            // Within rounding of both bounds: neither lattice shift lands
            // inside, so snap onto the lower bound.
            if x + shift < low {
                shift = low - x;
            }
        }
        trans[k] = shift;
    }
    trans
}

/// Wrap fractional coordinates into `[0, 1)` (box center) or
/// `[-0.5, 0.5)` (origin) and return the real-space translation.
pub fn triclinic_translation(position: &[f64; 3], cell: &UnitCell, origin: bool) -> [f64; 3] {
    let mut frac = cell.to_fractional(position);
    if origin {
        frac.iter_mut().for_each(|f| *f += 0.5);
    }
    let cells = [-frac[0].floor(), -frac[1].floor(), -frac[2].floor()];
    cell.to_real(&cells)
}

/// Extra lattice shift that puts an already wrapped position into the
/// familiar truncated octahedron shape.
///
/// Truncated octahedron minimum imaging is not separable per axis, so the
/// 27 neighbouring images are compared against the target point and the
/// closest one wins; the first strict minimum in x, y, z order is kept.
pub fn truncated_octahedron_shift(
    wrapped: &[f64; 3],
    target: &[f64; 3],
    cell: &UnitCell,
    lengths: &[f64; 3],
    origin: bool,
) -> [f64; 3] {
    let reduce = |r: &[f64; 3]| {
        let mut f = cell.to_fractional(r);
        for v in f.iter_mut() {
            if origin {
                *v += 0.5;
            }
            *v -= v.floor();
        }
        cell.to_real(&f)
    };
    let image = reduce(wrapped);
    let center = reduce(target);

    let mut min_d2 =
        100.0 * (lengths[0] * lengths[0] + lengths[1] * lengths[1] + lengths[2] * lengths[2]);
    let mut best = (0, 0, 0);
    for ix in -1..=1 {
        for iy in -1..=1 {
            for iz in -1..=1 {
                let candidate = add(&image, &cell.lattice_vector(ix, iy, iz));
                let d2 = distance_squared(&candidate, &center);
                if d2 < min_d2 {
                    min_d2 = d2;
                    best = (ix, iy, iz);
                }
            }
        }
    }

    if best == (0, 0, 0) {
        [0.0; 3]
    } else {
        cell.lattice_vector(best.0, best.1, best.2)
    }
}
