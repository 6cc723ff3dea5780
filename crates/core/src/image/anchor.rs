//! Anchor translation.

use crate::classify::AnchorRegion;
use crate::frame::Frame;
use crate::pbc::BoxGeometry;
use crate::util::sub;

/// Translate the whole frame so the anchor center lands on the target
/// point (origin or box center) and return that point.
///
/// Must run before any imaging: the later stages measure everything
/// relative to the repositioned anchor.
pub fn center_anchor(
    frame: &mut Frame,
    anchor: &AnchorRegion,
    geometry: &BoxGeometry,
    origin: bool,
    use_mass: bool,
) -> [f64; 3] {
    let center = frame.center_of_atoms(anchor.atoms.iter().copied(), use_mass);
    let target = geometry.target(origin);
    frame.translate(&sub(&target, &center));
    target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pbc::{ImagingPath, PeriodicBox};

    #[test]
    fn test_anchor_moves_to_box_center() {
        let pbox = PeriodicBox::orthogonal([30.0; 3]);
        let mut frame = Frame::with_unit_masses(
            vec![[39.0, 15.0, 15.0], [41.0, 15.0, 15.0], [31.0, 2.0, 2.0]],
            pbox,
        );
        let anchor = AnchorRegion {
            atoms: vec![0, 1],
            molecules: vec![0],
        };
        let geometry = BoxGeometry::resolve(ImagingPath::Orthogonal, &pbox).expect("valid box");

        let target = center_anchor(&mut frame, &anchor, &geometry, false, false);

        assert_eq!(target, [15.0, 15.0, 15.0]);
        assert_eq!(frame.coords()[0], [14.0, 15.0, 15.0]);
        assert_eq!(frame.coords()[1], [16.0, 15.0, 15.0]);
        assert_eq!(frame.coords()[2], [6.0, 2.0, 2.0]);
    }

    #[test]
    fn test_anchor_moves_to_origin_by_mass() {
        let pbox = PeriodicBox::orthogonal([30.0; 3]);
        let mut frame = Frame::new(
            vec![[10.0, 0.0, 0.0], [14.0, 0.0, 0.0]],
            vec![3.0, 1.0],
            pbox,
        )
        .expect("matching lengths");
        let anchor = AnchorRegion {
            atoms: vec![0, 1],
            molecules: vec![0],
        };
        let geometry = BoxGeometry::resolve(ImagingPath::Orthogonal, &pbox).expect("valid box");

        center_anchor(&mut frame, &anchor, &geometry, true, true);

        let com = frame.center_of_atoms(0..2, true);
        assert!(com.iter().all(|c| c.abs() < 1e-12));
        assert_eq!(frame.coords()[0], [-1.0, 0.0, 0.0]);
    }
}
