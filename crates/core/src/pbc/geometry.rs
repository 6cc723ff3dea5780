//! Per-frame imaging geometry.
//!
//! The imaging path (orthogonal, general triclinic or truncated octahedron)
//! is chosen once per topology from the declared box type and the
//! [`TriclinicMode`]. The matrices themselves are rebuilt from each frame's
//! box since the box may fluctuate under constant pressure.

use std::fmt;
use std::str::FromStr;

use super::cell::{BoxType, PeriodicBox, UnitCell};

/// How non-orthogonal imaging is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriclinicMode {
    /// Orthogonal boxes use the fast path; truncated octahedra are imaged
    /// into the familiar truncated octahedron shape.
    #[default]
    Auto,
    /// Always image into the familiar truncated octahedron shape.
    Familiar,
    /// Always use the general cell-matrix path.
    Force,
}

impl FromStr for TriclinicMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(TriclinicMode::Auto),
            "familiar" => Ok(TriclinicMode::Familiar),
            "triclinic" | "force" => Ok(TriclinicMode::Force),
            other => Err(format!(
                "unknown triclinic mode '{}' (expected auto, familiar or triclinic)",
                other
            )),
        }
    }
}

impl fmt::Display for TriclinicMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TriclinicMode::Auto => "auto",
            TriclinicMode::Familiar => "familiar",
            TriclinicMode::Force => "triclinic",
        };
        f.write_str(name)
    }
}

/// Which imaging routine a topology uses for all of its frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagingPath {
    Orthogonal,
    Triclinic,
    TruncatedOctahedron,
}

impl ImagingPath {
    /// Pick the imaging path for a declared box type. `None` when the
    /// topology carries no box.
    pub fn select(declared: BoxType, mode: TriclinicMode) -> Option<Self> {
        let path = match (declared, mode) {
            (BoxType::None, _) => return None,
            (_, TriclinicMode::Force) => ImagingPath::Triclinic,
            (_, TriclinicMode::Familiar) => ImagingPath::TruncatedOctahedron,
            (BoxType::Orthogonal, TriclinicMode::Auto) => ImagingPath::Orthogonal,
            (BoxType::TruncatedOctahedron, TriclinicMode::Auto) => {
                ImagingPath::TruncatedOctahedron
            }
            (BoxType::Triclinic, TriclinicMode::Auto) => ImagingPath::Triclinic,
        };
        Some(path)
    }
}

/// Geometry of the current frame's cell, as needed by the imaging stages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoxGeometry {
    Orthogonal { lengths: [f64; 3] },
    Triclinic { cell: UnitCell },
    TruncatedOctahedron { cell: UnitCell, lengths: [f64; 3] },
}

impl BoxGeometry {
    /// Build the geometry for one frame. `None` when the frame's box is
    /// degenerate (zero lengths or a singular cell).
    pub fn resolve(path: ImagingPath, pbox: &PeriodicBox) -> Option<Self> {
        if pbox.is_degenerate() {
            return None;
        }
        let geometry = match path {
            ImagingPath::Orthogonal => BoxGeometry::Orthogonal {
                lengths: pbox.lengths,
            },
            ImagingPath::Triclinic => BoxGeometry::Triclinic {
                cell: pbox.unit_cell()?,
            },
            ImagingPath::TruncatedOctahedron => BoxGeometry::TruncatedOctahedron {
                cell: pbox.unit_cell()?,
                lengths: pbox.lengths,
            },
        };
        Some(geometry)
    }

    /// Point the anchor is moved to.
    ///
    /// The coordinate origin, or the box center: half the box lengths for
    /// orthogonal and truncated octahedron imaging, fractional (0.5, 0.5, 0.5)
    /// for general triclinic imaging.
    pub fn target(&self, origin: bool) -> [f64; 3] {
        if origin {
            return [0.0; 3];
        }
        match self {
            BoxGeometry::Orthogonal { lengths }
            | BoxGeometry::TruncatedOctahedron { lengths, .. } => {
                [lengths[0] / 2.0, lengths[1] / 2.0, lengths[2] / 2.0]
            }
            BoxGeometry::Triclinic { cell } => cell.to_real(&[0.5, 0.5, 0.5]),
        }
    }

    /// Express a real-space displacement in box units.
    pub fn fractional_offset(&self, delta: &[f64; 3]) -> [f64; 3] {
        match self {
            BoxGeometry::Orthogonal { lengths } => [
                delta[0] / lengths[0],
                delta[1] / lengths[1],
                delta[2] / lengths[2],
            ],
            BoxGeometry::Triclinic { cell } | BoxGeometry::TruncatedOctahedron { cell, .. } => {
                cell.to_fractional(delta)
            }
        }
    }

    /// Real-space translation of `(ix, iy, iz)` whole cells.
    pub fn lattice_translation(&self, ix: i32, iy: i32, iz: i32) -> [f64; 3] {
        match self {
            BoxGeometry::Orthogonal { lengths } => [
                lengths[0] * ix as f64,
                lengths[1] * iy as f64,
                lengths[2] * iz as f64,
            ],
            BoxGeometry::Triclinic { cell } | BoxGeometry::TruncatedOctahedron { cell, .. } => {
                cell.lattice_vector(ix, iy, iz)
            }
        }
    }
}
