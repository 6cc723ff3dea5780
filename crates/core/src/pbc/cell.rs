//! Simulation box parameters and the real/fractional transform.
//!
//! Boxes are described the AMBER way: three lengths (a, b, c) in Angstrom
//! and three angles (alpha, beta, gamma) in degrees. The cell matrix has
//! the cell vectors as columns, with `a` along x and `b` in the xy-plane,
//! so `real = M * frac` and `frac = M^-1 * real`.

use nalgebra::{Matrix3, Vector3};

/// Truncated octahedron cell angle, acos(-1/3) in degrees.
pub const TRUNCATED_OCTAHEDRON_ANGLE: f64 = 109.471_220_634_490_7;

/// Tolerance (degrees) used when matching box angles.
const ANGLE_TOLERANCE: f64 = 1e-3;

/// Shape of a periodic box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoxType {
    /// No periodic box information.
    #[default]
    None,
    /// All angles 90 degrees.
    Orthogonal,
    /// Any other valid cell.
    Triclinic,
    /// All angles ~109.47 degrees.
    TruncatedOctahedron,
}

/// Box lengths and angles for a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicBox {
    /// Cell lengths a, b, c (Angstrom)
    pub lengths: [f64; 3],
    /// Cell angles alpha, beta, gamma (degrees)
    pub angles: [f64; 3],
}

impl Default for PeriodicBox {
    fn default() -> Self {
        Self {
            lengths: [0.0; 3],
            angles: [90.0; 3],
        }
    }
}

impl PeriodicBox {
    pub fn new(lengths: [f64; 3], angles: [f64; 3]) -> Self {
        Self { lengths, angles }
    }

    /// Rectangular box with the given edge lengths.
    pub fn orthogonal(lengths: [f64; 3]) -> Self {
        Self {
            lengths,
            angles: [90.0; 3],
        }
    }

    /// Truncated octahedron with edge length `a` for all three cell vectors.
    pub fn truncated_octahedron(a: f64) -> Self {
        Self {
            lengths: [a; 3],
            angles: [TRUNCATED_OCTAHEDRON_ANGLE; 3],
        }
    }

    /// Build from `[a, b, c, alpha, beta, gamma]`.
    pub fn from_params(params: [f64; 6]) -> Self {
        Self {
            lengths: [params[0], params[1], params[2]],
            angles: [params[3], params[4], params[5]],
        }
    }

    /// Classify the box shape from its angles.
    pub fn box_type(&self) -> BoxType {
        if self.lengths.iter().all(|&l| l == 0.0) {
            return BoxType::None;
        }
        let all_near = |target: f64| {
            self.angles
                .iter()
                .all(|&angle| (angle - target).abs() < ANGLE_TOLERANCE)
        };
        if all_near(90.0) {
            BoxType::Orthogonal
        } else if all_near(TRUNCATED_OCTAHEDRON_ANGLE) {
            BoxType::TruncatedOctahedron
        } else {
            BoxType::Triclinic
        }
    }

    /// Half of each box length.
    pub fn center(&self) -> [f64; 3] {
        [
            self.lengths[0] / 2.0,
            self.lengths[1] / 2.0,
            self.lengths[2] / 2.0,
        ]
    }

    /// A box that cannot be used for imaging: a zero, negative or
    /// non-finite length.
    pub fn is_degenerate(&self) -> bool {
        self.lengths.iter().any(|&l| !(l.is_finite() && l > 0.0))
    }

    /// Cell matrix and its inverse, or `None` when the box is degenerate.
    pub fn unit_cell(&self) -> Option<UnitCell> {
        if self.is_degenerate() {
            return None;
        }
        UnitCell::from_matrix(cell_matrix(&self.lengths, &self.angles))
    }
}

/// Cosine and sine of an angle in degrees; right angles are exact.
fn cos_sin_deg(angle: f64) -> (f64, f64) {
    if angle == 90.0 {
        (0.0, 1.0)
    } else {
        let rad = angle.to_radians();
        (rad.cos(), rad.sin())
    }
}

/// Cell vectors as matrix columns from lengths and angles.
fn cell_matrix(lengths: &[f64; 3], angles: &[f64; 3]) -> Matrix3<f64> {
    let [a, b, c] = *lengths;
    let (cos_alpha, _) = cos_sin_deg(angles[0]);
    let (cos_beta, _) = cos_sin_deg(angles[1]);
    let (cos_gamma, sin_gamma) = cos_sin_deg(angles[2]);

    let bx = b * cos_gamma;
    let by = b * sin_gamma;
    let cx = c * cos_beta;
    let cy = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
    let cz = (c * c - cx * cx - cy * cy).max(0.0).sqrt();

    Matrix3::from_columns(&[
        Vector3::new(a, 0.0, 0.0),
        Vector3::new(bx, by, 0.0),
        Vector3::new(cx, cy, cz),
    ])
}

/// Cell matrix together with its inverse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitCell {
    matrix: Matrix3<f64>,
    inverse: Matrix3<f64>,
}

impl UnitCell {
    /// Wrap a cell matrix (cell vectors as columns). `None` if singular.
    pub fn from_matrix(matrix: Matrix3<f64>) -> Option<Self> {
        let inverse = matrix.try_inverse()?;
        if inverse.iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some(Self { matrix, inverse })
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn inverse(&self) -> &Matrix3<f64> {
        &self.inverse
    }

    /// Real-space position to fractional coordinates.
    #[inline]
    pub fn to_fractional(&self, r: &[f64; 3]) -> [f64; 3] {
        let f = self.inverse * Vector3::new(r[0], r[1], r[2]);
        [f[0], f[1], f[2]]
    }

    /// Fractional coordinates to a real-space position.
    #[inline]
    pub fn to_real(&self, f: &[f64; 3]) -> [f64; 3] {
        let r = self.matrix * Vector3::new(f[0], f[1], f[2]);
        [r[0], r[1], r[2]]
    }

    /// Real-space translation for an integer number of cells along each vector.
    #[inline]
    pub fn lattice_vector(&self, ix: i32, iy: i32, iz: i32) -> [f64; 3] {
        self.to_real(&[ix as f64, iy as f64, iz as f64])
    }
}
