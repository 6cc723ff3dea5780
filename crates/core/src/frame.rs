//! Coordinate frame with masses and periodic box.

use crate::error::AutoImageError;
use crate::pbc::PeriodicBox;
use crate::topology::{AtomRange, Topology};

/// One frame of coordinates (Angstrom) plus per-atom masses and the box.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    coords: Vec<[f64; 3]>,
    masses: Vec<f64>,
    periodic_box: PeriodicBox,
}

impl Frame {
    /// Build a frame. `masses` must have one entry per coordinate.
    pub fn new(
        coords: Vec<[f64; 3]>,
        masses: Vec<f64>,
        periodic_box: PeriodicBox,
    ) -> Result<Self, AutoImageError> {
        if masses.len() != coords.len() {
            return Err(AutoImageError::AtomCountMismatch {
                expected: coords.len(),
                found: masses.len(),
            });
        }
        Ok(Self {
            coords,
            masses,
            periodic_box,
        })
    }

    /// Frame carrying the topology's per-atom masses.
    pub fn from_topology<T: Topology + ?Sized>(
        coords: Vec<[f64; 3]>,
        topology: &T,
        periodic_box: PeriodicBox,
    ) -> Result<Self, AutoImageError> {
        Self::new(coords, topology.masses().to_vec(), periodic_box)
    }

    /// Frame where every atom has unit mass.
    pub fn with_unit_masses(coords: Vec<[f64; 3]>, periodic_box: PeriodicBox) -> Self {
        let masses = vec![1.0; coords.len()];
        Self {
            coords,
            masses,
            periodic_box,
        }
    }

    pub fn n_atoms(&self) -> usize {
        self.coords.len()
    }

    pub fn coords(&self) -> &[[f64; 3]] {
        &self.coords
    }

    pub fn coords_mut(&mut self) -> &mut [[f64; 3]] {
        &mut self.coords
    }

    pub fn into_coords(self) -> Vec<[f64; 3]> {
        self.coords
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    pub fn periodic_box(&self) -> &PeriodicBox {
        &self.periodic_box
    }

    pub fn set_periodic_box(&mut self, periodic_box: PeriodicBox) {
        self.periodic_box = periodic_box;
    }

    /// Mass-weighted center of an atom range. Falls back to the geometric
    /// center when the range has no mass.
    pub fn center_of_mass(&self, range: AtomRange) -> [f64; 3] {
        self.center_of_atoms(range.indices(), true)
    }

    /// Unweighted center of an atom range.
    pub fn geometric_center(&self, range: AtomRange) -> [f64; 3] {
        self.center_of_atoms(range.indices(), false)
    }

    /// Center of an atom range, mass-weighted or geometric.
    #[inline]
    pub fn center(&self, range: AtomRange, use_mass: bool) -> [f64; 3] {
        self.center_of_atoms(range.indices(), use_mass)
    }

    /// Center of an arbitrary set of atoms, mass-weighted or geometric.
    pub fn center_of_atoms<I>(&self, atoms: I, use_mass: bool) -> [f64; 3]
    where
        I: IntoIterator<Item = usize> + Clone,
    {
        if use_mass {
            let mut sum = [0.0f64; 3];
            let mut total = 0.0f64;
            for idx in atoms.clone() {
                let m = self.masses[idx];
                let p = &self.coords[idx];
                sum[0] += p[0] * m;
                sum[1] += p[1] * m;
                sum[2] += p[2] * m;
                total += m;
            }
            if total > 0.0 {
                return [sum[0] / total, sum[1] / total, sum[2] / total];
            }
        }

        let mut sum = [0.0f64; 3];
        let mut n = 0usize;
        for idx in atoms {
            let p = &self.coords[idx];
            sum[0] += p[0];
            sum[1] += p[1];
            sum[2] += p[2];
            n += 1;
        }
        if n == 0 {
            return [0.0; 3];
        }
        let n = n as f64;
        [sum[0] / n, sum[1] / n, sum[2] / n]
    }

    /// Translate every atom.
    pub fn translate(&mut self, v: &[f64; 3]) {
        for p in self.coords.iter_mut() {
            p[0] += v[0];
            p[1] += v[1];
            p[2] += v[2];
        }
    }

    /// Translate the atoms of one range rigidly.
    pub fn translate_range(&mut self, v: &[f64; 3], range: AtomRange) {
        for p in self.coords[range.first..range.last].iter_mut() {
            p[0] += v[0];
            p[1] += v[1];
            p[2] += v[2];
        }
    }
}
