//! Molecule-level view of a topology.
//!
//! The imaging stages only need molecule boundaries, a solvent flag per
//! molecule, per-atom masses and the declared box type. [`Topology`] is
//! that view; [`MolecularTopology`] is the plain in-memory implementation
//! and [`crate::amber::prmtop::AmberTopology`] provides one from a prmtop.

use std::ops::Range;

use crate::error::TopologyError;
use crate::pbc::BoxType;

/// Half-open range of atom indices `[first, last)` for one molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtomRange {
    pub first: usize,
    pub last: usize,
}

impl AtomRange {
    pub fn new(first: usize, last: usize) -> Self {
        debug_assert!(first <= last);
        Self { first, last }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.last - self.first
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.first == self.last
    }

    #[inline]
    pub fn contains(&self, atom: usize) -> bool {
        atom >= self.first && atom < self.last
    }

    #[inline]
    pub fn indices(&self) -> Range<usize> {
        self.first..self.last
    }
}

/// A molecule: its atoms and whether it is solvent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Molecule {
    pub atoms: AtomRange,
    pub is_solvent: bool,
}

impl Molecule {
    pub fn new(atoms: AtomRange, is_solvent: bool) -> Self {
        Self { atoms, is_solvent }
    }

    pub fn n_atoms(&self) -> usize {
        self.atoms.len()
    }
}

/// What the imaging core needs to know about a topology.
pub trait Topology {
    /// Total number of atoms.
    fn n_atoms(&self) -> usize;

    /// Molecules in topology order, covering atoms contiguously.
    fn molecules(&self) -> &[Molecule];

    /// Box type declared by the topology, [`BoxType::None`] when absent.
    fn box_type(&self) -> BoxType;

    /// Per-atom masses.
    fn masses(&self) -> &[f64];

    /// Index of the molecule containing `atom`.
    fn molecule_of_atom(&self, atom: usize) -> Option<usize> {
        let molecules = self.molecules();
        let idx = molecules.partition_point(|m| m.atoms.last <= atom);
        (idx < molecules.len() && molecules[idx].atoms.contains(atom)).then_some(idx)
    }
}

/// In-memory topology built from molecule sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct MolecularTopology {
    molecules: Vec<Molecule>,
    masses: Vec<f64>,
    box_type: BoxType,
}

impl MolecularTopology {
    /// Build from explicit molecules. Molecules must be in order, non-empty
    /// and cover `0..masses.len()` without gaps.
    pub fn new(
        molecules: Vec<Molecule>,
        masses: Vec<f64>,
        box_type: BoxType,
    ) -> Result<Self, TopologyError> {
        validate_molecules(&molecules, masses.len())?;
        Ok(Self {
            molecules,
            masses,
            box_type,
        })
    }

    /// Build from consecutive molecule sizes and per-molecule solvent flags.
    ///
    /// # Arguments
    /// * `sizes` - Number of atoms in each molecule, in topology order
    /// * `solvent` - Solvent flag per molecule (same length as `sizes`)
    /// * `masses` - Per-atom masses; the atom count is `masses.len()`
    /// * `box_type` - Declared box type
    pub fn from_molecule_sizes(
        sizes: &[usize],
        solvent: &[bool],
        masses: Vec<f64>,
        box_type: BoxType,
    ) -> Result<Self, TopologyError> {
        if sizes.len() != solvent.len() {
            return Err(TopologyError::Invalid(format!(
                "{} molecule sizes but {} solvent flags",
                sizes.len(),
                solvent.len()
            )));
        }
        let mut molecules = Vec::with_capacity(sizes.len());
        let mut first = 0usize;
        for (&size, &is_solvent) in sizes.iter().zip(solvent) {
            molecules.push(Molecule::new(AtomRange::new(first, first + size), is_solvent));
            first += size;
        }
        Self::new(molecules, masses, box_type)
    }

    /// Same topology with a different declared box type.
    pub fn with_box_type(mut self, box_type: BoxType) -> Self {
        self.box_type = box_type;
        self
    }
}

impl Topology for MolecularTopology {
    fn n_atoms(&self) -> usize {
        self.masses.len()
    }

    fn molecules(&self) -> &[Molecule] {
        &self.molecules
    }

    fn box_type(&self) -> BoxType {
        self.box_type
    }

    fn masses(&self) -> &[f64] {
        &self.masses
    }
}

/// Check that molecules tile `0..n_atoms` in order.
pub(crate) fn validate_molecules(molecules: &[Molecule], n_atoms: usize) -> Result<(), TopologyError> {
    let mut expected = 0usize;
    for (i, mol) in molecules.iter().enumerate() {
        if mol.atoms.first != expected {
            return Err(TopologyError::Invalid(format!(
                "molecule {} starts at atom {}, expected {}",
                i + 1,
                mol.atoms.first + 1,
                expected + 1
            )));
        }
        if mol.atoms.is_empty() {
            return Err(TopologyError::Invalid(format!("molecule {} has no atoms", i + 1)));
        }
        expected = mol.atoms.last;
    }
    if !molecules.is_empty() && expected != n_atoms {
        return Err(TopologyError::Invalid(format!(
            "molecules cover {} atoms but the topology has {}",
            expected, n_atoms
        )));
    }
    Ok(())
}
