//! Partition molecules into anchor, fixed and mobile roles.
//!
//! The anchor is what gets centered every frame. Fixed molecules are
//! attached to the anchor (or to a previously placed fixed molecule) by the
//! nearest-image search; mobile molecules are wrapped independently. Any
//! mask selection is widened to whole molecules.

use rustc_hash::FxHashSet;

use crate::error::AutoImageError;
use crate::mask::{molecules_touched, MaskEvaluator};
use crate::topology::{AtomRange, Molecule, Topology};

/// Role a policy assigns to a molecule no explicit mask claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoleculeRole {
    Fixed,
    Mobile,
}

/// Decides fixed vs. mobile for molecules that are auto-classified.
pub trait ClassificationPolicy {
    fn role(&self, index: usize, molecule: &Molecule) -> MoleculeRole;
}

/// Solvent and single-atom molecules (ions) are mobile, everything else
/// is fixed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolventHeuristic;

impl ClassificationPolicy for SolventHeuristic {
    fn role(&self, _index: usize, molecule: &Molecule) -> MoleculeRole {
        if molecule.is_solvent || molecule.n_atoms() == 1 {
            MoleculeRole::Mobile
        } else {
            MoleculeRole::Fixed
        }
    }
}

/// Molecules listed by index are fixed, all others mobile.
#[derive(Debug, Clone, Default)]
pub struct ExplicitMolecules {
    fixed: FxHashSet<usize>,
}

impl ExplicitMolecules {
    /// `fixed` holds 0-based molecule indices.
    pub fn new(fixed: impl IntoIterator<Item = usize>) -> Self {
        Self {
            fixed: fixed.into_iter().collect(),
        }
    }
}

impl ClassificationPolicy for ExplicitMolecules {
    fn role(&self, index: usize, _molecule: &Molecule) -> MoleculeRole {
        if self.fixed.contains(&index) {
            MoleculeRole::Fixed
        } else {
            MoleculeRole::Mobile
        }
    }
}

/// Optional mask expressions for each region.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionMasks<'a> {
    pub anchor: Option<&'a str>,
    pub fixed: Option<&'a str>,
    pub mobile: Option<&'a str>,
}

/// Atoms that are centered each frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorRegion {
    /// Sorted 0-based atom indices used for the anchor center.
    pub atoms: Vec<usize>,
    /// Molecules touched by the anchor atoms; excluded from fixed/mobile.
    pub molecules: Vec<usize>,
}

/// Result of classifying a topology. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub anchor: AnchorRegion,
    /// Fixed molecules in topology order.
    pub fixed: Vec<AtomRange>,
    /// Mobile molecules in topology order.
    pub mobile: Vec<AtomRange>,
    /// Molecules selected by neither an explicit mask nor auto-classification.
    pub unassigned: Vec<AtomRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Open,
    Anchor,
    Fixed,
    Mobile,
}

/// Classify every molecule of `topology`.
///
/// # Arguments
/// * `topology` - Topology with molecule information
/// * `masks` - Optional anchor/fixed/mobile mask expressions
/// * `evaluator` - Resolves mask expressions to atom indices
/// * `policy` - Role for molecules left to auto-classification
///
/// # Returns
/// * `Ok(Classification)` - Anchor atoms plus fixed/mobile/unassigned molecule ranges
/// * `Err(AutoImageError)` - Empty anchor selection, mask failure or no molecules
pub fn classify<T, M, P>(
    topology: &T,
    masks: &RegionMasks<'_>,
    evaluator: &M,
    policy: &P,
) -> Result<Classification, AutoImageError>
where
    T: Topology + ?Sized,
    M: MaskEvaluator<T> + ?Sized,
    P: ClassificationPolicy + ?Sized,
{
    let molecules = topology.molecules();
    if molecules.is_empty() {
        return Err(AutoImageError::NoMolecules);
    }
    let mut slots = vec![Slot::Open; molecules.len()];

    let anchor = match masks.anchor {
        Some(expr) => {
            let mut atoms = evaluator.evaluate(topology, expr)?;
            atoms.sort_unstable();
            atoms.dedup();
            if atoms.is_empty() {
                return Err(AutoImageError::EmptyAnchor {
                    mask: expr.to_string(),
                });
            }
            let touched = molecules_touched(topology, &atoms);
            log::info!(
                "Anchoring on {} atoms selected by mask '{}' ({} molecules)",
                atoms.len(),
                expr,
                touched.len()
            );
            AnchorRegion {
                atoms,
                molecules: touched,
            }
        }
        None => {
            log::info!("Using first molecule as anchor");
            AnchorRegion {
                atoms: molecules[0].atoms.indices().collect(),
                molecules: vec![0],
            }
        }
    };
    for &mol in &anchor.molecules {
        slots[mol] = Slot::Anchor;
    }

    if let Some(expr) = masks.fixed {
        let atoms = evaluator.evaluate(topology, expr)?;
        let touched = molecules_touched(topology, &atoms);
        log::info!("Mask '{}' corresponds to {} molecules", expr, touched.len());
        for mol in touched {
            if slots[mol] == Slot::Open {
                slots[mol] = Slot::Fixed;
            }
        }
    }

    if let Some(expr) = masks.mobile {
        let atoms = evaluator.evaluate(topology, expr)?;
        let touched = molecules_touched(topology, &atoms);
        log::info!("Mask '{}' corresponds to {} molecules", expr, touched.len());
        let mut already_fixed = 0usize;
        for mol in touched {
            match slots[mol] {
                Slot::Open => slots[mol] = Slot::Mobile,
                Slot::Fixed => already_fixed += 1,
                Slot::Anchor | Slot::Mobile => {}
            }
        }
        if already_fixed > 0 {
            log::warn!(
                "{} molecules selected by mobile mask '{}' are already fixed; keeping them fixed",
                already_fixed,
                expr
            );
        }
    }

    let fixed_auto = masks.fixed.is_none();
    let mobile_auto = masks.mobile.is_none();
    if fixed_auto || mobile_auto {
        for (idx, mol) in molecules.iter().enumerate() {
            if slots[idx] != Slot::Open {
                continue;
            }
            match policy.role(idx, mol) {
                MoleculeRole::Fixed if fixed_auto => slots[idx] = Slot::Fixed,
                MoleculeRole::Mobile if mobile_auto => slots[idx] = Slot::Mobile,
                _ => {}
            }
        }
    }

    let mut classification = Classification {
        anchor,
        fixed: Vec::new(),
        mobile: Vec::new(),
        unassigned: Vec::new(),
    };
    let mut fixed_numbers = Vec::new();
    for (idx, (mol, slot)) in molecules.iter().zip(&slots).enumerate() {
        match slot {
            Slot::Anchor => {}
            Slot::Fixed => {
                classification.fixed.push(mol.atoms);
                fixed_numbers.push((idx + 1).to_string());
            }
            Slot::Mobile => classification.mobile.push(mol.atoms),
            Slot::Open => classification.unassigned.push(mol.atoms),
        }
    }

    if !classification.fixed.is_empty() {
        log::info!(
            "{} molecules are fixed to anchor: {}",
            classification.fixed.len(),
            fixed_numbers.join(" ")
        );
    }
    log::info!("{} molecules are mobile", classification.mobile.len());
    if !classification.unassigned.is_empty() {
        log::info!(
            "{} molecules are neither fixed nor mobile and will not be imaged",
            classification.unassigned.len()
        );
    }

    Ok(classification)
}
