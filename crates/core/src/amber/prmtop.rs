//! AMBER prmtop (topology) file parser.
//!
//! Reads the parts of an AMBER7-format topology that imaging needs:
//! - Atom names and masses
//! - Residue labels and pointers
//! - Molecule layout (ATOMS_PER_MOLECULE, or bonded connectivity)
//! - Solvent molecules (SOLVENT_POINTERS, or residue names)
//! - Declared box type and dimensions (IFBOX, BOX_DIMENSIONS)

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::error::TopologyError;
use crate::pbc::cell::TRUNCATED_OCTAHEDRON_ANGLE;
use crate::pbc::{BoxType, PeriodicBox};
use crate::topology::{validate_molecules, AtomRange, Molecule, Topology};

/// Residue names recognised as solvent when the topology has no
/// SOLVENT_POINTERS section.
pub const SOLVENT_RESIDUE_NAMES: &[&str] = &[
    "WAT", "HOH", "TIP3", "TIP4", "TIP5", "TP3", "TP4", "TP5", "T3P", "T4P", "T4E", "SPC", "SPCE",
    "OPC", "SOL",
];

// POINTERS layout
const PTR_NATOM: usize = 0;
const PTR_NRES: usize = 11;
const PTR_IFBOX: usize = 27;

// ============================================================================
// Data Structures
// ============================================================================

/// Parsed AMBER topology.
#[derive(Debug, Clone)]
pub struct AmberTopology {
    /// Number of atoms
    pub n_atoms: usize,
    /// Number of residues
    pub n_residues: usize,
    /// Atom names (4-char strings)
    pub atom_names: Vec<String>,
    /// Residue labels
    pub residue_labels: Vec<String>,
    /// Residue pointers: first atom index (0-based) for each residue
    pub residue_pointers: Vec<usize>,
    /// Atomic masses
    pub masses: Vec<f64>,
    /// Bond pairs as (atom_i, atom_j) tuples (0-indexed)
    pub bonds: Vec<(usize, usize)>,
    /// Box type declared by IFBOX
    pub box_type: BoxType,
    /// Box stored in the topology, when present
    pub periodic_box: Option<PeriodicBox>,
    molecules: Vec<Molecule>,
}

impl AmberTopology {
    /// Get the residue index for each atom.
    pub fn atom_residue_indices(&self) -> Vec<usize> {
        let mut result = vec![0usize; self.n_atoms];
        for res_idx in 0..self.n_residues {
            let (start, end) = self.residue_bounds(res_idx);
            result[start..end].fill(res_idx);
        }
        result
    }

    /// Number of atoms in each molecule.
    pub fn molecule_sizes(&self) -> Vec<usize> {
        self.molecules.iter().map(Molecule::n_atoms).collect()
    }

    /// Solvent flag for each molecule.
    pub fn solvent_flags(&self) -> Vec<bool> {
        self.molecules.iter().map(|m| m.is_solvent).collect()
    }

    fn residue_bounds(&self, res_idx: usize) -> (usize, usize) {
        let start = self.residue_pointers[res_idx];
        let end = if res_idx + 1 < self.n_residues {
            self.residue_pointers[res_idx + 1]
        } else {
            self.n_atoms
        };
        (start, end)
    }
}

impl Topology for AmberTopology {
    fn n_atoms(&self) -> usize {
        self.n_atoms
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

// ============================================================================
// Parser Implementation
// ============================================================================

/// Internal parser state for reading FLAG/FORMAT sections.
struct PrmtopParser {
    sections: FxHashMap<String, Vec<String>>,
}

impl PrmtopParser {
    fn new() -> Self {
        Self {
            sections: FxHashMap::default(),
        }
    }

    /// Split the file into its %FLAG sections.
    fn read<R: BufRead>(&mut self, reader: R, path: &str) -> Result<(), TopologyError> {
        let mut current_flag: Option<String> = None;
        let mut current_data: Vec<String> = Vec::new();

        for line in reader.lines() {
            let line = line.map_err(|source| TopologyError::Io {
                path: path.to_string(),
                source,
            })?;

            if let Some(flag_content) = line.strip_prefix("%FLAG") {
                if let Some(flag) = current_flag.take() {
                    self.sections.insert(flag, std::mem::take(&mut current_data));
                }
                current_flag = Some(flag_content.trim().to_string());
            } else if line.starts_with("%FORMAT")
                || line.starts_with("%VERSION")
                || line.starts_with("%COMMENT")
            {
                continue;
            } else if current_flag.is_some() {
                current_data.push(line);
            }
        }

        if let Some(flag) = current_flag {
            self.sections.insert(flag, current_data);
        }
        Ok(())
    }

    fn has(&self, flag: &str) -> bool {
        self.sections.contains_key(flag)
    }

    fn section(&self, flag: &str) -> Result<&[String], TopologyError> {
        self.sections
            .get(flag)
            .map(Vec::as_slice)
            .ok_or_else(|| TopologyError::MissingSection(flag.to_string()))
    }

    /// Parse integer values from a section.
    fn parse_integers(&self, flag: &str) -> Result<Vec<i64>, TopologyError> {
        let mut values = Vec::new();
        for line in self.section(flag)? {
            for word in line.split_whitespace() {
                let val: i64 = word.parse().map_err(|e| TopologyError::parse(flag, e))?;
                values.push(val);
            }
        }
        Ok(values)
    }

    /// Parse floating point values from a section.
    fn parse_floats(&self, flag: &str) -> Result<Vec<f64>, TopologyError> {
        let mut values = Vec::new();
        for line in self.section(flag)? {
            for word in line.split_whitespace() {
                let val: f64 = word.parse().map_err(|e| TopologyError::parse(flag, e))?;
                values.push(val);
            }
        }
        Ok(values)
    }

    /// Parse fixed-width string values (like atom names).
    fn parse_strings(&self, flag: &str, width: usize) -> Result<Vec<String>, TopologyError> {
        let mut values = Vec::new();
        for line in self.section(flag)? {
            let chars: Vec<char> = line.chars().collect();
            for field in chars.chunks(width) {
                let s: String = field.iter().collect();
                let s = s.trim();
                if !s.is_empty() || field.len() == width {
                    values.push(s.to_string());
                }
            }
        }
        Ok(values)
    }

    /// Parse an optional section, treating absence as `None`.
    fn optional_integers(&self, flag: &str) -> Result<Option<Vec<i64>>, TopologyError> {
        if self.has(flag) {
            self.parse_integers(flag).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Convert 1-based pointer values to 0-based indices.
fn one_based(values: &[i64], flag: &str, count: usize) -> Result<Vec<usize>, TopologyError> {
    if values.len() < count {
        return Err(TopologyError::Invalid(format!(
            "{} has {} entries, expected {}",
            flag,
            values.len(),
            count
        )));
    }
    values
        .iter()
        .take(count)
        .enumerate()
        .map(|(i, &x)| {
            if x < 1 {
                Err(TopologyError::Invalid(format!(
                    "invalid {} at position {}: {} (must be >= 1)",
                    flag, i, x
                )))
            } else {
                Ok((x - 1) as usize)
            }
        })
        .collect()
}

/// Residue start atoms must be strictly increasing and inside the atom range.
fn check_residue_pointers(pointers: &[usize], n_atoms: usize) -> Result<(), TopologyError> {
    for (i, &start) in pointers.iter().enumerate() {
        if start >= n_atoms {
            return Err(TopologyError::Invalid(format!(
                "RESIDUE_POINTER {} starts at atom {}, but there are {} atoms",
                i + 1,
                start + 1,
                n_atoms
            )));
        }
        if i > 0 && start <= pointers[i - 1] {
            return Err(TopologyError::Invalid(format!(
                "RESIDUE_POINTER {} ({}) does not follow {} ({})",
                i + 1,
                start + 1,
                i,
                pointers[i - 1] + 1
            )));
        }
    }
    Ok(())
}

/// Parse an AMBER prmtop file.
///
/// # Arguments
/// * `path` - Path to the prmtop file
///
/// # Returns
/// * `Ok(AmberTopology)` - Parsed topology
/// * `Err(TopologyError)` - I/O failure, missing section or malformed data
pub fn parse_prmtop<P: AsRef<Path>>(path: P) -> Result<AmberTopology, TopologyError> {
    let display = path.as_ref().display().to_string();
    let file = File::open(path.as_ref()).map_err(|source| TopologyError::Io {
        path: display.clone(),
        source,
    })?;
    let mut parser = PrmtopParser::new();
    parser.read(BufReader::new(file), &display)?;
    build_topology(&parser)
}

/// Parse prmtop text already held in memory.
pub fn parse_prmtop_str(text: &str) -> Result<AmberTopology, TopologyError> {
    let mut parser = PrmtopParser::new();
    parser.read(text.as_bytes(), "<memory>")?;
    build_topology(&parser)
}

fn build_topology(parser: &PrmtopParser) -> Result<AmberTopology, TopologyError> {
    let pointers = parser.parse_integers("POINTERS")?;
    if pointers.len() <= PTR_NRES {
        return Err(TopologyError::Invalid("POINTERS section too short".to_string()));
    }
    if pointers[PTR_NATOM] < 0 || pointers[PTR_NRES] < 0 {
        return Err(TopologyError::Invalid(format!(
            "POINTERS contains negative values: n_atoms={}, n_residues={}",
            pointers[PTR_NATOM], pointers[PTR_NRES]
        )));
    }
    let n_atoms = pointers[PTR_NATOM] as usize;
    let n_residues = pointers[PTR_NRES] as usize;
    let ifbox = pointers.get(PTR_IFBOX).copied().unwrap_or(0);

    let atom_names = parser.parse_strings("ATOM_NAME", 4)?;
    if atom_names.len() < n_atoms {
        return Err(TopologyError::Invalid(format!(
            "ATOM_NAME has {} entries, expected {}",
            atom_names.len(),
            n_atoms
        )));
    }

    let residue_labels = parser.parse_strings("RESIDUE_LABEL", 4)?;
    if residue_labels.len() < n_residues {
        return Err(TopologyError::Invalid(format!(
            "RESIDUE_LABEL has {} entries, expected {}",
            residue_labels.len(),
            n_residues
        )));
    }
    let residue_pointers = one_based(
        &parser.parse_integers("RESIDUE_POINTER")?,
        "RESIDUE_POINTER",
        n_residues,
    )?;
    check_residue_pointers(&residue_pointers, n_atoms)?;

    let masses = if parser.has("MASS") {
        let masses = parser.parse_floats("MASS")?;
        if masses.len() < n_atoms {
            return Err(TopologyError::Invalid(format!(
                "MASS has {} entries, expected {}",
                masses.len(),
                n_atoms
            )));
        }
        masses.into_iter().take(n_atoms).collect()
    } else {
        log::warn!("prmtop has no MASS section, using unit masses");
        vec![1.0; n_atoms]
    };

    // Bond triplets: atom_i*3, atom_j*3, bond_type_index
    let mut bonds = Vec::new();
    for section in &["BONDS_INC_HYDROGEN", "BONDS_WITHOUT_HYDROGEN"] {
        if let Some(raw) = parser.optional_integers(section)? {
            for chunk in raw.chunks_exact(3) {
                if chunk[0] < 0 || chunk[1] < 0 {
                    continue;
                }
                let (i, j) = ((chunk[0] / 3) as usize, (chunk[1] / 3) as usize);
                if i < n_atoms && j < n_atoms {
                    bonds.push((i, j));
                }
            }
        }
    }

    let periodic_box = read_box(parser, ifbox)?;
    let box_type = match (ifbox, periodic_box) {
        (0, _) => BoxType::None,
        (2, _) => BoxType::TruncatedOctahedron,
        (_, Some(pbox)) => pbox.box_type(),
        (_, None) => BoxType::Orthogonal,
    };

    let mut topology = AmberTopology {
        n_atoms,
        n_residues,
        atom_names: atom_names.into_iter().take(n_atoms).collect(),
        residue_labels: residue_labels.into_iter().take(n_residues).collect(),
        residue_pointers,
        masses,
        bonds,
        box_type,
        periodic_box,
        molecules: Vec::new(),
    };
    topology.molecules = build_molecules(parser, &topology)?;
    validate_molecules(&topology.molecules, n_atoms)?;
    Ok(topology)
}

/// Read BOX_DIMENSIONS (OLDBETA, a, b, c) for a periodic topology.
fn read_box(parser: &PrmtopParser, ifbox: i64) -> Result<Option<PeriodicBox>, TopologyError> {
    if ifbox <= 0 || !parser.has("BOX_DIMENSIONS") {
        return Ok(None);
    }
    let dims = parser.parse_floats("BOX_DIMENSIONS")?;
    if dims.len() < 4 {
        return Err(TopologyError::Invalid(format!(
            "BOX_DIMENSIONS has {} entries, expected 4",
            dims.len()
        )));
    }
    let beta = dims[0];
    let lengths = [dims[1], dims[2], dims[3]];
    let truncoct = ifbox == 2 || (beta - TRUNCATED_OCTAHEDRON_ANGLE).abs() < 1e-3;
    let angles = if truncoct {
        [TRUNCATED_OCTAHEDRON_ANGLE; 3]
    } else {
        [90.0, beta, 90.0]
    };
    Ok(Some(PeriodicBox::new(lengths, angles)))
}

fn build_molecules(
    parser: &PrmtopParser,
    topology: &AmberTopology,
) -> Result<Vec<Molecule>, TopologyError> {
    if let Some(per_molecule) = parser.optional_integers("ATOMS_PER_MOLECULE")? {
        let solvent_pointers = parser.optional_integers("SOLVENT_POINTERS")?;
        return molecules_from_sizes(topology, &per_molecule, solvent_pointers.as_deref());
    }
    Ok(molecules_from_bonds(topology))
}

/// Molecules from ATOMS_PER_MOLECULE, with solvent starting at NSPSOL.
fn molecules_from_sizes(
    topology: &AmberTopology,
    per_molecule: &[i64],
    solvent_pointers: Option<&[i64]>,
) -> Result<Vec<Molecule>, TopologyError> {
    // SOLVENT_POINTERS: IPTRES, NSPM, NSPSOL
    let (n_molecules, first_solvent) = match solvent_pointers {
        Some(sp) if sp.len() >= 3 => (sp[1].max(0) as usize, Some((sp[2] - 1).max(0) as usize)),
        _ => (per_molecule.len(), None),
    };
    if per_molecule.len() < n_molecules {
        return Err(TopologyError::Invalid(format!(
            "ATOMS_PER_MOLECULE has {} entries, expected {}",
            per_molecule.len(),
            n_molecules
        )));
    }

    let mut molecules = Vec::with_capacity(n_molecules);
    let mut first = 0usize;
    for (i, &size) in per_molecule.iter().take(n_molecules).enumerate() {
        if size < 1 {
            return Err(TopologyError::Invalid(format!(
                "molecule {} has {} atoms",
                i + 1,
                size
            )));
        }
        let atoms = AtomRange::new(first, first + size as usize);
        let is_solvent = match first_solvent {
            Some(fs) => i >= fs,
            None => is_solvent_residue(topology, atoms.first),
        };
        molecules.push(Molecule::new(atoms, is_solvent));
        first = atoms.last;
    }
    Ok(molecules)
}

/// Molecules as bonded connected components.
///
/// Returns no molecules (with a warning) when a component is not a
/// contiguous run of atoms, since imaging needs contiguous molecules.
fn molecules_from_bonds(topology: &AmberTopology) -> Vec<Molecule> {
    fn find(parent: &mut [usize], i: usize) -> usize {
        if parent[i] != i {
            parent[i] = find(parent, parent[i]);
        }
        parent[i]
    }

    let n = topology.n_atoms;
    let mut parent: Vec<usize> = (0..n).collect();
    for &(i, j) in &topology.bonds {
        let (pi, pj) = (find(&mut parent, i), find(&mut parent, j));
        if pi != pj {
            // Lower index as root, so each root is its component's first atom.
            parent[pi.max(pj)] = pi.min(pj);
        }
    }

    let mut molecules = Vec::new();
    let mut first = 0usize;
    for atom in 1..=n {
        let boundary = atom == n || find(&mut parent, atom) != find(&mut parent, first);
        if !boundary {
            continue;
        }
        if atom < n && find(&mut parent, atom) != atom {
            log::warn!(
                "atom {} is bonded to an earlier molecule but not contiguous with it; \
                 molecule information unavailable",
                atom + 1
            );
            return Vec::new();
        }
        let atoms = AtomRange::new(first, atom);
        molecules.push(Molecule::new(atoms, is_solvent_residue(topology, first)));
        first = atom;
    }
    log::debug!("derived {} molecules from bonds", molecules.len());
    molecules
}

fn is_solvent_residue(topology: &AmberTopology, atom: usize) -> bool {
    let res = topology
        .residue_pointers
        .partition_point(|&start| start <= atom)
        .saturating_sub(1);
    topology
        .residue_labels
        .get(res)
        .is_some_and(|label| SOLVENT_RESIDUE_NAMES.contains(&label.as_str()))
}
