#![allow(dead_code)]

use rst_autoimage::{BoxType, Frame, MolecularTopology, PeriodicBox};

/// 64-bit linear congruential generator with a fixed seed.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed.wrapping_mul(6364136223846793005).wrapping_add(1))
    }

    /// Uniform value in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    pub fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

/// Layout of a synthetic solvated system.
pub struct SystemLayout {
    /// Atoms in the solute chain (molecule 0).
    pub solute_atoms: usize,
    /// Number of 4-atom ligands (fixed by the heuristic).
    pub ligands: usize,
    /// Number of single-atom ions.
    pub ions: usize,
    /// Number of 3-atom waters.
    pub waters: usize,
}

impl Default for SystemLayout {
    fn default() -> Self {
        Self {
            solute_atoms: 20,
            ligands: 2,
            ions: 4,
            waters: 40,
        }
    }
}

/// Build a topology plus one frame whose molecules are scattered over
/// several periodic images of `pbox`.
pub fn solvated_system(
    layout: &SystemLayout,
    pbox: PeriodicBox,
    seed: u64,
) -> (MolecularTopology, Frame) {
    let mut rng = Lcg::new(seed);
    let mut sizes = Vec::new();
    let mut solvent = Vec::new();
    let mut masses = Vec::new();
    let mut coords = Vec::new();

    let span = pbox.lengths.iter().cloned().fold(0.0f64, f64::max);
    let place = |rng: &mut Lcg, n: usize, spread: f64| -> Vec<[f64; 3]> {
        let center = [
            rng.range(-span, 2.0 * span),
            rng.range(-span, 2.0 * span),
            rng.range(-span, 2.0 * span),
        ];
        (0..n)
            .map(|_| {
                [
                    center[0] + rng.range(-spread, spread),
                    center[1] + rng.range(-spread, spread),
                    center[2] + rng.range(-spread, spread),
                ]
            })
            .collect()
    };

    sizes.push(layout.solute_atoms);
    solvent.push(false);
    coords.extend(place(&mut rng, layout.solute_atoms, 4.0));
    masses.extend((0..layout.solute_atoms).map(|i| if i % 3 == 0 { 14.01 } else { 12.01 }));

    for _ in 0..layout.ligands {
        sizes.push(4);
        solvent.push(false);
        coords.extend(place(&mut rng, 4, 1.5));
        masses.extend([12.01, 16.00, 1.008, 1.008]);
    }
    for _ in 0..layout.ions {
        sizes.push(1);
        solvent.push(false);
        coords.extend(place(&mut rng, 1, 0.0));
        masses.push(22.99);
    }
    for _ in 0..layout.waters {
        sizes.push(3);
        solvent.push(true);
        coords.extend(place(&mut rng, 3, 1.0));
        masses.extend([16.00, 1.008, 1.008]);
    }

    let topology =
        MolecularTopology::from_molecule_sizes(&sizes, &solvent, masses.clone(), pbox.box_type())
            .expect("valid synthetic topology");
    let frame = Frame::new(coords, masses, pbox).expect("matching masses");
    (topology, frame)
}

/// Orthogonal cube of side `l`.
pub fn cube(l: f64) -> PeriodicBox {
    PeriodicBox::orthogonal([l; 3])
}

/// Monoclinic-like general triclinic cell.
pub fn skewed() -> PeriodicBox {
    let pbox = PeriodicBox::new([32.0, 35.0, 38.0], [85.0, 100.0, 75.0]);
    assert_eq!(pbox.box_type(), BoxType::Triclinic);
    pbox
}

pub fn assert_close(a: &[f64; 3], b: &[f64; 3], tol: f64) {
    for k in 0..3 {
        assert!(
            (a[k] - b[k]).abs() < tol,
            "{:?} != {:?} (tolerance {})",
            a,
            b,
            tol
        );
    }
}
