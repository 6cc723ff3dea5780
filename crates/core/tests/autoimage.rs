mod common;

use common::{assert_close, cube, skewed, solvated_system, SystemLayout};
use rst_autoimage::image::{fixed, mobile};
use rst_autoimage::{
    AtomNumberMask, AtomRange, AutoImage, AutoImageConfig, BoxGeometry, BoxType,
    CenteringPolicy, ExplicitMolecules, Frame, FrameOutcome, FrameSkip, ImagePosition,
    ImagingPath, MolecularTopology, PeriodicBox, SetupOutcome, Topology, TriclinicMode,
};

fn prepared(config: AutoImageConfig, topology: &MolecularTopology) -> AutoImage {
    let mut action = AutoImage::new(config);
    let outcome = action.setup(topology).expect("setup");
    assert_eq!(outcome, SetupOutcome::Ready);
    action
}

fn anchor_center(action: &AutoImage, frame: &Frame) -> [f64; 3] {
    let anchor = &action.classification().expect("prepared").anchor;
    frame.center_of_atoms(anchor.atoms.iter().copied(), action.config().use_mass)
}

fn target(action: &AutoImage, pbox: &PeriodicBox) -> [f64; 3] {
    let path = action.imaging_path().expect("prepared");
    BoxGeometry::resolve(path, pbox)
        .expect("valid box")
        .target(action.config().origin)
}

// ============================================================================
// Worked scenarios
// ============================================================================

#[test]
fn test_anchor_centered_and_mobile_wrapped() {
    // 30 A cube, box-center target. Anchor centroid at (40,15,15); the ion
    // sits at (31,2,2) once the anchor shift of (-25,0,0) is applied.
    let topology = MolecularTopology::from_molecule_sizes(
        &[2, 1],
        &[false, false],
        vec![12.0, 12.0, 23.0],
        BoxType::Orthogonal,
    )
    .expect("topology");
    let mut frame = Frame::new(
        vec![[39.0, 15.0, 15.0], [41.0, 15.0, 15.0], [56.0, 2.0, 2.0]],
        vec![12.0, 12.0, 23.0],
        cube(30.0),
    )
    .expect("frame");

    let action = prepared(AutoImageConfig::default(), &topology);
    let outcome = action.process_frame(0, &mut frame).expect("process");

    assert_eq!(outcome, FrameOutcome::Modified);
    assert_eq!(anchor_center(&action, &frame), [15.0, 15.0, 15.0]);
    assert_eq!(frame.coords()[2], [1.0, 2.0, 2.0]);
}

#[test]
fn test_mobile_atom_wraps_into_cell() {
    let pbox = cube(30.0);
    let geometry = BoxGeometry::resolve(ImagingPath::Orthogonal, &pbox).expect("valid box");
    let mut frame = Frame::with_unit_masses(vec![[31.0, 2.0, 2.0]], pbox);

    mobile::image_mobile(
        &mut frame,
        &[AtomRange::new(0, 1)],
        &geometry,
        &CenteringPolicy::default(),
    );

    assert_eq!(frame.coords()[0], [1.0, 2.0, 2.0]);
}

#[test]
fn test_fixed_molecules_chain_from_previous_placement() {
    // A is 40 A from the anchor along x; B sits right next to A. If B were
    // searched against the anchor it would land at x=1, not next to A.
    let topology = MolecularTopology::from_molecule_sizes(
        &[2, 2, 2],
        &[false, false, false],
        vec![1.0; 6],
        BoxType::Orthogonal,
    )
    .expect("topology");
    let mut frame = Frame::with_unit_masses(
        vec![
            [14.0, 15.0, 15.0],
            [16.0, 15.0, 15.0],
            [54.0, 15.0, 15.0],
            [56.0, 15.0, 15.0],
            [60.0, 15.0, 15.0],
            [62.0, 15.0, 15.0],
        ],
        cube(30.0),
    );

    let action = prepared(AutoImageConfig::default(), &topology);
    let classification = action.classification().expect("prepared");
    assert_eq!(
        classification.fixed,
        vec![AtomRange::new(2, 4), AtomRange::new(4, 6)]
    );
    assert!(classification.mobile.is_empty());

    action.process_frame(0, &mut frame).expect("process");

    assert_eq!(frame.coords()[2], [24.0, 15.0, 15.0]);
    assert_eq!(frame.coords()[3], [26.0, 15.0, 15.0]);
    assert_eq!(frame.coords()[4], [30.0, 15.0, 15.0]);
    assert_eq!(frame.coords()[5], [32.0, 15.0, 15.0]);
}

#[test]
fn test_fixed_molecules_far_outside_the_cell() {
    // B is a million cells away and is brought back; C is too far to
    // express as a cell count and is left where it is.
    let topology = MolecularTopology::from_molecule_sizes(
        &[2, 2, 2],
        &[false, false, false],
        vec![1.0; 6],
        BoxType::Orthogonal,
    )
    .expect("topology");
    let mut frame = Frame::with_unit_masses(
        vec![
            [14.0, 15.0, 15.0],
            [16.0, 15.0, 15.0],
            [30_000_014.0, 15.0, 15.0],
            [30_000_016.0, 15.0, 15.0],
            [1.0e11, 15.0, 15.0],
            [1.0e11 + 2.0, 15.0, 15.0],
        ],
        cube(30.0),
    );

    let action = prepared(AutoImageConfig::default(), &topology);
    let outcome = action.process_frame(0, &mut frame).expect("process");

    assert_eq!(outcome, FrameOutcome::Modified);
    assert_eq!(frame.coords()[2], [14.0, 15.0, 15.0]);
    assert_eq!(frame.coords()[3], [16.0, 15.0, 15.0]);
    assert_eq!(frame.coords()[4], [1.0e11, 15.0, 15.0]);
    assert_eq!(frame.coords()[5], [1.0e11 + 2.0, 15.0, 15.0]);
}

#[test]
fn test_fixed_search_is_a_pure_function() {
    let pbox = cube(30.0);
    let geometry = BoxGeometry::resolve(ImagingPath::Orthogonal, &pbox).expect("valid box");
    let image = fixed::nearest_image(&[25.0, 15.0, 15.0], &[61.0, 15.0, 15.0], &geometry);
    assert_eq!(image.cells, [-1, 0, 0]);
    assert_eq!(image.translation, [-30.0, 0.0, 0.0]);
}

// ============================================================================
// Invariants over synthetic systems
// ============================================================================

fn boxes() -> Vec<PeriodicBox> {
    vec![
        cube(30.0),
        PeriodicBox::orthogonal([28.0, 33.0, 41.0]),
        skewed(),
        PeriodicBox::truncated_octahedron(40.0),
    ]
}

#[test]
fn test_anchor_lands_on_target() {
    for (i, pbox) in boxes().into_iter().enumerate() {
        for origin in [false, true] {
            for use_mass in [false, true] {
                let (topology, mut frame) =
                    solvated_system(&SystemLayout::default(), pbox, 7 + i as u64);
                let config = AutoImageConfig::default()
                    .with_origin(origin)
                    .with_mass(use_mass);
                let action = prepared(config, &topology);

                action.process_frame(0, &mut frame).expect("process");

                assert_close(
                    &anchor_center(&action, &frame),
                    &target(&action, &pbox),
                    1e-6,
                );
            }
        }
    }
}

#[test]
fn test_molecules_move_rigidly() {
    for (i, pbox) in boxes().into_iter().enumerate() {
        let (topology, original) = solvated_system(&SystemLayout::default(), pbox, 100 + i as u64);
        let mut frame = original.clone();
        let action = prepared(AutoImageConfig::default(), &topology);

        action.process_frame(0, &mut frame).expect("process");

        for mol in topology.molecules() {
            let first = mol.atoms.first;
            for atom in mol.atoms.indices() {
                let before = [
                    original.coords()[atom][0] - original.coords()[first][0],
                    original.coords()[atom][1] - original.coords()[first][1],
                    original.coords()[atom][2] - original.coords()[first][2],
                ];
                let after = [
                    frame.coords()[atom][0] - frame.coords()[first][0],
                    frame.coords()[atom][1] - frame.coords()[first][1],
                    frame.coords()[atom][2] - frame.coords()[first][2],
                ];
                assert_close(&before, &after, 1e-9);
            }
        }
    }
}

#[test]
fn test_classification_partitions_atoms() {
    let (topology, _) = solvated_system(&SystemLayout::default(), cube(30.0), 3);
    let action = prepared(AutoImageConfig::default(), &topology);
    let classification = action.classification().expect("prepared");

    let mut seen = vec![0usize; topology.n_atoms()];
    for &mol in &classification.anchor.molecules {
        for atom in topology.molecules()[mol].atoms.indices() {
            seen[atom] += 1;
        }
    }
    for range in classification.fixed.iter().chain(&classification.mobile) {
        for atom in range.indices() {
            seen[atom] += 1;
        }
    }
    assert!(classification.unassigned.is_empty());
    assert!(seen.iter().all(|&n| n == 1));

    // Two ligands are fixed; 4 ions and 40 waters are mobile.
    assert_eq!(classification.fixed.len(), 2);
    assert_eq!(classification.mobile.len(), 44);
}

#[test]
fn test_mobile_centers_end_in_primary_cell() {
    let lengths = [28.0, 33.0, 41.0];
    for origin in [false, true] {
        let (topology, mut frame) =
            solvated_system(&SystemLayout::default(), PeriodicBox::orthogonal(lengths), 11);
        let action = prepared(AutoImageConfig::default().with_origin(origin), &topology);
        action.process_frame(0, &mut frame).expect("process");

        for &range in &action.classification().expect("prepared").mobile {
            let c = frame.center(range, false);
            for k in 0..3 {
                let (lo, hi) = if origin {
                    (-lengths[k] / 2.0, lengths[k] / 2.0)
                } else {
                    (0.0, lengths[k])
                };
                assert!(
                    c[k] >= lo - 1e-9 && c[k] < hi + 1e-9,
                    "axis {} center {} outside [{}, {})",
                    k,
                    c[k],
                    lo,
                    hi
                );
            }
        }
    }
}

#[test]
fn test_mobile_centers_end_in_triclinic_cell() {
    let pbox = skewed();
    let cell = pbox.unit_cell().expect("valid box");
    let (topology, mut frame) = solvated_system(&SystemLayout::default(), pbox, 12);
    let action = prepared(AutoImageConfig::default(), &topology);
    assert_eq!(action.imaging_path(), Some(ImagingPath::Triclinic));

    action.process_frame(0, &mut frame).expect("process");

    for &range in &action.classification().expect("prepared").mobile {
        let f = cell.to_fractional(&frame.center(range, false));
        for v in f {
            assert!((-1e-9..1.0 + 1e-9).contains(&v), "fractional {:?}", f);
        }
    }
}

#[test]
fn test_mobile_centers_inside_truncated_octahedron() {
    // Circumradius of the truncated octahedron whose lattice vectors are
    // 40 A long.
    let radius = 40.0 * 5f64.sqrt() / (2.0 * 3f64.sqrt());
    let pbox = PeriodicBox::truncated_octahedron(40.0);
    let (topology, mut frame) = solvated_system(&SystemLayout::default(), pbox, 13);
    let action = prepared(AutoImageConfig::default(), &topology);
    assert_eq!(
        action.imaging_path(),
        Some(ImagingPath::TruncatedOctahedron)
    );

    action.process_frame(0, &mut frame).expect("process");

    let t = target(&action, &pbox);
    for &range in &action.classification().expect("prepared").mobile {
        let c = frame.center(range, false);
        let d = ((c[0] - t[0]).powi(2) + (c[1] - t[1]).powi(2) + (c[2] - t[2]).powi(2)).sqrt();
        assert!(d <= radius + 1e-6, "center {:?} is {} A from {:?}", c, d, t);
    }
}

#[test]
fn test_fixed_molecules_within_half_box_of_reference() {
    let lengths = [30.0, 30.0, 30.0];
    let (topology, mut frame) =
        solvated_system(&SystemLayout::default(), PeriodicBox::orthogonal(lengths), 21);
    let action = prepared(AutoImageConfig::default(), &topology);
    action.process_frame(0, &mut frame).expect("process");

    let mut reference = target(&action, frame.periodic_box());
    for &range in &action.classification().expect("prepared").fixed {
        let c = frame.center(range, false);
        for k in 0..3 {
            assert!((c[k] - reference[k]).abs() <= lengths[k] / 2.0 + 1e-9);
        }
        reference = c;
    }
}

#[test]
fn test_processing_is_deterministic_and_parallel_safe() {
    let pbox = skewed();
    let (topology, frame) = solvated_system(&SystemLayout::default(), pbox, 5);
    let action = prepared(AutoImageConfig::default().with_mass(true), &topology);

    let mut frames: Vec<Frame> = (0..16)
        .map(|i| {
            let mut f = frame.clone();
            f.translate(&[i as f64 * 3.7, -(i as f64) * 1.3, i as f64 * 0.9]);
            f
        })
        .collect();
    let mut sequential = frames.clone();

    let outcomes = action.process_frames(&mut frames).expect("process");
    for (i, f) in sequential.iter_mut().enumerate() {
        let outcome = action.process_frame(i, f).expect("process");
        assert_eq!(outcome, outcomes[i]);
    }
    assert_eq!(frames, sequential);

    let mut again = frame.clone();
    let mut twice = frame.clone();
    action.process_frame(0, &mut again).expect("process");
    action.process_frame(0, &mut twice).expect("process");
    assert_eq!(again, twice);
}

#[test]
fn test_degenerate_frame_is_skipped_in_batch() {
    let (topology, frame) = solvated_system(&SystemLayout::default(), cube(30.0), 8);
    let action = prepared(AutoImageConfig::default(), &topology);

    let mut bad = frame.clone();
    bad.set_periodic_box(PeriodicBox::orthogonal([30.0, 30.0, 0.0]));
    let mut frames = vec![frame.clone(), bad.clone(), frame];

    let outcomes = action.process_frames(&mut frames).expect("process");

    assert!(outcomes[0].is_modified());
    assert_eq!(
        outcomes[1],
        FrameOutcome::Skipped(FrameSkip::DegenerateBox {
            lengths: [30.0, 30.0, 0.0]
        })
    );
    assert!(outcomes[2].is_modified());
    assert_eq!(frames[1], bad);
}

// ============================================================================
// Masks and policies
// ============================================================================

#[test]
fn test_masks_select_whole_molecules() {
    // Molecules: solute 1-20, ligands 21-24 and 25-28, ions 29-32, waters.
    let (topology, mut frame) = solvated_system(&SystemLayout::default(), cube(30.0), 9);
    let config = AutoImageConfig::default()
        .with_anchor("21-24")
        .with_fixed("1")
        .with_mobile("25,29-32");
    let action = prepared(config, &topology);
    let classification = action.classification().expect("prepared");

    assert_eq!(classification.anchor.molecules, vec![1]);
    assert_eq!(classification.fixed, vec![AtomRange::new(0, 20)]);
    assert_eq!(classification.mobile.len(), 5);
    assert_eq!(classification.mobile[0], AtomRange::new(24, 28));
    // Waters were claimed by neither mask.
    assert_eq!(classification.unassigned.len(), 40);

    let waters_before: Vec<[f64; 3]> = frame.coords()[32..].to_vec();
    let anchor_before = frame.center_of_atoms(20..24, false);
    action.process_frame(0, &mut frame).expect("process");
    let shift = [
        15.0 - anchor_before[0],
        15.0 - anchor_before[1],
        15.0 - anchor_before[2],
    ];
    // Unassigned molecules only follow the whole-frame anchor shift.
    for (before, after) in waters_before.iter().zip(&frame.coords()[32..]) {
        assert_close(
            &[before[0] + shift[0], before[1] + shift[1], before[2] + shift[2]],
            after,
            1e-9,
        );
    }
}

#[test]
fn test_first_atom_positioning_and_forced_triclinic() {
    let (topology, mut frame) =
        solvated_system(&SystemLayout::default(), PeriodicBox::orthogonal([30.0; 3]), 17);
    let config = AutoImageConfig::default()
        .with_position(ImagePosition::FirstAtom)
        .with_triclinic(TriclinicMode::Force);
    let action = prepared(config, &topology);
    assert_eq!(action.imaging_path(), Some(ImagingPath::Triclinic));

    action.process_frame(0, &mut frame).expect("process");

    for &range in &action.classification().expect("prepared").mobile {
        let p = frame.coords()[range.first];
        for v in p {
            assert!((-1e-9..30.0 + 1e-9).contains(&v), "first atom {:?}", p);
        }
    }
}

#[test]
fn test_custom_policy_and_evaluator() {
    let (topology, _) = solvated_system(&SystemLayout::default(), cube(30.0), 4);
    let mut action = AutoImage::new(AutoImageConfig::default());
    // Only molecule 2 (the second ligand) is fixed.
    action
        .setup_with(&topology, &AtomNumberMask, &ExplicitMolecules::new([2]))
        .expect("setup");
    let classification = action.classification().expect("prepared");
    assert_eq!(classification.fixed, vec![AtomRange::new(24, 28)]);
    assert_eq!(classification.mobile.len(), 45);
}
