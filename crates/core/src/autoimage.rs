//! The autoimage action: re-center a system on an anchor and image every
//! other molecule around it.
//!
//! An [`AutoImage`] is configured once, set up for a topology (which
//! classifies molecules into anchor, fixed and mobile sets), and then
//! applied to any number of frames. Setup is the only mutating step;
//! frame processing borrows the action immutably, so a prepared action can
//! be shared across threads.

use rayon::prelude::*;

use crate::classify::{
    classify, Classification, ClassificationPolicy, RegionMasks, SolventHeuristic,
};
use crate::error::AutoImageError;
use crate::frame::Frame;
use crate::image::{anchor, fixed, mobile, CenteringPolicy, ImagePosition};
use crate::mask::{AtomNumberMask, MaskEvaluator};
use crate::pbc::{BoxGeometry, BoxType, ImagingPath, TriclinicMode};
use crate::topology::Topology;

// ============================================================================
// Configuration
// ============================================================================

/// User options for [`AutoImage`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AutoImageConfig {
    /// Center on the coordinate origin instead of the box center.
    pub origin: bool,
    /// Use mass-weighted centers.
    pub use_mass: bool,
    /// Reference point of mobile molecules.
    pub position: ImagePosition,
    /// Non-orthogonal imaging mode.
    pub triclinic: TriclinicMode,
    /// Anchor mask. The first molecule when unset.
    pub anchor: Option<String>,
    /// Fixed mask. Auto-classified when unset.
    pub fixed: Option<String>,
    /// Mobile mask. Auto-classified when unset.
    pub mobile: Option<String>,
}

impl AutoImageConfig {
    pub fn with_origin(mut self, origin: bool) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_mass(mut self, use_mass: bool) -> Self {
        self.use_mass = use_mass;
        self
    }

    pub fn with_position(mut self, position: ImagePosition) -> Self {
        self.position = position;
        self
    }

    pub fn with_triclinic(mut self, mode: TriclinicMode) -> Self {
        self.triclinic = mode;
        self
    }

    pub fn with_anchor(mut self, mask: impl Into<String>) -> Self {
        self.anchor = Some(mask.into());
        self
    }

    pub fn with_fixed(mut self, mask: impl Into<String>) -> Self {
        self.fixed = Some(mask.into());
        self
    }

    pub fn with_mobile(mut self, mask: impl Into<String>) -> Self {
        self.mobile = Some(mask.into());
        self
    }

    fn centering(&self) -> CenteringPolicy {
        CenteringPolicy {
            origin: self.origin,
            use_mass: self.use_mass,
            position: self.position,
        }
    }

    fn masks(&self) -> RegionMasks<'_> {
        RegionMasks {
            anchor: self.anchor.as_deref(),
            fixed: self.fixed.as_deref(),
            mobile: self.mobile.as_deref(),
        }
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Why a topology was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The topology has no molecule information.
    NoMolecules,
    /// The topology has no periodic box.
    NoBox,
}

/// Result of [`AutoImage::setup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupOutcome {
    /// Frames of this topology will be imaged.
    Ready,
    /// Frames of this topology are passed through unchanged.
    Skip(SkipReason),
}

/// Why a frame was left untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameSkip {
    /// The frame's box has a zero (or otherwise unusable) length or a
    /// singular cell.
    DegenerateBox { lengths: [f64; 3] },
    /// Setup skipped the topology.
    TopologySkipped(SkipReason),
}

/// Result of processing one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    Modified,
    Skipped(FrameSkip),
}

impl FrameOutcome {
    pub fn is_modified(&self) -> bool {
        matches!(self, FrameOutcome::Modified)
    }
}

// ============================================================================
// Action
// ============================================================================

#[derive(Debug, Clone)]
struct Prepared {
    classification: Classification,
    path: ImagingPath,
    n_atoms: usize,
}

#[derive(Debug, Clone)]
enum State {
    Unset,
    Skipped(SkipReason),
    Ready(Prepared),
}

/// Configured autoimage action.
#[derive(Debug, Clone)]
pub struct AutoImage {
    config: AutoImageConfig,
    state: State,
}

impl AutoImage {
    pub fn new(config: AutoImageConfig) -> Self {
        log::info!(
            "autoimage: anchor {}, target {}, {} centers",
            config.anchor.as_deref().unwrap_or("first molecule"),
            if config.origin { "origin" } else { "box center" },
            if config.use_mass { "mass-weighted" } else { "geometric" }
        );
        if let Some(mask) = &config.fixed {
            log::info!("autoimage: fixed mask '{}'", mask);
        }
        if let Some(mask) = &config.mobile {
            log::info!("autoimage: mobile mask '{}'", mask);
        }
        if config.position == ImagePosition::FirstAtom {
            log::info!("autoimage: mobile molecules imaged by first atom position");
        }
        match config.triclinic {
            TriclinicMode::Familiar => log::info!("autoimage: imaging into familiar shape"),
            TriclinicMode::Force => log::info!("autoimage: forcing triclinic imaging"),
            TriclinicMode::Auto => {}
        }
        Self {
            config,
            state: State::Unset,
        }
    }

    pub fn config(&self) -> &AutoImageConfig {
        &self.config
    }

    /// Classification of the current topology, when setup succeeded.
    pub fn classification(&self) -> Option<&Classification> {
        match &self.state {
            State::Ready(prepared) => Some(&prepared.classification),
            _ => None,
        }
    }

    /// Imaging path chosen for the current topology.
    pub fn imaging_path(&self) -> Option<ImagingPath> {
        match &self.state {
            State::Ready(prepared) => Some(prepared.path),
            _ => None,
        }
    }

    /// Set up for `topology` with atom-number masks and the solvent
    /// heuristic.
    pub fn setup<T>(&mut self, topology: &T) -> Result<SetupOutcome, AutoImageError>
    where
        T: Topology + ?Sized,
    {
        self.setup_with(topology, &AtomNumberMask, &SolventHeuristic)
    }

    /// Set up for `topology` with a custom mask evaluator and
    /// classification policy.
    ///
    /// # Returns
    /// * `Ok(SetupOutcome::Ready)` - Frames will be imaged
    /// * `Ok(SetupOutcome::Skip(_))` - No molecules or no box; frames pass through
    /// * `Err(AutoImageError)` - Empty anchor selection or mask failure
    pub fn setup_with<T, M, P>(
        &mut self,
        topology: &T,
        evaluator: &M,
        policy: &P,
    ) -> Result<SetupOutcome, AutoImageError>
    where
        T: Topology + ?Sized,
        M: MaskEvaluator<T> + ?Sized,
        P: ClassificationPolicy + ?Sized,
    {
        if topology.molecules().is_empty() {
            log::warn!("autoimage: topology has no molecule information, skipping");
            self.state = State::Skipped(SkipReason::NoMolecules);
            return Ok(SetupOutcome::Skip(SkipReason::NoMolecules));
        }
        let declared = topology.box_type();
        let Some(path) = ImagingPath::select(declared, self.config.triclinic) else {
            log::warn!("autoimage: topology has no box information, skipping");
            self.state = State::Skipped(SkipReason::NoBox);
            return Ok(SetupOutcome::Skip(SkipReason::NoBox));
        };
        if declared == BoxType::TruncatedOctahedron && path == ImagingPath::TruncatedOctahedron {
            log::info!("autoimage: original box is truncated octahedron, turning on 'familiar'");
        }

        // A failed setup must not leave a stale classification behind.
        self.state = State::Unset;
        let classification = classify(topology, &self.config.masks(), evaluator, policy)?;
        log::debug!(
            "autoimage: {} anchor atoms, imaging path {:?}",
            classification.anchor.atoms.len(),
            path
        );

        self.state = State::Ready(Prepared {
            classification,
            path,
            n_atoms: topology.n_atoms(),
        });
        Ok(SetupOutcome::Ready)
    }

    /// Image one frame in place.
    ///
    /// `frame_index` is only used for log messages.
    pub fn process_frame(
        &self,
        frame_index: usize,
        frame: &mut Frame,
    ) -> Result<FrameOutcome, AutoImageError> {
        let prepared = match &self.state {
            State::Unset => return Err(AutoImageError::NotPrepared),
            State::Skipped(reason) => {
                return Ok(FrameOutcome::Skipped(FrameSkip::TopologySkipped(*reason)))
            }
            State::Ready(prepared) => prepared,
        };
        if frame.n_atoms() != prepared.n_atoms {
            return Err(AutoImageError::AtomCountMismatch {
                expected: prepared.n_atoms,
                found: frame.n_atoms(),
            });
        }

        let pbox = *frame.periodic_box();
        let Some(geometry) = BoxGeometry::resolve(prepared.path, &pbox) else {
            log::warn!(
                "autoimage: frame {} has a degenerate box {:?}, not imaging",
                frame_index + 1,
                pbox.lengths
            );
            return Ok(FrameOutcome::Skipped(FrameSkip::DegenerateBox {
                lengths: pbox.lengths,
            }));
        };

        let policy = self.config.centering();
        let classification = &prepared.classification;
        let target = anchor::center_anchor(
            frame,
            &classification.anchor,
            &geometry,
            policy.origin,
            policy.use_mass,
        );
        mobile::image_mobile(frame, &classification.mobile, &geometry, &policy);
        fixed::place_fixed(frame, &classification.fixed, &geometry, target, policy.use_mass);
        Ok(FrameOutcome::Modified)
    }

    /// Image a batch of independent frames in parallel.
    ///
    /// Outcomes are returned in input order and are identical to calling
    /// [`AutoImage::process_frame`] on each frame in turn.
    pub fn process_frames(&self, frames: &mut [Frame]) -> Result<Vec<FrameOutcome>, AutoImageError> {
        frames
            .par_iter_mut()
            .enumerate()
            .map(|(i, frame)| self.process_frame(i, frame))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MaskError;
    use crate::pbc::PeriodicBox;
    use crate::topology::MolecularTopology;

    fn topology(box_type: BoxType) -> MolecularTopology {
        // Solute of 2 atoms, then two single-atom ions.
        MolecularTopology::from_molecule_sizes(
            &[2, 1, 1],
            &[false, false, false],
            vec![1.0; 4],
            box_type,
        )
        .expect("valid topology")
    }

    fn frame(lengths: [f64; 3]) -> Frame {
        Frame::with_unit_masses(
            vec![
                [39.0, 15.0, 15.0],
                [41.0, 15.0, 15.0],
                [56.0, 2.0, 2.0],
                [20.0, 20.0, 20.0],
            ],
            PeriodicBox::orthogonal(lengths),
        )
    }

    #[test]
    fn test_config_builders() {
        let config = AutoImageConfig::default()
            .with_origin(true)
            .with_mass(true)
            .with_position(ImagePosition::FirstAtom)
            .with_triclinic(TriclinicMode::Familiar)
            .with_anchor("1-10")
            .with_fixed("11-20")
            .with_mobile("21-30");
        assert!(config.origin && config.use_mass);
        assert_eq!(config.position, ImagePosition::FirstAtom);
        assert_eq!(config.triclinic, TriclinicMode::Familiar);
        assert_eq!(config.anchor.as_deref(), Some("1-10"));
        assert_eq!(config.fixed.as_deref(), Some("11-20"));
        assert_eq!(config.mobile.as_deref(), Some("21-30"));
    }

    #[test]
    fn test_process_before_setup_fails() {
        let action = AutoImage::new(AutoImageConfig::default());
        let mut f = frame([30.0; 3]);
        assert!(matches!(
            action.process_frame(0, &mut f),
            Err(AutoImageError::NotPrepared)
        ));
    }

    #[test]
    fn test_setup_skips_topology_without_box() {
        let mut action = AutoImage::new(AutoImageConfig::default());
        let outcome = action.setup(&topology(BoxType::None)).expect("setup");
        assert_eq!(outcome, SetupOutcome::Skip(SkipReason::NoBox));

        let mut f = frame([30.0; 3]);
        let before = f.clone();
        let result = action.process_frame(0, &mut f).expect("process");
        assert_eq!(
            result,
            FrameOutcome::Skipped(FrameSkip::TopologySkipped(SkipReason::NoBox))
        );
        assert_eq!(f, before);
    }

    #[test]
    fn test_setup_skips_topology_without_molecules() {
        let empty = MolecularTopology::new(Vec::new(), Vec::new(), BoxType::Orthogonal)
            .expect("empty topology");
        let mut action = AutoImage::new(AutoImageConfig::default());
        assert_eq!(
            action.setup(&empty).expect("setup"),
            SetupOutcome::Skip(SkipReason::NoMolecules)
        );
    }

    #[test]
    fn test_truncated_octahedron_turns_on_familiar() {
        let mut action = AutoImage::new(AutoImageConfig::default());
        action
            .setup(&topology(BoxType::TruncatedOctahedron))
            .expect("setup");
        assert_eq!(action.imaging_path(), Some(ImagingPath::TruncatedOctahedron));

        let mut forced =
            AutoImage::new(AutoImageConfig::default().with_triclinic(TriclinicMode::Force));
        forced
            .setup(&topology(BoxType::TruncatedOctahedron))
            .expect("setup");
        assert_eq!(forced.imaging_path(), Some(ImagingPath::Triclinic));
    }

    #[test]
    fn test_empty_anchor_is_an_error() {
        let config = AutoImageConfig::default().with_anchor("1-4");
        let mut action = AutoImage::new(config);
        // Closure evaluator that never selects anything.
        let none = |_: &MolecularTopology, _: &str| -> Result<Vec<usize>, MaskError> {
            Ok(Vec::new())
        };
        let err = action
            .setup_with(&topology(BoxType::Orthogonal), &none, &SolventHeuristic)
            .unwrap_err();
        assert!(matches!(err, AutoImageError::EmptyAnchor { .. }));
        assert!(action.classification().is_none());
    }

    #[test]
    fn test_process_frame_images_around_anchor() {
        let mut action = AutoImage::new(AutoImageConfig::default());
        action.setup(&topology(BoxType::Orthogonal)).expect("setup");
        let mut f = frame([30.0; 3]);

        let outcome = action.process_frame(0, &mut f).expect("process");

        assert!(outcome.is_modified());
        // Anchor center (40,15,15) moves to the box center, shifting x by -25.
        assert_eq!(f.coords()[0], [14.0, 15.0, 15.0]);
        assert_eq!(f.coords()[1], [16.0, 15.0, 15.0]);
        // Ion at (31,2,2) after the shift wraps to (1,2,2).
        assert_eq!(f.coords()[2], [1.0, 2.0, 2.0]);
        // Ion at (-5,20,20) wraps to (25,20,20).
        assert_eq!(f.coords()[3], [25.0, 20.0, 20.0]);
    }

    #[test]
    fn test_degenerate_box_leaves_frame_untouched() {
        let mut action = AutoImage::new(AutoImageConfig::default());
        action.setup(&topology(BoxType::Orthogonal)).expect("setup");
        let mut f = frame([30.0, 0.0, 30.0]);
        let before = f.clone();

        let outcome = action.process_frame(4, &mut f).expect("process");

        assert_eq!(
            outcome,
            FrameOutcome::Skipped(FrameSkip::DegenerateBox {
                lengths: [30.0, 0.0, 30.0]
            })
        );
        assert_eq!(f, before);
    }

    #[test]
    fn test_atom_count_mismatch() {
        let mut action = AutoImage::new(AutoImageConfig::default());
        action.setup(&topology(BoxType::Orthogonal)).expect("setup");
        let mut f = Frame::with_unit_masses(vec![[0.0; 3]; 3], PeriodicBox::orthogonal([30.0; 3]));
        assert!(matches!(
            action.process_frame(0, &mut f),
            Err(AutoImageError::AtomCountMismatch {
                expected: 4,
                found: 3
            })
        ));
    }
}
