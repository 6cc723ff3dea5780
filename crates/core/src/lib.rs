//! Core library for rust-autoimage.
//!
//! Pure Rust implementation with no Python dependencies.
//! Re-centers molecular dynamics frames on an anchor molecule and images
//! the remaining molecules around it: fixed molecules by a nearest-image
//! search that keeps assemblies together, mobile molecules (solvent, ions)
//! by wrapping into the primary cell. Orthogonal, general triclinic and
//! truncated octahedron cells are supported. AMBER topology and coordinate
//! readers are included.

pub mod amber;
pub mod autoimage;
pub mod classify;
pub mod error;
pub mod frame;
pub mod image;
pub mod mask;
pub mod pbc;
pub mod topology;
pub mod util;

pub use autoimage::{
    AutoImage, AutoImageConfig, FrameOutcome, FrameSkip, SetupOutcome, SkipReason,
};
pub use classify::{
    classify, AnchorRegion, Classification, ClassificationPolicy, ExplicitMolecules,
    MoleculeRole, RegionMasks, SolventHeuristic,
};
pub use error::{AutoImageError, MaskError, TopologyError};
pub use frame::Frame;
pub use image::{CenteringPolicy, ImagePosition};
pub use mask::{AtomNumberMask, MaskEvaluator};
pub use pbc::{BoxGeometry, BoxType, ImagingPath, PeriodicBox, TriclinicMode, UnitCell};
pub use topology::{AtomRange, MolecularTopology, Molecule, Topology};
