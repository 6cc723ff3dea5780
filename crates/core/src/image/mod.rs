//! The three per-frame imaging stages, in the order they run:
//!
//! 1. [`anchor`]: translate the whole frame so the anchor sits on the target point
//! 2. [`mobile`]: wrap each mobile molecule into the primary cell
//! 3. [`fixed`]: attach each fixed molecule to its nearest placed neighbour

pub mod anchor;
pub mod fixed;
pub mod mobile;

/// Which point of a mobile molecule decides its image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImagePosition {
    /// The molecule's center (mass-weighted or geometric).
    #[default]
    Center,
    /// The molecule's first atom.
    FirstAtom,
}

/// Centering choices shared by all stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CenteringPolicy {
    /// Target the coordinate origin instead of the box center.
    pub origin: bool,
    /// Mass-weighted instead of geometric centers.
    pub use_mass: bool,
    /// Reference point for mobile molecules.
    pub position: ImagePosition,
}
