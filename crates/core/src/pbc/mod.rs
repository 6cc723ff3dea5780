//! Periodic cell description and per-frame imaging geometry.
//!
//! - [`cell`]: box parameters, box type detection and the cell matrix
//! - [`geometry`]: the per-frame geometry the imaging stages dispatch on

pub mod cell;
pub mod geometry;

pub use cell::{BoxType, PeriodicBox, UnitCell};
pub use geometry::{BoxGeometry, ImagingPath, TriclinicMode};
