//! AMBER file format parsers.
//!
//! Provides native Rust readers for AMBER topology and coordinate files:
//! - PRMTOP: molecule layout, solvent flags, masses and declared box
//! - INPCRD/RST7: one frame of coordinates with its box

pub mod inpcrd;
pub mod prmtop;

pub use inpcrd::{parse_inpcrd, parse_inpcrd_str, AmberCoordinates};
pub use prmtop::{parse_prmtop, parse_prmtop_str, AmberTopology};
