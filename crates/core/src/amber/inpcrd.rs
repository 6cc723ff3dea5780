//! AMBER inpcrd/rst7 coordinate file parser.
//!
//! Reads one frame of atomic positions (Angstrom), optional velocities and
//! the optional box line from an ASCII coordinate or restart file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{AutoImageError, TopologyError};
use crate::frame::Frame;
use crate::pbc::PeriodicBox;
use crate::topology::Topology;

/// Width of one value in the 6F12.7 layout.
const FIELD_WIDTH: usize = 12;
const VALUES_PER_LINE: usize = 6;

/// Parsed AMBER coordinate data.
#[derive(Debug, Clone, PartialEq)]
pub struct AmberCoordinates {
    /// Title line
    pub title: String,
    /// Number of atoms
    pub n_atoms: usize,
    /// Simulation time from the header, if present
    pub time: Option<f64>,
    /// Atomic coordinates in Angstrom
    pub positions: Vec<[f64; 3]>,
    /// Velocities, present in restart files
    pub velocities: Option<Vec<[f64; 3]>>,
    /// Box lengths and angles, if present
    pub periodic_box: Option<PeriodicBox>,
}

impl AmberCoordinates {
    /// Build a [`Frame`] from these coordinates with masses from `topology`.
    ///
    /// A file without a box line gives a frame with an empty box, which
    /// the imaging action skips.
    pub fn to_frame<T: Topology + ?Sized>(&self, topology: &T) -> Result<Frame, AutoImageError> {
        Frame::from_topology(
            self.positions.clone(),
            topology,
            self.periodic_box.unwrap_or_default(),
        )
    }
}

/// Split one line into 12-character numeric fields. A trailing partial
/// field is read as whitespace-separated values.
fn parse_fields(line: &str, out: &mut Vec<f64>) -> Result<(), TopologyError> {
    let mut pos = 0;
    while pos + FIELD_WIDTH <= line.len() {
        let field = line
            .get(pos..pos + FIELD_WIDTH)
            .ok_or_else(|| TopologyError::parse("inpcrd", "non-ASCII coordinate line"))?
            .trim();
        if !field.is_empty() {
            out.push(
                field
                    .parse()
                    .map_err(|e| TopologyError::parse(format!("coordinate '{}'", field), e))?,
            );
        }
        pos += FIELD_WIDTH;
    }
    if let Some(rest) = line.get(pos..) {
        for word in rest.split_whitespace() {
            out.push(
                word.parse()
                    .map_err(|e| TopologyError::parse(format!("coordinate '{}'", word), e))?,
            );
        }
    }
    Ok(())
}

fn to_triples(values: &[f64]) -> Vec<[f64; 3]> {
    values.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect()
}

fn read_coordinates<R: BufRead>(reader: R, path: &str) -> Result<AmberCoordinates, TopologyError> {
    let io_err = |source| TopologyError::Io {
        path: path.to_string(),
        source,
    };
    let mut lines = reader.lines();

    let title = lines
        .next()
        .ok_or_else(|| TopologyError::Invalid("empty coordinate file".to_string()))?
        .map_err(io_err)?
        .trim_end()
        .to_string();

    let header = lines
        .next()
        .ok_or_else(|| TopologyError::Invalid("missing atom count line".to_string()))?
        .map_err(io_err)?;
    let mut words = header.split_whitespace();
    let n_atoms: usize = words
        .next()
        .ok_or_else(|| TopologyError::Invalid("no atom count found".to_string()))?
        .parse()
        .map_err(|e| TopologyError::parse("atom count", e))?;
    let time = match words.next() {
        Some(word) => Some(word.parse().map_err(|e| TopologyError::parse("time", e))?),
        None => None,
    };

    let n_values = n_atoms
        .checked_mul(3)
        .ok_or_else(|| TopologyError::Invalid(format!("atom count {} is too large", n_atoms)))?;
    // Grown from file content; the header count is not trusted for allocation.
    let mut coords: Vec<f64> = Vec::new();
    while coords.len() < n_values {
        let line = match lines.next() {
            Some(line) => line.map_err(io_err)?,
            None => break,
        };
        parse_fields(&line, &mut coords)?;
    }
    if coords.len() < n_values {
        return Err(TopologyError::Invalid(format!(
            "expected {} coordinate values, found {}",
            n_values,
            coords.len()
        )));
    }
    coords.truncate(n_values);

    let mut trailing = Vec::new();
    for line in lines {
        let line = line.map_err(io_err)?;
        if !line.trim().is_empty() {
            trailing.push(line);
        }
    }

    // Velocities take as many lines as coordinates; the box is one line.
    let velocity_lines = n_values.div_ceil(VALUES_PER_LINE);
    let (velocity_block, box_line) = if trailing.len() == velocity_lines + 1 {
        (Some(&trailing[..velocity_lines]), trailing.last())
    } else if trailing.len() == 1 {
        (None, trailing.last())
    } else if trailing.len() == velocity_lines {
        (Some(&trailing[..]), None)
    } else {
        if !trailing.is_empty() {
            log::warn!(
                "ignoring {} unexpected trailing lines in coordinate file",
                trailing.len()
            );
        }
        (None, None)
    };

    let velocities = match velocity_block {
        Some(block) => {
            let mut values = Vec::new();
            for line in block {
                parse_fields(line, &mut values)?;
            }
            if values.len() < n_values {
                return Err(TopologyError::Invalid(format!(
                    "expected {} velocity values, found {}",
                    n_values,
                    values.len()
                )));
            }
            Some(to_triples(&values[..n_values]))
        }
        None => None,
    };

    let periodic_box = match box_line {
        Some(line) => {
            let mut values = Vec::with_capacity(6);
            parse_fields(line, &mut values)?;
            match values.len() {
                n if n >= 6 => Some(PeriodicBox::new(
                    [values[0], values[1], values[2]],
                    [values[3], values[4], values[5]],
                )),
                n if n >= 3 => Some(PeriodicBox::orthogonal([values[0], values[1], values[2]])),
                n => {
                    return Err(TopologyError::Invalid(format!(
                        "box line has {} values, expected 3 or 6",
                        n
                    )))
                }
            }
        }
        None => None,
    };

    Ok(AmberCoordinates {
        title,
        n_atoms,
        time,
        positions: to_triples(&coords),
        velocities,
        periodic_box,
    })
}

/// Parse an AMBER inpcrd/rst7 coordinate file.
///
/// # Format
/// Line 1: Title
/// Line 2: Number of atoms (and optionally time)
/// Lines 3+: Coordinates in 12.7f format, 6 values per line
/// Optional: Velocities in the same layout
/// Optional last line: Box lengths and angles
///
/// # Arguments
/// * `path` - Path to the inpcrd file
///
/// # Returns
/// * `Ok(AmberCoordinates)` - Parsed coordinates in Angstrom
/// * `Err(TopologyError)` - I/O failure or malformed data
pub fn parse_inpcrd<P: AsRef<Path>>(path: P) -> Result<AmberCoordinates, TopologyError> {
    let display = path.as_ref().display().to_string();
    let file = File::open(path.as_ref()).map_err(|source| TopologyError::Io {
        path: display.clone(),
        source,
    })?;
    read_coordinates(BufReader::new(file), &display)
}

/// Parse coordinate text already held in memory.
pub fn parse_inpcrd_str(text: &str) -> Result<AmberCoordinates, TopologyError> {
    read_coordinates(text.as_bytes(), "<memory>")
}
