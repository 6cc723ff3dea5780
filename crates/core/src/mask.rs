//! Atom mask evaluation.
//!
//! The selection grammar is not part of this crate: any evaluator that maps
//! an expression to atom indices can be plugged in through [`MaskEvaluator`],
//! including a plain closure. [`AtomNumberMask`] is a minimal evaluator for
//! 1-based atom number lists such as `"1-20,35"`.

use crate::error::MaskError;
use crate::topology::Topology;

/// Maps a mask expression to 0-based atom indices for a topology.
pub trait MaskEvaluator<T: Topology + ?Sized> {
    fn evaluate(&self, topology: &T, expression: &str) -> Result<Vec<usize>, MaskError>;
}

impl<T, F> MaskEvaluator<T> for F
where
    T: Topology + ?Sized,
    F: Fn(&T, &str) -> Result<Vec<usize>, MaskError>,
{
    fn evaluate(&self, topology: &T, expression: &str) -> Result<Vec<usize>, MaskError> {
        self(topology, expression)
    }
}

/// Evaluator for comma- or whitespace-separated 1-based atom numbers and
/// inclusive ranges, e.g. `"1-20,35 40-42"`. `"*"` selects every atom.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomNumberMask;

impl<T: Topology + ?Sized> MaskEvaluator<T> for AtomNumberMask {
    fn evaluate(&self, topology: &T, expression: &str) -> Result<Vec<usize>, MaskError> {
        parse_atom_numbers(expression, topology.n_atoms())
    }
}

fn parse_atom_numbers(expression: &str, n_atoms: usize) -> Result<Vec<usize>, MaskError> {
    let syntax = |message: String| MaskError::Syntax {
        expression: expression.to_string(),
        message,
    };

    let mut selected = vec![false; n_atoms];
    for token in expression
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        if token == "*" {
            selected.fill(true);
            continue;
        }
        let (start, end) = match token.split_once('-') {
            Some((a, b)) => (parse_number(a, &syntax)?, parse_number(b, &syntax)?),
            None => {
                let n = parse_number(token, &syntax)?;
                (n, n)
            }
        };
        if end < start {
            return Err(syntax(format!("range '{}' is reversed", token)));
        }
        if end > n_atoms {
            return Err(MaskError::OutOfRange {
                expression: expression.to_string(),
                atom: end,
                n_atoms,
            });
        }
        selected[start - 1..end].fill(true);
    }

    Ok(selected
        .iter()
        .enumerate()
        .filter_map(|(i, &s)| s.then_some(i))
        .collect())
}

fn parse_number(token: &str, syntax: &impl Fn(String) -> MaskError) -> Result<usize, MaskError> {
    let n: usize = token
        .trim()
        .parse()
        .map_err(|_| syntax(format!("'{}' is not an atom number", token)))?;
    if n == 0 {
        return Err(syntax("atom numbers start at 1".to_string()));
    }
    Ok(n)
}

/// Sorted indices of every molecule containing at least one of `atoms`.
pub fn molecules_touched<T: Topology + ?Sized>(topology: &T, atoms: &[usize]) -> Vec<usize> {
    let mut touched = vec![false; topology.molecules().len()];
    for &atom in atoms {
        if let Some(mol) = topology.molecule_of_atom(atom) {
            touched[mol] = true;
        }
    }
    touched
        .iter()
        .enumerate()
        .filter_map(|(i, &t)| t.then_some(i))
        .collect()
}
