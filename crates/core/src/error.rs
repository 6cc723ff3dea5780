//! Error types for setup, mask evaluation and AMBER file parsing.

use thiserror::Error;

/// Errors raised while evaluating an atom mask expression.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MaskError {
    /// The expression could not be parsed by the evaluator.
    #[error("invalid mask expression '{expression}': {message}")]
    Syntax { expression: String, message: String },

    /// The expression named an atom that does not exist in the topology.
    #[error("atom {atom} in mask '{expression}' is out of range (topology has {n_atoms} atoms)")]
    OutOfRange {
        expression: String,
        atom: usize,
        n_atoms: usize,
    },

    /// Any other evaluator failure, for evaluators plugged in by callers.
    #[error("{0}")]
    Other(String),
}

/// Fatal setup errors. The action cannot run on the current topology.
///
/// Non-fatal conditions (a topology without molecules or box, a frame with
/// a degenerate box) are reported as outcomes instead, see
/// [`crate::autoimage::SetupOutcome`] and [`crate::autoimage::FrameOutcome`].
#[derive(Error, Debug)]
pub enum AutoImageError {
    /// The anchor mask resolved to zero atoms.
    #[error("no atoms selected for anchor by mask '{mask}'")]
    EmptyAnchor { mask: String },

    /// A mask expression failed to evaluate.
    #[error(transparent)]
    Mask(#[from] MaskError),

    /// Classification needs at least one molecule.
    #[error("topology does not contain molecule information")]
    NoMolecules,

    /// A frame does not match the topology the action was set up for.
    #[error("frame has {found} atoms but the topology has {expected}")]
    AtomCountMismatch { expected: usize, found: usize },

    /// Frames were handed to the action before a successful setup.
    #[error("autoimage has not been set up for a topology")]
    NotPrepared,
}

/// Errors raised while reading AMBER topology or coordinate files.
#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("missing section: {0}")]
    MissingSection(String),

    #[error("failed to parse {what}: {message}")]
    Parse { what: String, message: String },

    #[error("invalid topology: {0}")]
    Invalid(String),
}

impl TopologyError {
    pub(crate) fn parse(what: impl Into<String>, message: impl ToString) -> Self {
        TopologyError::Parse {
            what: what.into(),
            message: message.to_string(),
        }
    }
}
