//! Crate-wide error taxonomy.

use std::io;
use thiserror::Error;

/// The reason a traversal walk stopped.
///
/// `WalkTerminated` is not fatal: it is the normal, expected way a
/// [`crate::traversal::Walker`] ends. Callers recover it locally and keep
/// scanning for the next start point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The current node has no outgoing edge in the requested color mask.
    DeadEnd,
    /// More than one candidate base was endorsed by an active link cursor.
    Ambiguous,
    /// The walk revisited a node already in the cycle-guard ring buffer.
    Cycle,
    /// No active link cursor endorsed any of the available successor bases.
    LinkExhausted,
}

/// Errors surfaced by the graph engine and its CLI front-ends.
#[derive(Error, Debug)]
pub enum GraphError {
    /// The hash table is full, or the advertised graph cannot fit the
    /// memory budget it was allocated from. Fatal per-command.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// A graph or link file failed to parse as the format it claims to be.
    #[error("malformed format: {0}")]
    FormatError(String),

    /// A read or write failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// CLI argument validation, unknown bases in strict mode, or mismatched
    /// k-mer sizes between a graph and a link file.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Normal, non-fatal termination signal of the traversal engine.
    #[error("walk terminated: {0:?}")]
    WalkTerminated(TerminationReason),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, GraphError>;

impl GraphError {
    /// True for the one error kind that callers are expected to recover
    /// from locally rather than propagate to the top-level command.
    pub fn is_walk_terminated(&self) -> bool {
        matches!(self, GraphError::WalkTerminated(_))
    }
}
