//! Error types for tape misuse.
//!
//! All misuse in this engine is a programmer mistake, not an operational
//! failure, so errors surface immediately at the call site. Operator
//! overloads cannot return `Result` and therefore panic with the matching
//! [`TapeError`] message; the fallible entry points return it directly.

use thiserror::Error;

use crate::tape::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TapeError {
    /// A binary operation received operands created on different tapes.
    /// Operand indices are only meaningful within a single arena.
    #[error("operands were created on different tapes")]
    TapeMismatch,

    /// A checked backward pass found a node that still carries a gradient
    /// from a previous pass. Gradients accumulate additively, so running
    /// backward again without zeroing first would silently mix in the stale
    /// contribution.
    #[error("node {id:?} still carries gradient {grad}; zero gradients before running backward again")]
    StaleGradient { id: NodeId, grad: f64 },

    /// A handle referred to a node removed by `Tape::truncate`. The id may
    /// since have been reissued to a newer node, so the access fails rather
    /// than aliasing it.
    #[error("node {id:?} was discarded by a tape truncation; the handle is no longer valid")]
    StaleHandle { id: NodeId },
}
