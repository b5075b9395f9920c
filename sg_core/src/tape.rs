//! Arena storage for the computation graph.
//!
//! All nodes of a graph live in a single growable `Vec` owned by a [`Tape`].
//! Operands are referenced by index ([`NodeId`]) rather than by pointer, which
//! keeps the shared-subexpression DAG trivial to own: the whole graph is one
//! allocation arena, dropped en masse when the tape goes away.
//!
//! Because nodes are appended one at a time and an operation can only refer to
//! nodes that already exist, every operand id is strictly smaller than the id
//! of the node that uses it. The graph is acyclic by construction.
//!
//! Truncation frees ids for reuse, so the tape also carries a generation
//! counter, bumped whenever nodes are discarded. Each node and each handle is
//! stamped with the generation it was created under; a handle whose stamp no
//! longer matches its slot refers to a discarded node and every access to it
//! panics instead of aliasing whatever node now occupies the id.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::node::Value;

/// Index of a node on its tape.
///
/// Ids are only meaningful relative to the tape that issued them. They are
/// stable for the lifetime of the node and usable as map keys (e.g. for
/// per-parameter optimizer state).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// The operation that produced a node.
///
/// This tag replaces the per-node backward closure of a callback-style
/// implementation: the backward pass dispatches on it to compute the local
/// gradient contributions. It also serves as a diagnostic label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    /// A raw value created directly by the client; no operands, no gradient flow.
    Leaf,
    /// operands[0] + operands[1]
    Add,
    /// operands[0] * operands[1]
    Mul,
    /// operands[0] raised to a fixed exponent. The exponent is an ordinary
    /// float, never a graph node, so differentiating with respect to it is
    /// inexpressible.
    Pow { exponent: f64 },
    /// max(0, operands[0])
    Relu,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Leaf => write!(f, "leaf"),
            Op::Add => write!(f, "+"),
            Op::Mul => write!(f, "*"),
            Op::Pow { exponent } => write!(f, "**{}", exponent),
            Op::Relu => write!(f, "ReLU"),
        }
    }
}

/// A single vertex of the computation graph.
///
/// `value` is fixed at construction. `grad` starts at zero and only ever
/// accumulates via `+=` during backward passes, until the client explicitly
/// zeroes it again. `generation` records which truncation epoch the node was
/// created under, so stale handles to a reissued id can be told apart.
#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) value: f64,
    pub(crate) grad: f64,
    pub(crate) op: Op,
    pub(crate) operands: Vec<NodeId>,
    pub(crate) generation: u64,
}

#[derive(Default)]
pub(crate) struct TapeInner {
    pub(crate) nodes: Vec<Node>,
    pub(crate) generation: u64,
}

pub(crate) type NodeStore = RefCell<TapeInner>;

/// Owner of a computation graph.
///
/// A `Tape` is a cheaply clonable handle to the shared node arena; every
/// [`Value`] created on it keeps the arena alive. Tapes are single-threaded
/// (`!Send`) by design: gradient accumulation is not synchronized.
///
/// # Example
///
/// ```
/// use sg_core::Tape;
///
/// let tape = Tape::new();
/// let x = tape.value(2.0);
/// let y = &x * &x + 1.0;
/// assert_eq!(y.value(), 5.0);
/// ```
#[derive(Clone, Default)]
pub struct Tape {
    pub(crate) inner: Rc<NodeStore>,
}

impl Tape {
    pub fn new() -> Self {
        Tape::default()
    }

    /// Create a leaf node holding `value`, with gradient zero.
    pub fn value(&self, value: f64) -> Value {
        let (id, generation) = self.push(value, Op::Leaf, vec![]);
        Value {
            inner: Rc::clone(&self.inner),
            id,
            generation,
        }
    }

    /// Number of nodes currently on the tape.
    pub fn len(&self) -> usize {
        self.inner.borrow().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().nodes.is_empty()
    }

    /// Record a watermark for a later [`Tape::truncate`].
    ///
    /// The usual pattern is to create all parameter nodes first, take a mark,
    /// and truncate back to it after each training step so the interior of
    /// the loss graph is discarded wholesale.
    pub fn mark(&self) -> usize {
        self.len()
    }

    /// Drop every node created after `mark`.
    ///
    /// Any [`Value`] handle pointing at a discarded node is invalidated;
    /// touching one afterwards panics, even once its id has been reissued to
    /// a node created later. Nodes at or below the mark (typically
    /// parameters) keep their values and accumulated gradients, and their
    /// handles stay valid.
    pub fn truncate(&self, mark: usize) {
        let mut inner = self.inner.borrow_mut();
        if mark < inner.nodes.len() {
            inner.nodes.truncate(mark);
            // Freed ids will be reissued; stamp later nodes differently so
            // stale handles fail instead of aliasing them.
            inner.generation += 1;
        }
    }

    pub(crate) fn push(&self, value: f64, op: Op, operands: Vec<NodeId>) -> (NodeId, u64) {
        let mut inner = self.inner.borrow_mut();
        let generation = inner.generation;
        let id = NodeId(inner.nodes.len());
        inner.nodes.push(Node {
            value,
            grad: 0.0,
            op,
            operands,
            generation,
        });
        (id, generation)
    }
}
