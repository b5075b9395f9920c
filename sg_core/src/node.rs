//! The public handle to a graph node and its operation surface.
//!
//! [`Value`] pairs a shared reference to the tape arena with the index of one
//! node. Handles are clone-cheap and immutable in structure: an operation
//! never touches its operands, it only appends a new node recording them.
//!
//! Arithmetic is exposed through `std::ops` overloads for every combination
//! of references, owned values and raw `f64` on either side, mirroring how
//! plain numbers mix with nodes in expressions like `2.0 * &x + 1.0`. A raw
//! float is lifted into a leaf node on the other operand's tape. Anything
//! that is neither a `Value` nor an `f64` is rejected at compile time, as is
//! a graph-node exponent for [`Value::powf`].

use std::fmt;
use std::rc::Rc;

use crate::backward::{propagate, topo_order};
use crate::error::TapeError;
use crate::tape::{Node, NodeId, NodeStore, Op, Tape, TapeInner};

/// Handle to a scalar node in the computation graph.
///
/// Reading [`Value::value`] and [`Value::grad`] is always allowed; the
/// gradient is only populated by a backward pass.
///
/// A handle outlives its node only if the client truncates the tape past it;
/// every access through such a stale handle panics (see [`Tape::truncate`]).
#[derive(Clone)]
pub struct Value {
    pub(crate) inner: Rc<NodeStore>,
    pub(crate) id: NodeId,
    pub(crate) generation: u64,
}

impl Value {
    /// The scalar result of the operation that created this node.
    pub fn value(&self) -> f64 {
        let inner = self.inner.borrow();
        self.slot(&inner).value
    }

    /// The gradient of the last backward root with respect to this node.
    ///
    /// Zero until a backward pass has run. Accumulates across passes unless
    /// reset via [`Value::zero_grad`].
    pub fn grad(&self) -> f64 {
        let inner = self.inner.borrow();
        self.slot(&inner).grad
    }

    /// This node's id on its tape.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The operation that produced this node (diagnostic only).
    pub fn op(&self) -> Op {
        let inner = self.inner.borrow();
        self.slot(&inner).op
    }

    /// Overwrite the stored scalar, e.g. for an optimizer update on a
    /// parameter leaf. Downstream nodes built from the old value are not
    /// recomputed; rebuild the graph to see the change.
    pub fn set_value(&self, value: f64) {
        let mut inner = self.inner.borrow_mut();
        self.slot_mut(&mut inner).value = value;
    }

    /// Reset this node's gradient to zero.
    pub fn zero_grad(&self) {
        let mut inner = self.inner.borrow_mut();
        self.slot_mut(&mut inner).grad = 0.0;
    }

    /// Rectified linear unit: `max(0, self)`.
    ///
    /// The backward rule gates on the output value, so an input of exactly
    /// zero produces output zero and propagates zero gradient.
    pub fn relu(&self) -> Value {
        let v = self.value();
        let out = if v < 0.0 { 0.0 } else { v };
        self.unary(out, Op::Relu)
    }

    /// Raise to a fixed power: `self^exponent`.
    ///
    /// The exponent is a plain float, not a graph node; differentiating with
    /// respect to it is unsupported and cannot be expressed.
    pub fn powf(&self, exponent: f64) -> Value {
        self.unary(self.value().powf(exponent), Op::Pow { exponent })
    }

    /// Run reverse-mode backpropagation from this node.
    ///
    /// Seeds this node's gradient to exactly 1 and applies every reachable
    /// node's local gradient rule once, in reverse topological order, adding
    /// each contribution into the operand's gradient.
    ///
    /// # Stale gradients
    ///
    /// Contributions are *added*. If any reachable node still carries a
    /// gradient from an earlier pass, the result silently includes it. Zero
    /// gradients between passes (see [`zero_grad`](crate::zero_grad)), or use
    /// [`Value::try_backward`] to have this condition rejected.
    pub fn backward(&self) {
        let mut inner = self.inner.borrow_mut();
        self.slot(&inner);
        let order = topo_order(&inner.nodes, self.id);
        propagate(&mut inner.nodes, &order, self.id);
    }

    /// Like [`Value::backward`], but refuses to run if any reachable node
    /// already carries a non-zero gradient.
    pub fn try_backward(&self) -> Result<(), TapeError> {
        let mut inner = self.inner.borrow_mut();
        self.slot(&inner);
        let order = topo_order(&inner.nodes, self.id);
        for &id in &order {
            let grad = inner.nodes[id.index()].grad;
            if grad != 0.0 {
                return Err(TapeError::StaleGradient { id, grad });
            }
        }
        propagate(&mut inner.nodes, &order, self.id);
        Ok(())
    }

    /// Lift a raw float into a leaf node on this value's tape.
    fn lift(&self, value: f64) -> Value {
        self.push(value, Op::Leaf, vec![])
    }

    fn unary(&self, value: f64, op: Op) -> Value {
        self.push(value, op, vec![self.id])
    }

    fn binary(&self, rhs: &Value, value: f64, op: Op) -> Value {
        if !Rc::ptr_eq(&self.inner, &rhs.inner) {
            panic!("{}", TapeError::TapeMismatch);
        }
        self.push(value, op, vec![self.id, rhs.id])
    }

    fn push(&self, value: f64, op: Op, operands: Vec<NodeId>) -> Value {
        let tape = Tape {
            inner: Rc::clone(&self.inner),
        };
        let (id, generation) = tape.push(value, op, operands);
        Value {
            inner: tape.inner,
            id,
            generation,
        }
    }

    /// Resolve this handle's slot, panicking if the node was discarded by a
    /// truncation (including when its id has been reissued since).
    fn slot<'a>(&self, inner: &'a TapeInner) -> &'a Node {
        match inner.nodes.get(self.id.index()) {
            Some(node) if node.generation == self.generation => node,
            _ => panic!("{}", TapeError::StaleHandle { id: self.id }),
        }
    }

    fn slot_mut<'a>(&self, inner: &'a mut TapeInner) -> &'a mut Node {
        match inner.nodes.get_mut(self.id.index()) {
            Some(node) if node.generation == self.generation => node,
            _ => panic!("{}", TapeError::StaleHandle { id: self.id }),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value(data={}, grad={})", self.value(), self.grad())
    }
}

/// Reset the gradient of every value in the collection to zero.
///
/// Must run before each new backward pass over reused nodes (typically the
/// model parameters); the additive accumulation of the backward pass makes
/// this mandatory, not optional.
pub fn zero_grad(values: &[Value]) {
    for v in values {
        v.zero_grad();
    }
}

// === Operator overloads ===
//
// Add and Mul are the primitive graph operations. Neg, Sub and Div are
// derived compositions, so their gradients fall out of the primitives:
//   -a    =  a * -1
//   a - b =  a + (-b)
//   a / b =  a * b^-1

impl std::ops::Add for &Value {
    type Output = Value;

    fn add(self, rhs: &Value) -> Value {
        self.binary(rhs, self.value() + rhs.value(), Op::Add)
    }
}

impl std::ops::Add<Value> for &Value {
    type Output = Value;

    fn add(self, rhs: Value) -> Value {
        self + &rhs
    }
}

impl std::ops::Add<&Value> for Value {
    type Output = Value;

    fn add(self, rhs: &Value) -> Value {
        &self + rhs
    }
}

impl std::ops::Add for Value {
    type Output = Value;

    fn add(self, rhs: Value) -> Value {
        &self + &rhs
    }
}

impl std::ops::Mul for &Value {
    type Output = Value;

    fn mul(self, rhs: &Value) -> Value {
        self.binary(rhs, self.value() * rhs.value(), Op::Mul)
    }
}

impl std::ops::Mul<Value> for &Value {
    type Output = Value;

    fn mul(self, rhs: Value) -> Value {
        self * &rhs
    }
}

impl std::ops::Mul<&Value> for Value {
    type Output = Value;

    fn mul(self, rhs: &Value) -> Value {
        &self * rhs
    }
}

impl std::ops::Mul for Value {
    type Output = Value;

    fn mul(self, rhs: Value) -> Value {
        &self * &rhs
    }
}

impl std::ops::Neg for &Value {
    type Output = Value;

    fn neg(self) -> Value {
        self * &self.lift(-1.0)
    }
}

impl std::ops::Neg for Value {
    type Output = Value;

    fn neg(self) -> Value {
        -&self
    }
}

impl std::ops::Sub for &Value {
    type Output = Value;

    fn sub(self, rhs: &Value) -> Value {
        self + (-rhs)
    }
}

impl std::ops::Sub<Value> for &Value {
    type Output = Value;

    fn sub(self, rhs: Value) -> Value {
        self - &rhs
    }
}

impl std::ops::Sub<&Value> for Value {
    type Output = Value;

    fn sub(self, rhs: &Value) -> Value {
        &self - rhs
    }
}

impl std::ops::Sub for Value {
    type Output = Value;

    fn sub(self, rhs: Value) -> Value {
        &self - &rhs
    }
}

impl std::ops::Div for &Value {
    type Output = Value;

    fn div(self, rhs: &Value) -> Value {
        self * rhs.powf(-1.0)
    }
}

impl std::ops::Div<Value> for &Value {
    type Output = Value;

    fn div(self, rhs: Value) -> Value {
        self / &rhs
    }
}

impl std::ops::Div<&Value> for Value {
    type Output = Value;

    fn div(self, rhs: &Value) -> Value {
        &self / rhs
    }
}

impl std::ops::Div for Value {
    type Output = Value;

    fn div(self, rhs: Value) -> Value {
        &self / &rhs
    }
}

// === Mixed Value / f64 forms ===

impl std::ops::Add<f64> for &Value {
    type Output = Value;

    fn add(self, rhs: f64) -> Value {
        self + &self.lift(rhs)
    }
}

impl std::ops::Add<f64> for Value {
    type Output = Value;

    fn add(self, rhs: f64) -> Value {
        &self + rhs
    }
}

impl std::ops::Add<&Value> for f64 {
    type Output = Value;

    fn add(self, rhs: &Value) -> Value {
        rhs + self
    }
}

impl std::ops::Add<Value> for f64 {
    type Output = Value;

    fn add(self, rhs: Value) -> Value {
        &rhs + self
    }
}

impl std::ops::Sub<f64> for &Value {
    type Output = Value;

    fn sub(self, rhs: f64) -> Value {
        self - &self.lift(rhs)
    }
}

impl std::ops::Sub<f64> for Value {
    type Output = Value;

    fn sub(self, rhs: f64) -> Value {
        &self - rhs
    }
}

impl std::ops::Sub<&Value> for f64 {
    type Output = Value;

    fn sub(self, rhs: &Value) -> Value {
        rhs.lift(self) - rhs
    }
}

impl std::ops::Sub<Value> for f64 {
    type Output = Value;

    fn sub(self, rhs: Value) -> Value {
        self - &rhs
    }
}

impl std::ops::Mul<f64> for &Value {
    type Output = Value;

    fn mul(self, rhs: f64) -> Value {
        self * &self.lift(rhs)
    }
}

impl std::ops::Mul<f64> for Value {
    type Output = Value;

    fn mul(self, rhs: f64) -> Value {
        &self * rhs
    }
}

impl std::ops::Mul<&Value> for f64 {
    type Output = Value;

    fn mul(self, rhs: &Value) -> Value {
        rhs * self
    }
}

impl std::ops::Mul<Value> for f64 {
    type Output = Value;

    fn mul(self, rhs: Value) -> Value {
        &rhs * self
    }
}

impl std::ops::Div<f64> for &Value {
    type Output = Value;

    fn div(self, rhs: f64) -> Value {
        self / &self.lift(rhs)
    }
}

impl std::ops::Div<f64> for Value {
    type Output = Value;

    fn div(self, rhs: f64) -> Value {
        &self / rhs
    }
}

impl std::ops::Div<&Value> for f64 {
    type Output = Value;

    fn div(self, rhs: &Value) -> Value {
        rhs.lift(self) / rhs
    }
}

impl std::ops::Div<Value> for f64 {
    type Output = Value;

    fn div(self, rhs: Value) -> Value {
        self / &rhs
    }
}

#[cfg(test)]
mod tests {
    use crate::Tape;

    #[test]
    fn test_debug_repr_shows_data_and_grad() {
        let tape = Tape::new();
        let x = tape.value(2.0);
        let y = &x * &x;
        y.backward();

        assert_eq!(format!("{:?}", x), "Value(data=2, grad=4)");
        assert_eq!(format!("{:?}", y), "Value(data=4, grad=1)");
    }

    #[test]
    fn test_operations_do_not_touch_gradients() {
        let tape = Tape::new();
        let x = tape.value(2.0);
        let y = tape.value(3.0);

        let _ = &x + &y;
        let _ = &x * &y;
        let _ = x.relu();
        let _ = x.powf(2.0);

        assert_eq!(x.grad(), 0.0);
        assert_eq!(y.grad(), 0.0);
    }

    #[test]
    fn test_set_value_leaves_graph_alone() {
        let tape = Tape::new();
        let x = tape.value(1.0);
        let y = &x * 3.0;

        x.set_value(5.0);
        assert_eq!(x.value(), 5.0);
        // y was computed from the old value and is not recomputed.
        assert_eq!(y.value(), 3.0);
    }

    #[test]
    #[should_panic(expected = "discarded by a tape truncation")]
    fn test_stale_handle_cannot_write_through_reissued_id() {
        let tape = Tape::new();
        let mark = tape.mark();
        let x = tape.value(2.0);

        tape.truncate(mark);
        let y = tape.value(99.0);

        // x's id now belongs to y; writing through the stale handle must
        // fail loudly instead of clobbering y.
        x.set_value(-7.0);
        let _ = y.value();
    }

    #[test]
    #[should_panic(expected = "discarded by a tape truncation")]
    fn test_backward_from_stale_root_panics() {
        let tape = Tape::new();
        let w = tape.value(1.0);
        let mark = tape.mark();
        let loss = &w * &w;

        tape.truncate(mark);
        let _replacement = tape.value(5.0);
        loss.backward();
    }

    #[test]
    #[should_panic(expected = "different tapes")]
    fn test_cross_tape_operands_panic() {
        let a = Tape::new().value(1.0);
        let b = Tape::new().value(2.0);
        let _ = &a + &b;
    }
}
