//! Reverse-mode backpropagation.
//!
//! The backward pass runs in two steps:
//! 1. A depth-first post-order traversal from the root collects every
//!    reachable node exactly once, yielding a topological order in which a
//!    node always appears after its operands.
//! 2. The order is walked in reverse. By then a node's gradient has received
//!    every downstream contribution, so its local rule can dispatch on the
//!    op tag and add the scaled contributions into its operands' gradients.

use log::trace;

use crate::tape::{Node, NodeId, Op};

/// Topological order of the nodes reachable from `root`, operands first.
///
/// Iterative post-order traversal: the work stack carries (node, index of
/// the next operand to descend into), and a node is emitted only once all of
/// its operands have been. An explicit stack keeps deep chains of sequential
/// operations from exhausting the call stack.
pub(crate) fn topo_order(nodes: &[Node], root: NodeId) -> Vec<NodeId> {
    let mut visited = vec![false; nodes.len()];
    let mut order = Vec::new();
    let mut stack = vec![(root, 0usize)];
    visited[root.index()] = true;

    while let Some((id, next)) = stack.pop() {
        match nodes[id.index()].operands.get(next) {
            Some(&operand) => {
                stack.push((id, next + 1));
                if !visited[operand.index()] {
                    visited[operand.index()] = true;
                    stack.push((operand, 0));
                }
            }
            None => order.push(id),
        }
    }

    order
}

/// Seed the root's gradient to 1 and apply every node's local gradient rule
/// once, in reverse topological order.
///
/// Gradients of nodes other than the root are not reset here; contributions
/// are added on top of whatever the node already carries.
pub(crate) fn propagate(nodes: &mut [Node], order: &[NodeId], root: NodeId) {
    trace!("backward pass over {} nodes", order.len());

    // Chain rule seed: d(root)/d(root) = 1.
    nodes[root.index()].grad = 1.0;

    for &id in order.iter().rev() {
        let g = nodes[id.index()].grad;
        if g == 0.0 {
            continue;
        }

        let op = nodes[id.index()].op;
        match op {
            Op::Leaf => {}
            Op::Add => {
                let (a, b) = two_operands(nodes, id);
                nodes[a.index()].grad += g;
                nodes[b.index()].grad += g;
            }
            Op::Mul => {
                let (a, b) = two_operands(nodes, id);
                let a_val = nodes[a.index()].value;
                let b_val = nodes[b.index()].value;
                nodes[a.index()].grad += b_val * g;
                nodes[b.index()].grad += a_val * g;
            }
            Op::Pow { exponent } => {
                let a = one_operand(nodes, id);
                let a_val = nodes[a.index()].value;
                nodes[a.index()].grad += exponent * a_val.powf(exponent - 1.0) * g;
            }
            Op::Relu => {
                // Gate on the output value, not the input's sign. Equivalent
                // for ReLU itself, but the output is what downstream nodes
                // actually saw.
                let a = one_operand(nodes, id);
                if nodes[id.index()].value > 0.0 {
                    nodes[a.index()].grad += g;
                }
            }
        }
    }
}

fn one_operand(nodes: &[Node], id: NodeId) -> NodeId {
    nodes[id.index()].operands[0]
}

fn two_operands(nodes: &[Node], id: NodeId) -> (NodeId, NodeId) {
    let operands = &nodes[id.index()].operands;
    (operands[0], operands[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tape;

    #[test]
    fn test_topo_order_puts_operands_first() {
        let tape = Tape::new();
        let x = tape.value(1.0);
        let y = tape.value(2.0);
        let z = &x + &y;

        let inner = tape.inner.borrow();
        let order = topo_order(&inner.nodes, z.id());

        assert_eq!(order.len(), 3);
        assert_eq!(*order.last().unwrap(), z.id());

        let pos = |id: NodeId| order.iter().position(|&o| o == id).unwrap();
        assert!(pos(x.id()) < pos(z.id()));
        assert!(pos(y.id()) < pos(z.id()));
    }

    #[test]
    fn test_topo_order_visits_shared_node_once() {
        let tape = Tape::new();
        let x = tape.value(1.0);
        let z = &x * &x;

        let inner = tape.inner.borrow();
        let order = topo_order(&inner.nodes, z.id());

        // Two unique nodes even though x appears as both operands.
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn test_topo_order_ignores_unreachable_nodes() {
        let tape = Tape::new();
        let x = tape.value(1.0);
        let _unrelated = tape.value(7.0);
        let z = x.relu();

        let inner = tape.inner.borrow();
        let order = topo_order(&inner.nodes, z.id());
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn test_backward_simple_add() {
        let tape = Tape::new();
        let x = tape.value(2.0);
        let y = tape.value(3.0);
        let z = &x + &y;

        z.backward();
        assert_eq!(x.grad(), 1.0);
        assert_eq!(y.grad(), 1.0);
        assert_eq!(z.grad(), 1.0);
    }

    #[test]
    fn test_backward_chain() {
        // z = (x + 1)^2, dz/dx = 2(x + 1)
        let tape = Tape::new();
        let x = tape.value(2.0);
        let z = (&x + 1.0).powf(2.0);

        z.backward();
        assert!((x.grad() - 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_backward_handles_deep_chains() {
        // Tens of thousands of sequential ops; must not blow the stack.
        let tape = Tape::new();
        let x = tape.value(3.0);

        let mut v = x.clone();
        for _ in 0..50_000 {
            v = &v + 1.0;
        }
        assert_eq!(v.value(), 3.0 + 50_000.0);

        v.backward();
        assert_eq!(x.grad(), 1.0);
    }

    #[test]
    fn test_backward_leaves_unreachable_gradients_alone() {
        let tape = Tape::new();
        let x = tape.value(2.0);
        let other = tape.value(5.0);
        let z = &x * 4.0;

        z.backward();
        assert_eq!(x.grad(), 4.0);
        assert_eq!(other.grad(), 0.0);
    }
}
