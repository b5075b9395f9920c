//! Common behaviour for anything that owns trainable parameters.

use sg_core::Value;

/// A piece of a network that exposes its trainable parameters.
pub trait Module {
    /// All trainable parameter nodes, in a stable order.
    fn parameters(&self) -> Vec<Value>;

    /// Reset every parameter's gradient to zero.
    ///
    /// Call once per training iteration before the backward pass; gradients
    /// accumulate additively otherwise.
    fn zero_grad(&self) {
        for p in self.parameters() {
            p.zero_grad();
        }
    }
}
