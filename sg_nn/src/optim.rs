//! Gradient descent optimizers.

use std::collections::HashMap;

use sg_core::{NodeId, Value};

/// Stochastic gradient descent with optional momentum.
///
/// The caller is responsible for zeroing parameter gradients before each
/// backward pass; `step` only consumes whatever gradient the parameters
/// currently carry.
pub struct Sgd {
    pub lr: f64,
    pub momentum: f64,
    /// Velocity buffers keyed by parameter node id.
    velocities: HashMap<NodeId, f64>,
}

impl Sgd {
    pub fn new(lr: f64) -> Self {
        Sgd {
            lr,
            momentum: 0.0,
            velocities: HashMap::new(),
        }
    }

    pub fn with_momentum(lr: f64, momentum: f64) -> Self {
        Sgd {
            lr,
            momentum,
            velocities: HashMap::new(),
        }
    }

    /// Update every parameter in place from its accumulated gradient.
    pub fn step(&mut self, params: &[Value]) {
        for p in params {
            let grad = p.grad();
            let update = if self.momentum > 0.0 {
                // v = momentum * v + grad; param -= lr * v
                let v = self.velocities.entry(p.id()).or_insert(0.0);
                *v = self.momentum * *v + grad;
                *v
            } else {
                grad
            };
            p.set_value(p.value() - self.lr * update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use sg_core::Tape;

    #[test]
    fn test_vanilla_step() {
        let tape = Tape::new();
        let w = tape.value(1.0);
        let x = tape.value(3.0);

        (&w * &x).backward(); // dw = 3
        let mut opt = Sgd::new(0.1);
        opt.step(&[w.clone()]);

        assert_abs_diff_eq!(w.value(), 0.7, epsilon = 1e-10);
    }

    #[test]
    fn test_momentum_accumulates_velocity() {
        let tape = Tape::new();
        let w = tape.value(0.0);
        let x = tape.value(1.0);
        let mut opt = Sgd::with_momentum(0.1, 0.5);
        let mark = tape.mark();

        // Constant gradient of 1 each step: velocities are 1, then 1.5.
        tape.truncate(mark);
        w.zero_grad();
        (&w * &x).backward();
        opt.step(&[w.clone()]);
        assert_abs_diff_eq!(w.value(), -0.1, epsilon = 1e-10);

        tape.truncate(mark);
        w.zero_grad();
        (&w * &x).backward();
        opt.step(&[w.clone()]);
        assert_abs_diff_eq!(w.value(), -0.25, epsilon = 1e-10);
    }
}
