//! Neuron, layer and multi-layer-perceptron composition.
//!
//! These are thin consumers of the autograd engine: they create parameter
//! leaves on a tape and compose the engine's operations. All gradient
//! machinery lives in `sg_core`.

use std::fmt;

use log::debug;
use rand::Rng;

use sg_core::{Tape, Value};

use crate::module::Module;

/// A single neuron: `relu(w · x + b)`, or the raw affine value when
/// `nonlin` is false.
pub struct Neuron {
    w: Vec<Value>,
    b: Value,
    nonlin: bool,
}

impl Neuron {
    /// Create a neuron with `nin` inputs. Weights are drawn uniformly from
    /// [-1, 1), the bias starts at zero.
    pub fn new(tape: &Tape, nin: usize, nonlin: bool) -> Self {
        let mut rng = rand::thread_rng();
        let w = (0..nin)
            .map(|_| tape.value(rng.gen_range(-1.0..1.0)))
            .collect();
        Neuron {
            w,
            b: tape.value(0.0),
            nonlin,
        }
    }

    pub fn forward(&self, x: &[Value]) -> Value {
        assert_eq!(x.len(), self.w.len(), "input size mismatch");

        let mut act = self.b.clone();
        for (wi, xi) in self.w.iter().zip(x) {
            act = act + wi * xi;
        }
        if self.nonlin {
            act.relu()
        } else {
            act
        }
    }
}

impl Module for Neuron {
    fn parameters(&self) -> Vec<Value> {
        let mut params = self.w.clone();
        params.push(self.b.clone());
        params
    }
}

impl fmt::Display for Neuron {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.nonlin { "ReLU" } else { "Linear" };
        write!(f, "{}Neuron({})", kind, self.w.len())
    }
}

/// A fully connected layer of neurons sharing the same input.
pub struct Layer {
    neurons: Vec<Neuron>,
}

impl Layer {
    pub fn new(tape: &Tape, nin: usize, nout: usize, nonlin: bool) -> Self {
        let neurons = (0..nout).map(|_| Neuron::new(tape, nin, nonlin)).collect();
        Layer { neurons }
    }

    pub fn forward(&self, x: &[Value]) -> Vec<Value> {
        self.neurons.iter().map(|n| n.forward(x)).collect()
    }
}

impl Module for Layer {
    fn parameters(&self) -> Vec<Value> {
        self.neurons.iter().flat_map(|n| n.parameters()).collect()
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let neurons: Vec<String> = self.neurons.iter().map(|n| n.to_string()).collect();
        write!(f, "Layer of [{}]", neurons.join(", "))
    }
}

/// A multi-layer perceptron. Hidden layers use ReLU; the output layer is
/// linear.
pub struct Mlp {
    layers: Vec<Layer>,
}

impl Mlp {
    /// Build an MLP taking `nin` inputs, with one layer per entry of
    /// `nouts`. `Mlp::new(&tape, 2, &[4, 4, 1])` is a 2-4-4-1 network.
    pub fn new(tape: &Tape, nin: usize, nouts: &[usize]) -> Self {
        let sizes: Vec<usize> = std::iter::once(nin).chain(nouts.iter().copied()).collect();
        let layers = (0..nouts.len())
            .map(|i| Layer::new(tape, sizes[i], sizes[i + 1], i != nouts.len() - 1))
            .collect();

        let mlp = Mlp { layers };
        debug!(
            "initialized MLP {} with {} parameters",
            mlp,
            mlp.parameters().len()
        );
        mlp
    }

    pub fn forward(&self, x: &[Value]) -> Vec<Value> {
        let mut out = x.to_vec();
        for layer in &self.layers {
            out = layer.forward(&out);
        }
        out
    }
}

impl Module for Mlp {
    fn parameters(&self) -> Vec<Value> {
        self.layers.iter().flat_map(|l| l.parameters()).collect()
    }
}

impl fmt::Display for Mlp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layers: Vec<String> = self.layers.iter().map(|l| l.to_string()).collect();
        write!(f, "MLP of [{}]", layers.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(tape: &Tape, xs: &[f64]) -> Vec<Value> {
        xs.iter().map(|&x| tape.value(x)).collect()
    }

    #[test]
    fn test_neuron_parameter_count_and_order() {
        let tape = Tape::new();
        let n = Neuron::new(&tape, 3, true);

        let params = n.parameters();
        assert_eq!(params.len(), 4); // 3 weights + bias
        assert_eq!(params[3].value(), 0.0); // bias last, initialized to zero
    }

    #[test]
    fn test_neuron_forward_with_fixed_weights() {
        let tape = Tape::new();
        let n = Neuron::new(&tape, 2, true);

        let params = n.parameters();
        params[0].set_value(1.0);
        params[1].set_value(-2.0);
        params[2].set_value(0.5);

        let out = n.forward(&values(&tape, &[3.0, 1.0]));
        assert!((out.value() - 1.5).abs() < 1e-10); // relu(3 - 2 + 0.5)

        let out = n.forward(&values(&tape, &[-3.0, 1.0]));
        assert_eq!(out.value(), 0.0); // relu(-4.5)
    }

    #[test]
    fn test_linear_neuron_can_go_negative() {
        let tape = Tape::new();
        let n = Neuron::new(&tape, 1, false);

        let params = n.parameters();
        params[0].set_value(-2.0);
        params[1].set_value(0.0);

        let out = n.forward(&values(&tape, &[3.0]));
        assert!((out.value() - (-6.0)).abs() < 1e-10);
    }

    #[test]
    fn test_mlp_shapes_and_parameter_count() {
        let tape = Tape::new();
        let model = Mlp::new(&tape, 2, &[4, 4, 1]);

        // 4*(2+1) + 4*(4+1) + 1*(4+1)
        assert_eq!(model.parameters().len(), 37);

        let out = model.forward(&values(&tape, &[1.0, -1.0]));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_zero_grad_clears_all_parameters() {
        let tape = Tape::new();
        let model = Mlp::new(&tape, 2, &[3, 1]);

        let out = model.forward(&values(&tape, &[0.5, -0.5]));
        out[0].backward();
        model.zero_grad();

        assert!(model.parameters().iter().all(|p| p.grad() == 0.0));
    }

    #[test]
    fn test_display_reprs() {
        let tape = Tape::new();
        let n = Neuron::new(&tape, 2, true);
        assert_eq!(n.to_string(), "ReLUNeuron(2)");

        let model = Mlp::new(&tape, 2, &[2, 1]);
        assert_eq!(
            model.to_string(),
            "MLP of [Layer of [ReLUNeuron(2), ReLUNeuron(2)], Layer of [LinearNeuron(2)]]"
        );
    }
}
