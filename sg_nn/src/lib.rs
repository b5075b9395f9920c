//! # sg_nn - Neural Network Building Blocks for sg_core
//!
//! Thin composition layers over the scalar autograd engine:
//!
//! - **Layers**: [`Neuron`], [`Layer`], [`Mlp`]
//! - **Loss**: [`mse_loss`]
//! - **Optimizer**: [`Sgd`] (with optional momentum)
//!
//! Everything here builds graphs out of `sg_core` operations and drives the
//! engine's backward pass; none of it carries gradient logic of its own.
//!
//! ## Example: one training step
//!
//! ```
//! use sg_core::Tape;
//! use sg_nn::{mse_loss, Mlp, Module, Sgd};
//!
//! let tape = Tape::new();
//! let model = Mlp::new(&tape, 2, &[4, 1]);
//! let params = model.parameters();
//! let mut opt = Sgd::new(0.05);
//!
//! // Interior graph nodes created past this point are per-iteration garbage.
//! let mark = tape.mark();
//!
//! let x = vec![tape.value(2.0), tape.value(3.0)];
//! let pred = model.forward(&x);
//! let loss = mse_loss(&pred, &[1.0]);
//!
//! model.zero_grad();
//! loss.backward();
//! opt.step(&params);
//! tape.truncate(mark);
//! ```

mod layers;
mod loss;
mod module;
mod optim;

pub use layers::{Layer, Mlp, Neuron};
pub use loss::mse_loss;
pub use module::Module;
pub use optim::Sgd;
