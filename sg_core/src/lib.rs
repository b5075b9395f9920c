//! # sg_core - Scalar Reverse-mode Automatic Differentiation
//!
//! A minimal reverse-mode autodiff engine over scalar values. Client code
//! composes arithmetic on [`Value`] handles, which records a computation
//! graph on a [`Tape`] as a side effect; a single call to [`Value::backward`]
//! then computes the exact partial derivative of that value with respect to
//! every node it was built from.
//!
//! ## Quick Start
//!
//! ```
//! use sg_core::Tape;
//!
//! let tape = Tape::new();
//! let x = tape.value(2.0);
//! let w = tape.value(-3.0);
//! let b = tape.value(10.0);
//!
//! // A single neuron: out = relu(x * w + b)
//! let out = (&x * &w + &b).relu();
//! assert_eq!(out.value(), 4.0);
//!
//! out.backward();
//! assert_eq!(x.grad(), -3.0); // d(out)/dx = w
//! assert_eq!(w.grad(), 2.0);  // d(out)/dw = x
//! assert_eq!(b.grad(), 1.0);
//! ```
//!
//! ## Supported Operations
//!
//! | Category | Operations |
//! |----------|------------|
//! | Arithmetic | `+`, `-`, `*`, `/`, unary `-` (mixing `Value` and `f64` freely) |
//! | Power | [`Value::powf`] (x^c for constant c) |
//! | Activation | [`Value::relu`] |
//!
//! `-`, `/` and unary negation are derived from addition, multiplication and
//! `powf`, so the whole gradient calculus rests on three primitive rules.
//!
//! ## Architecture
//!
//! - **[`Tape`]**: arena owning all nodes of a graph; operands are indices,
//!   and the graph is acyclic by construction because a node can only refer
//!   to nodes that already exist.
//! - **[`Value`]**: clone-cheap handle to one node; exposes `value`, `grad`
//!   and the operation surface.
//! - **[`finite_diff_grad`]**: numerical cross-check for analytic gradients.
//!
//! ## Gradient accumulation
//!
//! Gradients *accumulate* across backward passes. When nodes are reused
//! between passes (model parameters in a training loop), call
//! [`zero_grad`] first, or the new gradients silently include the old ones.
//! [`Value::try_backward`] turns that hazard into a hard error. Throwaway
//! intermediate nodes are better discarded wholesale via [`Tape::mark`] /
//! [`Tape::truncate`] between iterations.
//!
//! The engine is single-threaded: handles are reference-counted and
//! deliberately not `Send`.

mod backward;
mod error;
mod finite_diff;
mod node;
mod tape;

pub use error::TapeError;
pub use finite_diff::{finite_diff_grad, max_grad_error};
pub use node::{zero_grad, Value};
pub use tape::{NodeId, Op, Tape};
