//! Training demo: fit a small MLP to a four-point dataset with plain SGD.
//!
//! Run with `cargo run --example train`.

use sg_core::Tape;
use sg_nn::{mse_loss, Mlp, Module, Sgd};

fn main() {
    let data: [(&[f64; 2], f64); 4] = [
        (&[2.0, 3.0], 1.0),
        (&[3.0, -1.0], -1.0),
        (&[1.0, 1.0], 1.0),
        (&[2.0, -2.0], -1.0),
    ];

    let tape = Tape::new();
    let model = Mlp::new(&tape, 2, &[4, 1]);
    let params = model.parameters();
    let mut opt = Sgd::new(0.05);

    println!("model: {}", model);
    println!("{} trainable parameters\n", params.len());

    // Parameters are the only nodes that survive an iteration; everything
    // past this mark is rebuilt fresh each epoch.
    let mark = tape.mark();

    for epoch in 0..200 {
        tape.truncate(mark);

        let mut preds = Vec::new();
        let mut targets = Vec::new();
        for (x, y) in &data {
            let inputs: Vec<_> = x.iter().map(|&v| tape.value(v)).collect();
            preds.push(model.forward(&inputs).remove(0));
            targets.push(*y);
        }
        let loss = mse_loss(&preds, &targets);

        model.zero_grad();
        loss.backward();
        opt.step(&params);

        if epoch % 20 == 0 || epoch == 199 {
            println!("epoch {:3}: loss = {:.6}", epoch, loss.value());
        }
    }

    println!("\npredictions after training:");
    tape.truncate(mark);
    for (x, y) in &data {
        let inputs: Vec<_> = x.iter().map(|&v| tape.value(v)).collect();
        let pred = model.forward(&inputs).remove(0);
        println!("  {:?} -> {:+.4} (target {:+})", x, pred.value(), y);
    }
}
