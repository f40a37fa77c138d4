use std::thread;

use digit_mlp::{Frame, Interrupter, Introspection, MlpBuilder, Step, TrainOptions};

fn main() -> digit_mlp::Result<()> {
    let xs = Frame::from_rows(&[[0.1_f32, 0.2, 0.3, 0.4], [0.9, 0.8, 0.7, 0.6]])?;
    let ys = Frame::from_rows(&[[1.0_f32, 0.0], [0.0, 1.0]])?;

    let mut mlp = MlpBuilder::new()
        .layer("input", 4)
        .layer("hidden", 3)
        .layer("output", 2)
        .learning_rate(0.5)
        .build_with_seed(0)?;

    let interrupter = Interrupter::new();
    let stopper = interrupter.clone();

    let mut hooks = Introspection::new().subscribe(move |step: &Step| {
        if step.loss < 0.01 {
            stopper.stop();
        }
    });
    let rx = hooks.channel();

    // A second subscriber on its own thread.
    let printer = thread::spawn(move || {
        for step in rx {
            if step.iteration % 100 == 0 {
                println!(
                    "epoch {:>4} example {} loss {:.5}",
                    step.epoch, step.example, step.loss
                );
            }
        }
    });

    let options = TrainOptions::new()
        .introspection(hooks)
        .interrupter(interrupter);
    match mlp.train_with(5000, &xs, &ys, options) {
        Ok(report) => println!("finished {} epochs", report.epochs),
        Err(digit_mlp::Error::Cancelled { epoch, example }) => {
            println!("loss target reached, stopped at epoch {epoch} example {example}")
        }
        Err(e) => return Err(e),
    }

    let _ = printer.join();
    println!("{} updates applied", mlp.updates());
    Ok(())
}
