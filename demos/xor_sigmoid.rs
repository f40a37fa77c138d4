use digit_mlp::metrics::classify;
use digit_mlp::{Frame, MlpBuilder, Shuffle, TrainOptions};

fn main() -> digit_mlp::Result<()> {
    let xs = Frame::from_rows(&[
        [0.0_f32, 0.0],
        [0.0, 1.0],
        [1.0, 0.0],
        [1.0, 1.0],
    ])?;
    // One-hot: class 0 = "off", class 1 = "on".
    let ys = Frame::from_rows(&[[1.0_f32, 0.0], [0.0, 1.0], [0.0, 1.0], [1.0, 0.0]])?;

    let mut mlp = MlpBuilder::new()
        .layer("input", 2)
        .layer("hidden", 8)
        .layer("output", 2)
        .learning_rate(0.5)
        .build_with_seed(0)?;

    let report = mlp.train_with(
        2000,
        &xs,
        &ys,
        TrainOptions::new().shuffle(Shuffle::Seeded(0)),
    )?;
    println!(
        "trained {} epochs ({} updates), final loss {:?}",
        report.epochs, report.steps, report.final_loss
    );

    let preds = mlp.predict(&xs)?;
    for (x, y) in xs.rows().zip(preds.rows()) {
        println!("{x:?} -> {y:.3?} class {:?}", classify(y));
    }

    let eval = mlp.evaluate(&xs, &ys)?;
    println!("accuracy {:.2}, loss {:.4}", eval.accuracy, eval.loss);
    Ok(())
}
