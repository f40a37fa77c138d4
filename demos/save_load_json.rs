use digit_mlp::{Frame, Mlp, MlpBuilder};

fn main() -> digit_mlp::Result<()> {
    let xs = Frame::from_rows(&[[0.1_f32, 0.2, 0.3, 0.4], [0.4, 0.3, 0.2, 0.1]])?;
    let ys = Frame::from_rows(&[[1.0_f32, 0.0], [0.0, 1.0]])?;

    let mut mlp = MlpBuilder::new()
        .layer("input", 4)
        .layer("hidden", 3)
        .layer("output", 2)
        .learning_rate(0.5)
        .build_with_seed(0)?;
    mlp.train(100, &xs, &ys)?;

    let path = std::env::temp_dir().join("digit_mlp_demo_model.json");
    mlp.save_json(&path)?;
    let loaded = Mlp::load_json(&path)?;

    assert_eq!(loaded.predict(&xs)?, mlp.predict(&xs)?);
    println!(
        "round-tripped {} layers after {} updates via {}",
        loaded.num_layers(),
        loaded.updates(),
        path.display()
    );
    Ok(())
}
