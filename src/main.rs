use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use digit_mlp::config::{NetworkConfig, load_config};
use digit_mlp::metrics::classify;
use digit_mlp::mnist::MnistDataset;
use digit_mlp::{Frame, Mlp, Shuffle, TrainOptions, digit_image};

/// Train a digit classifier on MNIST and recognize a hand-drawn 28x28 PNG.
#[derive(Parser, Debug)]
#[command(name = "digit-mlp", version, about)]
struct Cli {
    /// Directory containing the MNIST training data as .gz files
    #[arg(long, default_value = "testdata/mnist")]
    data_dir: PathBuf,

    /// 28 x 28 PNG file to evaluate
    #[arg(long)]
    image: Option<PathBuf>,

    /// Number of training examples to use, at most 60,000
    #[arg(long, default_value_t = 20_000)]
    data_size: usize,

    /// Passes over the training data
    #[arg(long, default_value_t = 5)]
    epochs: usize,

    /// JSON network config; defaults to 784-100-10 with learning rate 0.1
    #[arg(long)]
    config: Option<PathBuf>,

    /// Load a trained model instead of training
    #[arg(long)]
    load: Option<PathBuf>,

    /// Save the model after training
    #[arg(long)]
    save: Option<PathBuf>,

    /// Seed for weight initialization and shuffling (overrides the config)
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("digit_mlp=info")),
        )
        .init();

    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let Some(image) = cli.image.as_deref() else {
        println!("Please provide a file name of 28 x 28 PNG file to evaluate with flag --image");
        return Ok(());
    };

    let mlp = match cli.load.as_deref() {
        Some(path) => Mlp::load_json(path)
            .with_context(|| format!("loading model from {}", path.display()))?,
        None => train(&cli)?,
    };

    if let Some(path) = cli.save.as_deref() {
        mlp.save_json(path)
            .with_context(|| format!("saving model to {}", path.display()))?;
    }

    println!("Reading the image file {}", image.display());
    let pixels = digit_image::load_png(image)
        .with_context(|| format!("reading digit image {}", image.display()))?;
    let frame = Frame::single(pixels)?;

    let predicted = mlp.predict(&frame)?;
    let probabilities = predicted.row(0);

    println!("Probability vector");
    for (i, p) in probabilities.iter().enumerate() {
        println!("{i} -> {p:.6}");
    }

    match classify(probabilities) {
        Some(digit) => println!("\nDetected digit is {digit}"),
        None => println!("Cannot identify the digit!"),
    }
    Ok(())
}

fn train(cli: &Cli) -> Result<Mlp> {
    let config = match cli.config.as_deref() {
        Some(path) => load_config(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => NetworkConfig::default(),
    };
    let seed = cli.seed.or(config.seed);

    let builder = config.builder()?;
    let mut mlp = match seed {
        Some(seed) => builder.build_with_seed(seed)?,
        None => builder.build()?,
    };

    let mut data = MnistDataset::read(&cli.data_dir)
        .with_context(|| format!("reading MNIST data from {}", cli.data_dir.display()))?;
    data.truncate_train(cli.data_size);

    let options = TrainOptions::new().shuffle(seed.map_or(Shuffle::None, Shuffle::Seeded));
    let started = Instant::now();
    let report = mlp
        .train_with(cli.epochs, &data.train.inputs, &data.train.labels, options)
        .context("training the network")?;
    tracing::info!(
        examples = data.train.len(),
        epochs = report.epochs,
        elapsed = ?started.elapsed(),
        "training finished"
    );

    if let Some(test) = &data.test {
        let eval = mlp.evaluate(&test.inputs, &test.labels)?;
        tracing::info!(
            examples = test.len(),
            accuracy = eval.accuracy,
            loss = eval.loss,
            "test set evaluated"
        );
    }
    Ok(mlp)
}
