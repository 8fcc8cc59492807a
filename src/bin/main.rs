//! RSML Command Line Interface
//!
//! Trains AdaBoost models on CSV or LibSVM data and uses them to predict
//! labels and class probabilities.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info};
use rsml::api::{AdaBoostTrainer, EvaluationMetrics};
use rsml::core::{AdaBoostConfig, Matrix, MlError, Result, WeakLearnerType};
use rsml::data::{load_labels, save_labels, save_matrix, write_matrix, DataFormat};
use rsml::persistence::{self, Persist};
use rsml::{AdaBoostModel, CSVDataset, Dataset, LibSVMDataset};
use std::io;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "rsml")]
#[command(about = "AdaBoost.MH training and prediction")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "RSML Contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a new AdaBoost model
    Train(TrainArgs),
    /// Write class probabilities for test points
    PredictProba(PredictProbaArgs),
    /// Predict labels for test points
    Predict(PredictArgs),
    /// Evaluate a model on labelled test data
    Evaluate(EvaluateArgs),
    /// Display model information
    Info(InfoArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Training data file (LibSVM or CSV format)
    #[arg(long, short = 't')]
    training: PathBuf,

    /// Labels file; without it CSV labels are read from the last column
    #[arg(long, short = 'l')]
    labels: Option<PathBuf>,

    /// Output model file (.bin for binary, anything else JSON)
    #[arg(long = "output_model", visible_alias = "output-model", short = 'M')]
    output_model: PathBuf,

    /// Weak learner family
    #[arg(long = "weak_learner", visible_alias = "weak-learner", default_value = "decision_stump")]
    weak_learner: CliWeakLearner,

    /// Maximum boosting rounds
    #[arg(long, short = 'i', default_value = "1000")]
    iterations: usize,

    /// Stop when the weighted margin changes less than this
    #[arg(long, short = 'e', default_value = "1e-10")]
    tolerance: f64,

    /// Minimum number of points per decision stump leaf
    #[arg(long = "minimum_leaf_size", visible_alias = "minimum-leaf-size", default_value = "1")]
    minimum_leaf_size: usize,

    /// Maximum passes over the data for each perceptron
    #[arg(long = "perceptron_iterations", visible_alias = "perceptron-iterations", default_value = "1000")]
    perceptron_iterations: usize,

    /// Data format: auto, libsvm, or csv
    #[arg(short, long, default_value = "auto")]
    format: String,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliWeakLearner {
    /// One-level decision tree (default)
    #[value(name = "decision_stump")]
    DecisionStump,
    /// Multiclass perceptron
    #[value(name = "perceptron")]
    Perceptron,
}

impl From<CliWeakLearner> for WeakLearnerType {
    fn from(cli: CliWeakLearner) -> Self {
        match cli {
            CliWeakLearner::DecisionStump => WeakLearnerType::DecisionStump,
            CliWeakLearner::Perceptron => WeakLearnerType::Perceptron,
        }
    }
}

#[derive(Args)]
struct PredictProbaArgs {
    /// Test data file
    #[arg(long, short = 'T')]
    test: PathBuf,

    /// Trained model file
    #[arg(long = "input_model", visible_alias = "input-model", short = 'm')]
    input_model: PathBuf,

    /// Output probabilities file (prints to stdout if not specified)
    #[arg(long, short = 'P')]
    probabilities: Option<PathBuf>,

    /// Data format: auto, libsvm, or csv
    #[arg(short, long, default_value = "auto")]
    format: String,
}

#[derive(Args)]
struct PredictArgs {
    /// Test data file
    #[arg(long, short = 'T')]
    test: PathBuf,

    /// Trained model file
    #[arg(long = "input_model", visible_alias = "input-model", short = 'm')]
    input_model: PathBuf,

    /// Output predictions file (prints to stdout if not specified)
    #[arg(long, short = 'o')]
    predictions: Option<PathBuf>,

    /// Output probabilities file
    #[arg(long, short = 'P')]
    probabilities: Option<PathBuf>,

    /// Data format: auto, libsvm, or csv
    #[arg(short, long, default_value = "auto")]
    format: String,
}

#[derive(Args)]
struct EvaluateArgs {
    /// Test data file
    #[arg(long, short = 'T')]
    test: PathBuf,

    /// True labels; LibSVM test files may carry their own
    #[arg(long, short = 'l')]
    labels: Option<PathBuf>,

    /// Trained model file
    #[arg(long = "input_model", visible_alias = "input-model", short = 'm')]
    input_model: PathBuf,

    /// Data format: auto, libsvm, or csv
    #[arg(short, long, default_value = "auto")]
    format: String,
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    model: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::PredictProba(args) => predict_proba_command(args),
        Commands::Predict(args) => predict_command(args),
        Commands::Evaluate(args) => evaluate_command(args),
        Commands::Info(args) => info_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn train_command(args: TrainArgs) -> Result<()> {
    info!("Training AdaBoost model...");
    info!("Data file: {:?}", args.training);

    let dataset = load_training_data(&args)?;
    info!(
        "Loaded {} samples with {} dimensions",
        dataset.len(),
        dataset.dim()
    );

    let config = AdaBoostConfig {
        iterations: args.iterations,
        tolerance: args.tolerance,
        weak_learner: args.weak_learner.into(),
        minimum_leaf_size: args.minimum_leaf_size,
        perceptron_iterations: args.perceptron_iterations,
    };
    info!(
        "Parameters: weak_learner={}, iterations={}, tolerance={}",
        config.weak_learner.name(),
        config.iterations,
        config.tolerance
    );

    let model = AdaBoostTrainer::with_config(config).train(&dataset)?;
    info!(
        "Training completed with {} weak learners over {} classes",
        model.weak_learners(),
        model.num_classes()
    );

    persistence::save(&model, &args.output_model)?;
    info!("Model saved to: {:?}", args.output_model);

    // Quick evaluation on training data
    let metrics = rsml::api::evaluate(&model, &dataset)?;
    info!("Training accuracy: {:.2}%", metrics.accuracy() * 100.0);

    Ok(())
}

fn load_training_data(args: &TrainArgs) -> Result<CSVDataset> {
    let format = resolve_format(&args.format, &args.training)?;
    let (data, file_labels) = match format {
        DataFormat::LibSvm => {
            let dataset = LibSVMDataset::from_file(&args.training)?;
            (dataset.data().to_owned(), dataset.labels().map(<[f64]>::to_vec))
        }
        DataFormat::Csv if args.labels.is_some() => {
            (CSVDataset::from_file(&args.training)?.into_matrix(), None)
        }
        DataFormat::Csv => {
            let dataset = CSVDataset::from_file_with_labels(&args.training)?;
            (dataset.data().to_owned(), dataset.labels().map(<[f64]>::to_vec))
        }
    };

    let labels = match &args.labels {
        Some(path) => {
            info!("Loading labels from: {path:?}");
            load_labels(path)?
        }
        None => file_labels.ok_or_else(|| {
            MlError::InvalidDataset("training data has no labels".to_string())
        })?,
    };
    CSVDataset::from_matrix(data, Some(labels))
}

fn predict_proba_command(args: PredictProbaArgs) -> Result<()> {
    let model = load_model(&args.input_model)?;
    let (data, _) = load_test_data(&args.test, &args.format, &model)?;

    let probabilities = model.predict_proba(data.view())?;
    info!("Computed probabilities for {} points", probabilities.ncols());
    write_output(args.probabilities.as_deref(), &probabilities)
}

fn predict_command(args: PredictArgs) -> Result<()> {
    let model = load_model(&args.input_model)?;
    let (data, _) = load_test_data(&args.test, &args.format, &model)?;

    let (predictions, probabilities) = model.classify(data.view())?;
    info!("Predicted labels for {} points", predictions.len());

    match &args.predictions {
        Some(path) => {
            save_labels(path, &predictions)?;
            info!("Predictions saved to: {path:?}");
        }
        None => {
            for label in &predictions {
                println!("{label}");
            }
        }
    }
    if let Some(path) = &args.probabilities {
        save_matrix(path, probabilities.view())?;
        info!("Probabilities saved to: {path:?}");
    }
    Ok(())
}

fn evaluate_command(args: EvaluateArgs) -> Result<()> {
    let model = load_model(&args.input_model)?;
    let (data, file_labels) = load_test_data(&args.test, &args.format, &model)?;

    let labels = match (&args.labels, file_labels) {
        (Some(path), _) => load_labels(path)?,
        (None, Some(labels)) => labels,
        (None, None) => {
            return Err(MlError::InvalidParameter(
                "--labels is required for CSV test data".to_string(),
            ))
        }
    };

    let predictions = model.predict(data.view())?;
    let metrics = EvaluationMetrics::from_predictions(model.mappings(), &labels, &predictions)?;

    println!("=== Model Evaluation ===");
    print_model_summary(&model);

    println!("\nTest Results:");
    println!("  Points:   {}", metrics.total());
    println!("  Accuracy: {:.2}%", metrics.accuracy() * 100.0);

    println!("\nPer-class Metrics:");
    for (i, class) in metrics.classes.iter().enumerate() {
        println!(
            "  {class}: precision {:.4}, recall {:.4}, f1 {:.4}",
            metrics.precision(i),
            metrics.recall(i),
            metrics.f1_score(i)
        );
    }
    println!("  Macro F1: {:.4}", metrics.macro_f1());

    Ok(())
}

fn info_command(args: InfoArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let metadata = persistence::load_metadata(&args.model)?;
    metadata.print_summary();

    if metadata.kind == AdaBoostModel::KIND {
        let model: AdaBoostModel = persistence::load(&args.model)?;
        println!();
        print_model_summary(&model);

        println!("\nAlpha values:");
        let alphas = model.alphas();
        let n_show = alphas.len().min(10);
        for (t, alpha) in alphas.iter().enumerate().take(n_show) {
            println!("  α{t}: {alpha:.6}");
        }
        if alphas.len() > n_show {
            println!("  ... ({} more)", alphas.len() - n_show);
        }
    }

    Ok(())
}

fn print_model_summary(model: &AdaBoostModel) {
    println!("Dimensionality: {}", model.dimensionality());
    println!("Classes: {:?}", model.mappings());
    println!("Weak learner: {}", model.weak_learner_type().name());
    println!("Weak learners trained: {}", model.weak_learners());
    println!("Tolerance: {}", model.tolerance());
}

fn load_model(path: &Path) -> Result<AdaBoostModel> {
    info!("Loading model from: {path:?}");
    persistence::load(path)
}

/// Load test points and check them against the model dimensionality
/// Test points plus the labels a LibSVM file carries alongside them
fn load_test_data(
    path: &Path,
    format: &str,
    model: &AdaBoostModel,
) -> Result<(Matrix, Option<Vec<f64>>)> {
    info!("Loading test data from: {path:?}");
    let (data, labels) = match resolve_format(format, path)? {
        DataFormat::LibSvm => {
            let mut dataset = LibSVMDataset::from_file(path)?;
            if dataset.dim() < model.dimensionality() {
                // Trailing zero features are omitted by sparse files
                dataset = dataset.with_dimensionality(model.dimensionality())?;
            }
            (dataset.data().to_owned(), dataset.labels().map(<[f64]>::to_vec))
        }
        DataFormat::Csv => (CSVDataset::from_file(path)?.into_matrix(), None),
    };

    if data.nrows() != model.dimensionality() {
        return Err(MlError::InvalidDataset(format!(
            "Test data dimensionality ({}) must be the same as the model dimensionality ({})!",
            data.nrows(),
            model.dimensionality()
        )));
    }
    Ok((data, labels))
}

fn write_output(path: Option<&Path>, matrix: &Matrix) -> Result<()> {
    match path {
        Some(path) => {
            save_matrix(path, matrix.view())?;
            info!("Output saved to: {path:?}");
            Ok(())
        }
        None => write_matrix(io::stdout().lock(), matrix.view()),
    }
}

fn resolve_format(format: &str, path: &Path) -> Result<DataFormat> {
    if format == "auto" {
        Ok(DataFormat::detect(path))
    } else {
        format.parse()
    }
}
