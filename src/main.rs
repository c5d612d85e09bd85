use mimic_classifier::config::Config;
use mimic_classifier::dataset::{load_csv, ColumnData};
use mimic_classifier::workflow::{sample_rows, train, train_and_save};
use mimic_classifier::Predictor;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(
    name = "mimic-classifier",
    about = "Train and apply an SVM cancer classifier on the MIMIC-II catheter cohort",
    long_about = "Cleans, imputes (KNN) and min-max scales the cohort table, trains \
                 support-vector classifiers with optional grid search and SMOTE, and \
                 applies the saved artifacts to new rows."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit preprocessing, run all experiments and write the artifacts
    #[command(about = "Train and save artifacts (outputs: preprocessing bundle, model, report)")]
    Train {
        /// Path to the cohort CSV
        #[arg(long)]
        data: PathBuf,

        /// TOML configuration; defaults are used when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for the artifacts
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Apply saved artifacts to raw rows
    #[command(about = "Predict with a saved preprocessing bundle and model")]
    Predict {
        /// Path to the CSV with rows to classify
        #[arg(long)]
        data: PathBuf,

        /// Preprocessing bundle written by `train`
        #[arg(long, default_value = "MIMIC_Cancer_Classifier_Preprocessing.bin")]
        bundle: PathBuf,

        /// Model artifact written by `train`
        #[arg(long, default_value = "MIMIC_Cancer_Classifier_Model.bin")]
        model: PathBuf,

        /// Only classify a random window of this many consecutive rows
        #[arg(long, value_name = "N")]
        sample: Option<usize>,

        /// Seed for choosing the sample window
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Run the experiments and print their reports without writing anything
    Evaluate {
        /// Path to the cohort CSV
        #[arg(long)]
        data: PathBuf,

        /// TOML configuration; defaults are used when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the default configuration as TOML
    DefaultConfig,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Train {
            data,
            config,
            out_dir,
        } => train_command(&data, config.as_deref(), &out_dir),
        Commands::Predict {
            data,
            bundle,
            model,
            sample,
            seed,
        } => predict_command(&data, &bundle, &model, sample, seed),
        Commands::Evaluate { data, config } => evaluate_command(&data, config.as_deref()),
        Commands::DefaultConfig => Config::default()
            .to_toml_string()
            .map(|text| print!("{text}"))
            .map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    })
}

fn train_command(
    data: &Path,
    config: Option<&Path>,
    out_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    println!("Loading cohort from: {}", data.display());
    let table = load_csv(data)?;
    println!("Loaded {} rows x {} columns", table.n_rows(), table.n_columns());

    let outcome = train_and_save(&table, &config, out_dir)?;
    for report in outcome.reports() {
        println!(
            "{}: accuracy {:.3} on {} held-out rows",
            report.name, report.evaluation.accuracy, report.n_test
        );
    }

    let paths = config.artifacts.under(out_dir);
    println!("Preprocessing bundle saved to: {}", paths.bundle.display());
    println!(
        "Model ({}) saved to: {}",
        config.training.persist,
        paths.model.display()
    );
    println!("Report saved to: {}", paths.report.display());
    Ok(())
}

fn predict_command(
    data: &Path,
    bundle: &Path,
    model: &Path,
    sample: Option<usize>,
    seed: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let predictor = Predictor::load(bundle, model)?;
    let table = load_csv(data)?;

    let (table, offset) = match sample {
        Some(n) => {
            let (rows, range) = sample_rows(&table, n, seed)?;
            println!("Sampled rows {}..{}", range.start, range.end);
            (rows, range.start)
        }
        None => (table, 0),
    };

    let predictions = predictor.predict(&table)?;
    let label = &predictor.preprocessor().cleaner().config().label_column;
    let truth = table
        .column(label)
        .and_then(|column| match &column.data {
            ColumnData::Numeric(values) => Some(values.clone()),
            ColumnData::Text(_) => None,
        });

    for (i, prediction) in predictions.iter().enumerate() {
        match &truth {
            Some(values) => println!(
                "row {}: predicted {} (actual {})",
                offset + i,
                prediction,
                values[i]
            ),
            None => println!("row {}: predicted {}", offset + i, prediction),
        }
    }
    Ok(())
}

fn evaluate_command(data: &Path, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    let table = load_csv(data)?;
    let outcome = train(&table, &config)?;

    for report in outcome.reports() {
        println!("== {} ==", report.name);
        if let Some(gamma) = report.gamma {
            println!("C = {}, gamma = {}", report.c, gamma);
        } else {
            println!("C = {}", report.c);
        }
        if let Some(score) = report.cv_score {
            println!("Best cross-validation accuracy: {:.4}", score);
        }
        println!("Confusion matrix:\n{}", report.evaluation.confusion_matrix);
        println!("{}", report.evaluation);
    }
    Ok(())
}
