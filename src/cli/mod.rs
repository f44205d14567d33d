//! Command-line interface
//!
//! Three commands: `train` a model from a prepared dataset directory,
//! `serve` the latest persisted model, and `seed` a model directory with a
//! deployment-marked fallback model.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::data::load_dataset;
use crate::persist::{save_model, ModelArtifact};
use crate::resolve::synthesize_fallback;
use crate::tracking::ExperimentTracker;
use crate::training::{train_model, ModelFamily, ModelParams};

#[derive(Parser)]
#[command(name = "tabflow")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tabular classification training and model serving")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a model on a prepared dataset directory
    Train {
        /// Dataset directory containing X_train.csv, y_train.csv, X_test.csv, y_test.csv
        #[arg(short = 'd', long = "data_dir")]
        data_dir: PathBuf,

        /// Directory to save the trained model into
        #[arg(short = 'm', long = "model_dir")]
        model_dir: PathBuf,

        /// Model family: xgboost, lgbm, random_forest, svm, logistic_regression
        #[arg(short = 'n', long = "model_name", default_value = "xgboost")]
        model_name: String,

        /// Model hyperparameters as a JSON object
        #[arg(short = 'p', long)]
        params: Option<String>,

        /// Timestamp tag for the saved model file
        #[arg(short = 't', long)]
        timestamp: String,
    },

    /// Serve the latest persisted model over HTTP
    Serve {
        /// Server port
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Server host
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Directory searched for persisted models
        #[arg(short = 'm', long = "model_dir", default_value = "models")]
        model_dir: PathBuf,
    },

    /// Write a deployment-marked fallback model into a model directory
    Seed {
        /// Target model directory
        #[arg(short = 'm', long = "model_dir", default_value = "models")]
        model_dir: PathBuf,
    },
}

fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}

pub fn cmd_train(
    data_dir: &Path,
    model_dir: &Path,
    model_name: &str,
    params_json: Option<&str>,
    timestamp: &str,
) -> anyhow::Result<()> {
    let family = ModelFamily::parse(model_name)?;
    let params = match params_json {
        Some(raw) => ModelParams::from_json_str(raw)?,
        None => ModelParams::new(),
    };

    let dataset = load_dataset(data_dir)?;
    let tracker = ExperimentTracker::from_env()?;

    let (classifier, accuracy) = train_model(&dataset, family, &params, &tracker)?;

    let artifact = ModelArtifact::new(classifier, Some(dataset.feature_names.clone()));
    let path = save_model(&artifact, model_dir, model_name, timestamp)?;

    info!("Model training and saving completed successfully");

    println!();
    println!("  {:<12} {}", muted("Model"), model_name.white().bold());
    println!(
        "  {:<12} {}",
        muted("Accuracy"),
        format!("{:.4}", accuracy).white().bold()
    );
    println!("  {:<12} {}", muted("Saved to"), path.display());
    println!();

    Ok(())
}

pub async fn cmd_serve(host: &str, port: u16, model_dir: PathBuf) -> anyhow::Result<()> {
    use crate::server::{run_server, ServeConfig};

    println!();
    println!(
        "  {:<12} {}",
        muted("Predict"),
        format!("http://{}:{}/predict", host, port)
    );
    println!(
        "  {:<12} {}",
        muted("Health"),
        format!("http://{}:{}/health", host, port)
    );
    println!();

    let config = ServeConfig {
        host: host.to_string(),
        port,
        model_dir,
    };
    run_server(config).await
}

pub fn cmd_seed(model_dir: &Path) -> anyhow::Result<()> {
    let artifact = synthesize_fallback();
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string();
    let path = save_model(&artifact, model_dir, "random_forest_deployed", &timestamp)?;

    println!();
    println!("  {:<12} {}", muted("Seeded"), path.display());
    println!();

    Ok(())
}
