//! sales-forecast CLI - runs one pipeline stage per invocation
//!
//! ## Example Usage
//!
//! ```bash
//! sales-forecast generate-features
//! sales-forecast train-model
//! sales-forecast forecast-data
//! sales-forecast --data-dir /tmp/data evaluate-model
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use sales_forecast::config::PathConfig;
use sales_forecast::error::Result as ForecastResult;
use sales_forecast::pipeline::{
    evaluate_model, forecast_data, generate_features, train_model, PipelineConfig,
};
use std::path::PathBuf;
use std::process;
use std::time::Instant;

/// sales-forecast: store sales forecasting pipeline
#[derive(Parser)]
#[command(name = "sales-forecast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Robert Fall")]
#[command(about = "Store sales forecasting pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding data_configs.json and model_configs.json
    #[arg(long, global = true, default_value = "./config")]
    config_dir: PathBuf,

    /// Directory holding original/, processed/ and final/
    #[arg(long, global = true, default_value = "./data")]
    data_dir: PathBuf,

    /// Directory for fitted model artifacts
    #[arg(long, global = true, default_value = "./src/models")]
    model_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build train_X, train_Y and test_X from the raw CSVs
    GenerateFeatures,

    /// Fit the configured model and store it
    TrainModel,

    /// Forecast the test rows and write the submission file
    ForecastData,

    /// Report the training RMSLE of the stored model
    EvaluateModel,
}

fn run(cli: &Cli, config: &PipelineConfig) -> ForecastResult<()> {
    match cli.command {
        Commands::GenerateFeatures => {
            generate_features(config)?;
            println!(
                "{} features written to {}",
                "✓".green(),
                config.paths.processed_dir().display()
            );
        }
        Commands::TrainModel => {
            let model = train_model(config)?;
            println!(
                "{} trained {} -> {}",
                "✓".green(),
                model.kind().to_string().cyan(),
                config
                    .paths
                    .model_artifact(&config.model.model_name)
                    .display()
            );
        }
        Commands::ForecastData => {
            let submission = forecast_data(config)?;
            println!(
                "{} {} forecasts written to {}",
                "✓".green(),
                submission.height(),
                config.paths.submission().display()
            );
        }
        Commands::EvaluateModel => {
            let error = evaluate_model(config)?;
            println!(
                "Training root mean square log error is: {}",
                format!("{:.2}", error).yellow().bold()
            );
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let paths = PathConfig::new(&cli.data_dir, &cli.config_dir, &cli.model_dir);
    let config = match PipelineConfig::load(paths) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            process::exit(1);
        }
    };

    if cli.verbose {
        println!(
            "{} v{}",
            "sales-forecast".cyan().bold(),
            env!("CARGO_PKG_VERSION")
        );
        println!(
            "Data dir: {}",
            config.paths.data_dir.display().to_string().dimmed()
        );
        println!(
            "Model: {} ({})",
            config.model.model_kind(),
            config.model.model_name
        );
    }

    let start = Instant::now();
    if let Err(e) = run(&cli, &config) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }

    if cli.verbose {
        println!("Done in {:.2?}", start.elapsed());
    }
}
