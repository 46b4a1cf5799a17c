//! Cyclefuse CLI
//!
//! Runs the prediction pipeline from the command line and serves it
//! over HTTP.

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use cyclefuse::config::Config;
use cyclefuse::import::{parse_csv, preview_csv, rows_to_observations, validate_structure};
use cyclefuse::insights::analyze;
use cyclefuse::model::{Cycle, Observation};
use cyclefuse::predict::{
    detect_bbt_shift, predict_from_calendar, predict_from_symptoms, project_cycles, BbtShift,
    CalendarParams, SymptomOptions,
};
use cyclefuse::reconcile::{assess_quality, reconcile, ReconcileOptions};
use cyclefuse::server::{run, ServerConfig};
use cyclefuse::VERSION;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cyclefuse")]
#[command(version = VERSION)]
#[command(about = "Reconciles fertile-window predictions from multiple sources", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the pipeline over HTTP
    Serve {
        /// Port to bind (overrides the config file)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Normalize a CSV export into canonical observations
    Import {
        /// Path to the CSV file
        file: PathBuf,

        /// Only show the first rows instead of converting
        #[arg(long)]
        preview: bool,
    },

    /// Predict the fertile window for a cycle
    Predict {
        /// Start date of the current cycle (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// JSON file with historical cycles
        #[arg(long)]
        cycles: Option<PathBuf>,

        /// JSON file with daily observations
        #[arg(long)]
        observations: Option<PathBuf>,

        /// Also project this many future cycles with the calendar method
        #[arg(long, default_value = "0")]
        project: usize,
    },

    /// Analyze data quality of cycles and observations
    Insights {
        /// JSON file with historical cycles
        #[arg(long)]
        cycles: Option<PathBuf>,

        /// JSON file with daily observations
        #[arg(long)]
        observations: Option<PathBuf>,
    },

    /// Show configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => cmd_serve(port).await,
        Commands::Import { file, preview } => cmd_import(&file, preview),
        Commands::Predict {
            start,
            cycles,
            observations,
            project,
        } => cmd_predict(start, cycles.as_deref(), observations.as_deref(), project),
        Commands::Insights {
            cycles,
            observations,
        } => cmd_insights(cycles.as_deref(), observations.as_deref()),
        Commands::Config => cmd_config(),
    }
}

async fn cmd_serve(port: Option<u16>) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(port) = port {
        config.port = port;
    }

    let (addr, _shutdown_tx) = run(ServerConfig::from_config(&config)).await?;
    println!("cyclefuse {VERSION} listening on http://{addr}");
    println!("Press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    println!("Shutting down");
    Ok(())
}

fn cmd_import(file: &Path, preview: bool) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let validation = validate_structure(&text);
    if !validation.valid {
        anyhow::bail!("no date column found in {}", file.display());
    }

    if preview {
        let config = Config::load().context("failed to load configuration")?;
        print_json(&preview_csv(&text, config.preview_rows))?;
        return Ok(());
    }

    let result = parse_csv(&text);
    let observations = rows_to_observations(&result.rows, Utc::now());

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct ImportOutput {
        success: bool,
        observations: Vec<Observation>,
        errors: Vec<cyclefuse::import::ImportIssue>,
        warnings: Vec<cyclefuse::import::ImportIssue>,
    }

    print_json(&ImportOutput {
        success: result.success,
        observations,
        errors: result.errors,
        warnings: result.warnings,
    })
}

fn cmd_predict(
    start: NaiveDate,
    cycles: Option<&Path>,
    observations: Option<&Path>,
    project: usize,
) -> anyhow::Result<()> {
    let history: Vec<Cycle> = read_json_file(cycles)?.unwrap_or_default();
    let observations: Vec<Observation> = read_json_file(observations)?.unwrap_or_default();
    let now = Utc::now();

    let mut predictions = vec![predict_from_calendar(
        start,
        &history,
        &CalendarParams::default(),
        now,
    )];
    if let Some(symptom_prediction) =
        predict_from_symptoms(&observations, &SymptomOptions::default(), now)
    {
        predictions.push(symptom_prediction);
    }

    let config = Config::load().context("failed to load configuration")?;
    let reconciled = reconcile(
        &predictions,
        &config.source_weights,
        &ReconcileOptions::default(),
    );
    let quality = assess_quality(&history, &observations, &[]);
    let bbt_shift = detect_bbt_shift(&observations);
    let projections = if project > 0 {
        project_cycles(start, &history, &CalendarParams::default(), project, now)
    } else {
        Vec::new()
    };

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct PredictOutput {
        #[serde(skip_serializing_if = "Option::is_none")]
        prediction: Option<cyclefuse::ReconciledPrediction>,
        quality: cyclefuse::QualityAssessment,
        #[serde(skip_serializing_if = "Option::is_none")]
        bbt_shift: Option<BbtShift>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        projections: Vec<cyclefuse::Prediction>,
    }

    print_json(&PredictOutput {
        prediction: reconciled,
        quality,
        bbt_shift,
        projections,
    })
}

fn cmd_insights(cycles: Option<&Path>, observations: Option<&Path>) -> anyhow::Result<()> {
    let cycles: Vec<Cycle> = read_json_file(cycles)?.unwrap_or_default();
    let observations: Vec<Observation> = read_json_file(observations)?.unwrap_or_default();
    print_json(&analyze(&cycles, &observations))
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    println!("Configuration file: {}", Config::config_path().display());
    print_json(&config)
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: Option<&Path>) -> anyhow::Result<Option<T>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parsed = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(parsed))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
