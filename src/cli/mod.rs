//! Chaos AutoML CLI Module
//!
//! Command-line interface for training, prediction, and dataset inspection.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::inference::{InferenceService, RiskLevel, RiskPrediction};
use crate::optimizer::CandidateOutcome;
use crate::synthetic::{generate_health_dataset, DEFAULT_SEED, HEALTH_TARGET};
use crate::training::{TrainingConfig, TrainingPipeline, TrainingReport};
use crate::utils::DataLoader;

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn warn(s: &str) -> ColoredString   { s.truecolor(230, 180, 80) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(&format!("{:<18}", key)), val.white())
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn level_colored(level: RiskLevel) -> ColoredString {
    match level {
        RiskLevel::High => level.to_string().truecolor(235, 100, 100).bold(),
        RiskLevel::Medium => warn(&level.to_string()),
        RiskLevel::Low => ok(&level.to_string()),
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "chaos-automl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Chaos-driven hyperparameter search for attentive tabular classifiers")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options of the `train` command; unset flags fall back to the config file
#[derive(clap::Args, Debug, Clone, Default)]
pub struct TrainArgs {
    /// Input data file (CSV, JSON, or Parquet); synthetic records when omitted
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Target column name
    #[arg(short, long)]
    pub target: Option<String>,

    /// Output directory for the model and preprocessor
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of search iterations
    #[arg(short = 'n', long)]
    pub iterations: Option<usize>,

    /// Initial chaotic value in (0, 1)
    #[arg(long)]
    pub seed: Option<f64>,

    /// Epoch budget per candidate
    #[arg(long)]
    pub max_epochs: Option<usize>,

    /// Rows of synthetic data to generate
    #[arg(long)]
    pub rows: Option<usize>,

    /// JSON training configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl TrainArgs {
    /// Resolve the effective configuration, flags overriding the file
    pub fn to_config(&self) -> anyhow::Result<TrainingConfig> {
        let mut config = match &self.config {
            Some(path) => TrainingConfig::from_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => TrainingConfig::default(),
        };
        if let Some(data) = &self.data {
            config.data_path = Some(data.clone());
        }
        if let Some(target) = &self.target {
            config.target_column = target.clone();
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(n) = self.iterations {
            config.optimizer.n_iterations = n;
        }
        if let Some(x0) = self.seed {
            config.optimizer.seed = Some(x0);
        }
        if let Some(epochs) = self.max_epochs {
            config.classifier.max_epochs = epochs;
        }
        if let Some(rows) = self.rows {
            config.synthetic_rows = rows;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search hyperparameters, train the best model and save artifacts
    Train(TrainArgs),

    /// Predict risk with saved artifacts
    Predict {
        /// Directory holding the artifacts
        #[arg(short, long, default_value = "models")]
        models: PathBuf,

        /// Target column the model was trained for
        #[arg(short, long, default_value = HEALTH_TARGET)]
        target: String,

        /// One record as a JSON object
        #[arg(short, long, conflicts_with = "data")]
        features: Option<String>,

        /// Input data file for batch prediction
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Write predictions as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show data information
    Info {
        /// Input data file; synthetic records when omitted
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Rows of synthetic data to generate
        #[arg(long, default_value = "1000")]
        rows: usize,
    },
}

// ─── Train ─────────────────────────────────────────────────────────────────────

pub fn cmd_train(args: &TrainArgs) -> anyhow::Result<()> {
    section("Train");
    let config = args.to_config()?;
    let pipeline = TrainingPipeline::new(config);

    step_run("Loading data");
    let start = Instant::now();
    let df = pipeline.load_data()?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    step_run(&format!(
        "Searching {} configurations",
        pipeline.config().optimizer.n_iterations.to_string().cyan()
    ));
    println!();
    let report = pipeline.run_on(&df)?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &TrainingReport) {
    println!();
    line_box_top();
    line_box(&kv("Target", &report.target));
    line_box(&kv("Rows", &format!("{} ({} train / {} valid)", report.n_rows, report.n_train, report.n_valid)));
    line_box(&kv("Features", &report.n_features.to_string()));
    line_box(&kv("Chaos seed", &format!("{:.6}", report.search.seed)));
    line_box_sep();

    for candidate in &report.search.history {
        let marker = if Some(candidate.iteration) == report.search.best_iteration { ok("*") } else { dim(" ") };
        let result = match &candidate.outcome {
            CandidateOutcome::Success(score) => format!("{:.4}", score).white(),
            CandidateOutcome::Failure(_) => warn("failed"),
        };
        line_box(&format!(
            "{} {:>3}  {}  {}",
            marker,
            candidate.iteration + 1,
            result,
            muted(&format!(
                "lr={:.1e} n_steps={} n_d={}",
                candidate.config.learning_rate, candidate.config.n_steps, candidate.config.n_d
            ))
        ));
    }

    line_box_sep();
    line_box(&kv("Best search score", &format!("{:.4}", report.search.best_score)));
    line_box(&kv("Final accuracy", &format!("{:.4}", report.final_valid_accuracy)));
    line_box(&kv("Epochs", &format!("{} (best {})", report.final_fit.epochs_run, report.final_fit.best_epoch + 1)));
    line_box(&kv("Time", &format!("{:.2}s", report.total_duration_secs)));
    line_box_bottom();

    println!();
    println!("  {} {}", ok("✓"), report.artifacts.model_path.display());
    println!("  {} {}", ok("✓"), report.artifacts.preprocessor_path.display());
    println!();
}

// ─── Predict ───────────────────────────────────────────────────────────────────

pub fn cmd_predict(
    models: &Path,
    target: &str,
    features: Option<&str>,
    data: Option<&Path>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading artifacts");
    let service: InferenceService = InferenceService::load(models, target)?;
    step_done(&format!("{} features", service.feature_names().len()));

    let predictions = match (features, data) {
        (Some(json), _) => {
            let row: HashMap<String, Value> =
                serde_json::from_str(json).context("--features must be a JSON object")?;
            vec![service.predict(&row)?]
        }
        (None, Some(path)) => {
            let df = DataLoader::new().load_auto(path)?;
            service.predict_batch(&df)?
        }
        (None, None) => anyhow::bail!("pass either --features or --data"),
    };

    print_predictions(&predictions);

    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&predictions)?)?;
        println!("  {} {}", ok("✓"), path.display());
    }
    println!();
    Ok(())
}

fn print_predictions(predictions: &[RiskPrediction]) {
    println!();
    println!("  {:<6} {:<10} {:>8}  {}", muted("Row"), muted("Label"), muted("Risk"), muted("Level"));
    println!("  {}", dim(&"─".repeat(40)));
    for (i, p) in predictions.iter().enumerate() {
        println!(
            "  {:<6} {:<10} {:>7.1}%  {}",
            i,
            p.label,
            p.risk_score,
            level_colored(p.risk_level)
        );
        if !p.scaling_applied {
            println!("  {}", warn(&format!("       scaling skipped, missing {}", p.missing_columns.join(", "))));
        }
        if !p.unseen_categories.is_empty() {
            println!("  {}", warn(&format!("       unseen categories in {}", p.unseen_categories.join(", "))));
        }
    }
}

// ─── Info ──────────────────────────────────────────────────────────────────────

pub fn cmd_info(data_path: Option<&Path>, rows: usize) -> anyhow::Result<()> {
    section("Data Info");

    let (df, source) = match data_path {
        Some(path) => (DataLoader::new().load_auto(path)?, path.display().to_string()),
        None => (generate_health_dataset(rows, DEFAULT_SEED)?, format!("synthetic (seed {})", DEFAULT_SEED)),
    };

    println!("  {:<12} {}", muted("Source"), source);
    println!("  {:<12} {}", muted("Rows"), df.height());
    println!("  {:<12} {}", muted("Columns"), df.width());
    println!("  {:<12} {:.2} MB", muted("Memory"), df.estimated_size() as f64 / 1024.0 / 1024.0);
    println!();

    println!("  {:<20} {:<12} {:>6} {:>8}", muted("Column"), muted("Type"), muted("Nulls"), muted("Unique"));
    println!("  {}", dim(&"─".repeat(50)));

    for col in df.get_columns() {
        println!(
            "  {:<20} {:<12} {:>6} {:>8}",
            col.name(),
            format!("{:?}", col.dtype()).truecolor(140, 140, 140),
            col.null_count(),
            col.n_unique().unwrap_or(0)
        );
    }

    println!();
    Ok(())
}
