//! Factor Lab - Main binary
//!
//! Runs the full factor research loop against a seeded synthetic market:
//!
//! ```text
//! synthetic OHLCV ──► factor table ──► preprocess ──► attach label
//!                                                          │
//!     JSON report ◄── IC analysis ◄── fit + predict ◄── time split
//! ```
//!
//! The model trains on the early timestamps and is scored per cross-section
//! on the held-out tail, so every reported IC is out of sample. Diagnostics
//! go to stderr; the JSON report (if requested) is the only file output.

mod config;
mod synth;

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use eval::{ic_analysis, r_scores, IcGrouping, IcReport, IcSummary};
use factors::{Alpha360Encoder, FactorBuilder, SourceColumns};
use panel::{align, PanelTable};
use prep::{drop_missing_rows, split_by_time, LinearModel, NormMethod, Preprocessor};
use serde::Serialize;
use tracing::info;

pub use config::{FactorMode, PipelineConfig};

/// Columns the pipeline adds on top of the factor table.
const LABEL: &str = "label";
const PRED: &str = "pred";

/// Factor Lab - factor construction and evaluation over a synthetic panel
#[derive(Parser, Debug)]
#[command(name = "factorlab")]
#[command(about = "Build factors over a synthetic market and evaluate a linear fit")]
#[command(version)]
struct Args {
    /// Preset configuration (demo | wide-universe | deep-history)
    #[arg(long, env = "FACTORLAB_PRESET")]
    preset: Option<String>,

    /// Number of entities in the synthetic universe
    #[arg(long, env = "FACTORLAB_ENTITIES")]
    entities: Option<u32>,

    /// Number of timestamps to simulate
    #[arg(long, env = "FACTORLAB_STEPS")]
    steps: Option<i64>,

    /// Seed for the market generator
    #[arg(long, env = "FACTORLAB_SEED")]
    seed: Option<u64>,

    /// Factor family to build (alpha158 | alpha360)
    #[arg(long, env = "FACTORLAB_MODE")]
    mode: Option<FactorMode>,

    /// Rolling windows for the windowed factor set, comma separated
    #[arg(long, env = "FACTORLAB_WINDOWS", value_delimiter = ',')]
    windows: Option<Vec<usize>>,

    /// Cross-sectional normalization (zscore | robust | minmax | rank)
    #[arg(long, env = "FACTORLAB_NORM")]
    norm: Option<NormMethod>,

    /// Trailing decay window applied before normalization (0 = off)
    #[arg(long, env = "FACTORLAB_DECAY")]
    decay: Option<usize>,

    /// Fraction of timestamps held out for validation
    #[arg(long, env = "FACTORLAB_VALID_FRACTION")]
    valid_fraction: Option<f64>,

    /// Ridge penalty on the linear fit (0 = plain least squares)
    #[arg(long, env = "FACTORLAB_RIDGE")]
    ridge: Option<f64>,

    /// Moving-average window for the smoothed IC series
    #[arg(long, env = "FACTORLAB_IC_SMOOTHING")]
    ic_smoothing: Option<usize>,

    /// Write a JSON run report to this path
    #[arg(long, env = "FACTORLAB_REPORT")]
    report: Option<PathBuf>,

    /// Build factor columns one at a time (profiling)
    #[arg(long, env = "FACTORLAB_SEQUENTIAL")]
    sequential: bool,
}

/// One scored feature in the run report.
#[derive(Debug, Serialize)]
struct FeatureScore {
    name: String,
    score: Option<f64>,
}

/// Everything a run produces, serialized verbatim when `--report` is set.
#[derive(Debug, Serialize)]
struct RunReport {
    entities: u32,
    steps: i64,
    seed: u64,
    mode: String,
    norm: String,
    market_rows: usize,
    feature_columns: usize,
    train_rows: usize,
    valid_rows: usize,
    elapsed_secs: f64,
    summary: IcSummary,
    top_features: Vec<FeatureScore>,
    ic: IcReport,
    smoothed_ic: Vec<f64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = build_config(&args);
    print_config(&config);

    if let Err(e) = run(&config) {
        eprintln!("pipeline error: {e}");
        std::process::exit(1);
    }
}

/// Resolve the preset, then layer CLI/env overrides on top.
fn build_config(args: &Args) -> PipelineConfig {
    let mut config = match args.preset.as_deref() {
        None => PipelineConfig::default(),
        Some("demo") => PipelineConfig::demo(),
        Some("wide-universe" | "wide_universe") => PipelineConfig::wide_universe(),
        Some("deep-history" | "deep_history") => PipelineConfig::deep_history(),
        Some(other) => {
            eprintln!("unknown preset '{other}' (expected demo, wide-universe, deep-history)");
            std::process::exit(2);
        }
    };

    if let Some(n) = args.entities {
        config.entities = n;
    }
    if let Some(n) = args.steps {
        config.steps = n;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(windows) = &args.windows {
        config.windows = windows.clone();
    }
    if let Some(norm) = args.norm {
        config.norm = norm;
    }
    if let Some(decay) = args.decay {
        config.decay = (decay > 0).then_some(decay);
    }
    if let Some(fraction) = args.valid_fraction {
        config.valid_fraction = fraction;
    }
    if let Some(lambda) = args.ridge {
        config.ridge_lambda = lambda;
    }
    if let Some(window) = args.ic_smoothing {
        config.ic_smoothing = window;
    }
    if let Some(path) = &args.report {
        config.report_path = Some(path.clone());
    }
    if args.sequential {
        config.sequential = true;
    }
    config
}

/// Execute the pipeline end to end and print the completion summary.
fn run(config: &PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();

    let market = synth::market(config.entities, config.steps, config.seed)?;
    info!(
        rows = market.n_rows(),
        entities = market.n_entities(),
        timestamps = market.n_timestamps(),
        "synthetic market generated"
    );

    let features = match config.mode {
        FactorMode::Alpha158 => {
            FactorBuilder::new(SourceColumns::default(), config.windows.clone())?
                .force_sequential(config.sequential)
                .build(&market)?
        }
        FactorMode::Alpha360 => Alpha360Encoder::standard().encode(&market)?,
    };
    info!(columns = features.n_cols(), mode = %config.mode, "factor table built");

    // Two-bars-ahead return: enter at the next close, mark one bar later.
    let close = market.require_column("close")?;
    let grouped = market.by_entity();
    let lead1 = grouped.shift(close, -1);
    let lead2 = grouped.shift(close, -2);
    let ret: Vec<f64> = lead2.iter().zip(&lead1).map(|(a, b)| a / b - 1.0).collect();
    let mut labels = PanelTable::with_index(market.index().clone());
    labels.set_column(LABEL, ret)?;

    let prep = Preprocessor {
        norm: config.norm,
        decay: config.decay,
        winsor_mads: config.winsor_mads,
    };
    let prepped = prep.apply(&features)?;

    let (mut dataset, labels) = align(&prepped, &labels)?;
    dataset.set_column(LABEL, labels.require_column(LABEL)?.to_vec())?;
    let dataset = drop_missing_rows(&dataset)?;

    let feature_names: Vec<String> = dataset
        .column_names()
        .into_iter()
        .filter(|&name| name != LABEL)
        .map(str::to_owned)
        .collect();
    let feature_refs: Vec<&str> = feature_names.iter().map(String::as_str).collect();
    info!(
        rows = dataset.n_rows(),
        features = feature_names.len(),
        "dataset assembled"
    );

    let keys = dataset.index().timestamp_keys().to_vec();
    let n_ts = keys.len();
    let n_valid = config.validation_timestamps(n_ts);
    if n_valid == 0 || n_valid >= n_ts {
        return Err(format!(
            "validation fraction {} leaves no usable split over {} timestamps",
            config.valid_fraction, n_ts
        )
        .into());
    }
    let split = n_ts - n_valid;
    let (train, mut valid) = split_by_time(
        &dataset,
        (keys[0], keys[split - 1]),
        (keys[split], keys[n_ts - 1]),
    )?;
    info!(
        train_rows = train.n_rows(),
        valid_rows = valid.n_rows(),
        "panel split at {}",
        keys[split]
    );

    let model = LinearModel::fit(&train, &feature_refs, LABEL, config.ridge_lambda)?;
    let preds = model.predict(&valid)?;
    valid.set_column(PRED, preds)?;

    let report = ic_analysis(&valid, PRED, LABEL, &IcGrouping::Timestamp)?;
    let smoothed = report.ic.smoothed(config.ic_smoothing.max(1));
    let scores = r_scores(&train, &feature_refs, LABEL)?;
    let elapsed = start.elapsed();

    print_summary(config, &market, &train, &valid, &report, &smoothed, &scores, elapsed);

    if let Some(path) = &config.report_path {
        let run_report = RunReport {
            entities: config.entities,
            steps: config.steps,
            seed: config.seed,
            mode: config.mode.to_string(),
            norm: config.norm.to_string(),
            market_rows: market.n_rows(),
            feature_columns: feature_names.len(),
            train_rows: train.n_rows(),
            valid_rows: valid.n_rows(),
            elapsed_secs: elapsed.as_secs_f64(),
            summary: report.summary,
            top_features: scores
                .iter()
                .take(10)
                .map(|(name, score)| FeatureScore {
                    name: name.clone(),
                    score: *score,
                })
                .collect(),
            ic: report.clone(),
            smoothed_ic: smoothed,
        };
        std::fs::write(path, serde_json::to_string_pretty(&run_report)?)?;
        info!(path = %path.display(), "run report written");
    }

    Ok(())
}

/// Print the resolved configuration before the run starts.
fn print_config(config: &PipelineConfig) {
    eprintln!("╔═══════════════════════════════════════════════════════════════════════╗");
    eprintln!("║  {:<69}║", "Factor Lab - Synthetic Panel Pipeline");
    eprintln!("╠═══════════════════════════════════════════════════════════════════════╣");
    eprintln!(
        "║  {:<69}║",
        format!(
            "Entities: {:4}  │  Steps: {:5}  │  Seed: {}",
            config.entities, config.steps, config.seed
        )
    );
    eprintln!(
        "║  {:<69}║",
        format!(
            "Mode: {:8}  │  Norm: {:6}  │  Decay: {}",
            config.mode.to_string(),
            config.norm.to_string(),
            match config.decay {
                Some(w) => w.to_string(),
                None => "off".to_string(),
            }
        )
    );
    eprintln!(
        "║  {:<69}║",
        format!("Windows: {:?}  │  Winsor: {} MADs", config.windows, config.winsor_mads)
    );
    eprintln!(
        "║  {:<69}║",
        format!(
            "Valid fraction: {}  │  Ridge: {}  │  IC smoothing: {}",
            config.valid_fraction, config.ridge_lambda, config.ic_smoothing
        )
    );
    eprintln!("╚═══════════════════════════════════════════════════════════════════════╝");
    eprintln!();
}

/// Print the completion box with the headline metrics.
#[allow(clippy::too_many_arguments)]
fn print_summary(
    config: &PipelineConfig,
    market: &PanelTable,
    train: &PanelTable,
    valid: &PanelTable,
    report: &IcReport,
    smoothed: &[f64],
    scores: &[(String, Option<f64>)],
    elapsed: std::time::Duration,
) {
    let last_smoothed = smoothed.iter().rev().find(|v| v.is_finite()).copied();
    let top: Vec<String> = scores
        .iter()
        .take(3)
        .map(|(name, score)| format!("{name} {}", fmt_metric(*score)))
        .collect();

    eprintln!();
    eprintln!("╔═══════════════════════════════════════════════════════════════════════╗");
    eprintln!("║  {:<69}║", "Pipeline Complete");
    eprintln!("╠═══════════════════════════════════════════════════════════════════════╣");
    eprintln!(
        "║  {:<69}║",
        format!(
            "IC: {}  │  ICIR: {}  │  smoothed(last {}): {}",
            fmt_metric(report.summary.ic),
            fmt_metric(report.summary.icir),
            config.ic_smoothing,
            fmt_metric(last_smoothed)
        )
    );
    eprintln!(
        "║  {:<69}║",
        format!(
            "RankIC: {}  │  RankICIR: {}  │  sections: {}",
            fmt_metric(report.summary.rank_ic),
            fmt_metric(report.summary.rank_icir),
            report.ic.len()
        )
    );
    eprintln!("║  {:<69}║", format!("Top factors: {}", top.join("  ")));
    eprintln!(
        "║  {:<69}║",
        format!(
            "Rows: {} market / {} train / {} valid",
            market.n_rows(),
            train.n_rows(),
            valid.n_rows()
        )
    );
    eprintln!(
        "║  {:<69}║",
        format!(
            "Elapsed: {:.2}s  │  Rate: {:.0} rows/s",
            elapsed.as_secs_f64(),
            market.n_rows() as f64 / elapsed.as_secs_f64()
        )
    );
    eprintln!("╚═══════════════════════════════════════════════════════════════════════╝");
}

/// Fixed-width rendering for possibly-degenerate metrics.
fn fmt_metric(v: Option<f64>) -> String {
    match v {
        Some(x) => format!("{x:+.4}"),
        None => "--".to_string(),
    }
}
