//! Central configuration for the factor research pipeline.
//!
//! All pipeline parameters are defined here for easy tuning.

use prep::{NormMethod, DEFAULT_DECAY_WINDOW, DEFAULT_WINSOR_MADS};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Which feature family the pipeline builds before fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorMode {
    /// Windowed indicator set: K-bar shape, price ratios, rolling
    /// statistics, correlations, RSI.
    Alpha158,
    /// Flat normalized-lag stack: 60 lags of each source column.
    Alpha360,
}

impl FromStr for FactorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alpha158" | "158" => Ok(FactorMode::Alpha158),
            "alpha360" | "360" => Ok(FactorMode::Alpha360),
            other => Err(format!(
                "unknown factor mode '{other}' (expected alpha158 or alpha360)"
            )),
        }
    }
}

impl fmt::Display for FactorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactorMode::Alpha158 => write!(f, "alpha158"),
            FactorMode::Alpha360 => write!(f, "alpha360"),
        }
    }
}

/// Master configuration for the entire pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    // ─────────────────────────────────────────────────────────────────────────
    // Synthetic Universe
    // ─────────────────────────────────────────────────────────────────────────
    /// Number of entities in the cross-section.
    pub entities: u32,
    /// Number of timestamps to simulate.
    pub steps: i64,
    /// Seed for the market generator.
    pub seed: u64,

    // ─────────────────────────────────────────────────────────────────────────
    // Factor Construction
    // ─────────────────────────────────────────────────────────────────────────
    /// Feature family to build.
    pub mode: FactorMode,
    /// Rolling windows for the windowed factor set.
    pub windows: Vec<usize>,
    /// Build factor columns one at a time instead of on the worker pool.
    pub sequential: bool,

    // ─────────────────────────────────────────────────────────────────────────
    // Preprocessing
    // ─────────────────────────────────────────────────────────────────────────
    /// Cross-sectional normalization applied to every factor column.
    pub norm: NormMethod,
    /// Trailing linear-decay smoothing window; `None` leaves factors raw.
    pub decay: Option<usize>,
    /// Winsorization band half-width in scaled-MAD units.
    pub winsor_mads: f64,

    // ─────────────────────────────────────────────────────────────────────────
    // Fit And Evaluation
    // ─────────────────────────────────────────────────────────────────────────
    /// Fraction of timestamps held out from the end for validation.
    pub valid_fraction: f64,
    /// Ridge penalty on the linear fit; 0 is plain least squares.
    pub ridge_lambda: f64,
    /// Moving-average window for the smoothed IC series.
    pub ic_smoothing: usize,

    // ─────────────────────────────────────────────────────────────────────────
    // Output
    // ─────────────────────────────────────────────────────────────────────────
    /// Where to write the JSON run report; `None` prints the summary only.
    pub report_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            // Synthetic universe
            entities: 30,
            steps: 240, // roughly a year of daily bars
            seed: 42,

            // Factor construction
            mode: FactorMode::Alpha158,
            windows: factors::DEFAULT_WINDOWS.to_vec(),
            sequential: false,

            // Preprocessing
            norm: NormMethod::Zscore,
            decay: None,
            winsor_mads: DEFAULT_WINSOR_MADS,

            // Fit and evaluation
            valid_fraction: 0.25,
            ridge_lambda: 0.0,
            ic_smoothing: 30,

            // Output
            report_path: None,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder Methods
    // ─────────────────────────────────────────────────────────────────────────

    pub fn entities(mut self, n: u32) -> Self {
        self.entities = n;
        self
    }

    pub fn steps(mut self, n: i64) -> Self {
        self.steps = n;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn mode(mut self, mode: FactorMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn windows(mut self, windows: Vec<usize>) -> Self {
        self.windows = windows;
        self
    }

    pub fn norm(mut self, norm: NormMethod) -> Self {
        self.norm = norm;
        self
    }

    pub fn decay(mut self, window: usize) -> Self {
        self.decay = Some(window);
        self
    }

    pub fn valid_fraction(mut self, fraction: f64) -> Self {
        self.valid_fraction = fraction;
        self
    }

    pub fn ridge_lambda(mut self, lambda: f64) -> Self {
        self.ridge_lambda = lambda;
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Computed Properties
    // ─────────────────────────────────────────────────────────────────────────

    /// Timestamps held out for validation given a panel of `n_timestamps`.
    pub fn validation_timestamps(&self, n_timestamps: usize) -> usize {
        (n_timestamps as f64 * self.valid_fraction).round() as usize
    }

    /// Total rows the synthetic market will contain.
    pub fn synthetic_rows(&self) -> usize {
        self.entities as usize * self.steps.max(0) as usize
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Preset Configurations
// ─────────────────────────────────────────────────────────────────────────────

impl PipelineConfig {
    /// Small and fast; good for smoke-testing changes.
    pub fn demo() -> Self {
        Self::default().entities(10).steps(120)
    }

    /// Many entities, default history; stresses the cross-sectional ops.
    pub fn wide_universe() -> Self {
        Self::default().entities(120).norm(NormMethod::Rank)
    }

    /// Few entities, long history with decay smoothing; stresses the
    /// rolling ops.
    pub fn deep_history() -> Self {
        Self::default()
            .entities(12)
            .steps(1500)
            .decay(DEFAULT_DECAY_WINDOW)
            .ridge_lambda(1.0)
    }
}
