//! Preprocessing, splitting, and a baseline model for factor panels.
//!
//! Sits between factor construction and evaluation: clean the feature
//! table ([`Preprocessor`]), carve out train/validation rows ([`split`]),
//! and fit the reference linear model ([`LinearModel`]) whose predictions
//! the evaluator scores.
//!
//! # Modules
//!
//! - [`ops`]: masking, filling, winsorizing, decaying, and the four
//!   cross-sectional normalizations behind [`NormMethod`]
//! - [`split`]: time-range and seeded-random splits, class down-sampling
//! - [`linear`]: OLS/ridge via the normal equations
//!
//! # Example
//!
//! ```
//! use panel::{PanelTable, Record};
//! use prep::{LinearModel, NormMethod, Preprocessor};
//!
//! let mut records = Vec::new();
//! for t in 1..=10i64 {
//!     for e in 1..=3u32 {
//!         let x = t as f64 + f64::from(e);
//!         records.push(Record::new(t, e).field("x", x).field("y", 2.0 * x));
//!     }
//! }
//! let table = PanelTable::from_records(records).unwrap();
//!
//! let prep = Preprocessor {
//!     norm: NormMethod::Rank,
//!     ..Preprocessor::default()
//! };
//! let clean = prep.apply(&table).unwrap();
//! assert_eq!(clean.n_rows(), table.n_rows());
//!
//! // ranks of x still order y perfectly, so the fit is usable as-is
//! let model = LinearModel::fit(&clean, &["x"], "y", 0.0).unwrap();
//! assert_eq!(model.weights().len(), 1);
//! ```
//!
//! # Design Notes
//!
//! Randomized operations take a caller-supplied RNG; a seeded `StdRng`
//! reproduces a split exactly. Degenerate cross-sections normalize to NaN,
//! matching the rest of the workspace: errors mean structural misuse, NaN
//! means the data could not support the statistic.

pub mod linear;
pub mod ops;
pub mod split;

pub use linear::LinearModel;
pub use ops::{
    cs_minmax, cs_rank, cs_robust_zscore, cs_winsorize_mad, cs_zscore, drop_missing_rows,
    forward_fill_columns, mask_non_finite, ts_decay_linear, NormMethod, Preprocessor,
    DEFAULT_DECAY_WINDOW, DEFAULT_WINSOR_MADS, MAD_SCALE,
};
pub use split::{down_sample, fraction_equal, split_by_time, split_ratio};
