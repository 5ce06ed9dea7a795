//! Cross-sectional evaluation of predictive signals.
//!
//! Given a panel holding a prediction column and a realized-label column,
//! this crate measures how well the prediction orders entities within each
//! cross-section: the information coefficient series and its summary
//! statistics ([`ic_analysis`]), plus pooled per-feature screening
//! ([`r_scores`] / [`screen`]).
//!
//! # Modules
//!
//! - [`ic`]: per-group Pearson/Spearman IC series, smoothing, and the
//!   IC/ICIR/RankIC/RankICIR summary
//! - [`scores`]: whole-panel feature-vs-label correlation ranking
//! - [`stats`]: the underlying pair-filtered correlation kernels
//!
//! # Example
//!
//! ```
//! use eval::{ic_analysis, IcGrouping};
//! use panel::{PanelTable, Record};
//!
//! let mut records = Vec::new();
//! for t in 1..=4i64 {
//!     for e in 1..=3u32 {
//!         let signal = ((t + i64::from(e)) % 3) as f64;
//!         records.push(Record::new(t, e).field("pred", signal).field("label", signal));
//!     }
//! }
//! let table = PanelTable::from_records(records).unwrap();
//!
//! let report = ic_analysis(&table, "pred", "label", &IcGrouping::Timestamp).unwrap();
//! assert_eq!(report.summary.ic, Some(1.0));
//! assert_eq!(report.ic.len(), 4);
//! ```
//!
//! # Design Notes
//!
//! Degenerate data never errors out of an analysis: a cross-section with
//! one entity or a constant side produces a NaN point, and a series with
//! nothing finite in it produces a summary of `None`s. Errors are reserved
//! for structural problems such as unknown column names.

pub mod ic;
pub mod scores;
pub mod stats;

pub use ic::{ic_analysis, IcGrouping, IcReport, IcSeries, IcSummary};
pub use scores::{r_scores, screen};
pub use stats::{pearson, spearman};
