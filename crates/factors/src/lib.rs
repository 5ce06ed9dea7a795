//! Factor computation over price/volume panels.
//!
//! Takes a raw [`panel::PanelTable`] (close/open/high/low/volume/amount,
//! any subset) and derives model-ready feature columns from it, either as
//! the hand-crafted windowed factor set ([`FactorBuilder`]) or as a flat
//! normalized lag stack ([`Alpha360Encoder`]).
//!
//! # Modules
//!
//! - [`builder`]: the windowed factor set (momentum, price location,
//!   return volatility, market correlation, candlestick shape, volume
//!   co-movement, RSI), gated per family on input availability
//! - [`alpha360`]: `{column}{lag}` ratio stacks for sequence models
//! - [`indicators`]: EMA-family helpers (ewma, dif, dea, rsi) on contiguous
//!   series
//! - [`fill`]: the forward-then-mean fill applied to finished factor tables
//!
//! # Example
//!
//! ```
//! use factors::{FactorBuilder, SourceColumns};
//! use panel::{PanelTable, Record};
//!
//! let mut records = Vec::new();
//! for t in 1..=6i64 {
//!     records.push(Record::new(t, 1).field("close", 10.0 + t as f64));
//!     records.push(Record::new(t, 2).field("close", 30.0 - t as f64));
//! }
//! let table = PanelTable::from_records(records).unwrap();
//!
//! let factors = FactorBuilder::new(SourceColumns::default(), vec![2, 3])
//!     .unwrap()
//!     .build(&table)
//!     .unwrap();
//! assert_eq!(factors.n_rows(), table.n_rows());
//! assert!(factors.has_column("MA2") && factors.has_column("RSI3"));
//! ```
//!
//! # Design Notes
//!
//! Factor columns are independent once a handful of shared scratch series
//! exist, so the builder plans boxed per-column recipes and evaluates them
//! through [`parallel::map_vec`]: threaded when the `rayon` feature is on,
//! sequential otherwise or on request. Output column order is the plan
//! order either way.
//!
//! Missing inputs are skipped quietly (families simply do not appear);
//! short history and degenerate windows degrade to NaN cells and are
//! swept up by the final fill. Only structurally bad configuration
//! (empty/undersized window lists) errors.

pub mod alpha360;
pub mod builder;
pub mod fill;
pub mod indicators;

pub use alpha360::{Alpha360Encoder, DEFAULT_LAGS};
pub use builder::{FactorBuilder, SourceColumns, DEFAULT_WINDOWS};
pub use fill::forward_then_mean;
