//! Panel data model for factor research.
//!
//! A panel is a set of `f64` observations keyed by `(timestamp, entity)`.
//! This crate owns the table, its row index, and the two views every factor
//! computation is phrased through: per-entity time-series operations and
//! per-timestamp cross-sections.
//!
//! # Modules
//!
//! - [`table`] - `PanelTable` construction and column management
//! - [`index`] - sorted row keys and their groupings
//! - [`grouped`] - per-entity shift/rolling/apply (leakage-free)
//! - [`cross`] - per-timestamp ranks and aggregates
//! - [`window`] - trailing-window kernels shared by both views
//! - [`error`] - structural error type
//!
//! # Example
//!
//! ```
//! use panel::{PanelTable, Record, RollingStat};
//!
//! let table = PanelTable::from_records(vec![
//!     Record::new(1, 1).field("close", 10.0),
//!     Record::new(2, 1).field("close", 11.0),
//!     Record::new(3, 1).field("close", 12.0),
//! ])
//! .unwrap();
//!
//! let close = table.column("close").unwrap();
//! let ma2 = table.by_entity().rolling(close, 2, RollingStat::Mean);
//! assert!(ma2[0].is_nan()); // one observation is not a window
//! assert_eq!(ma2[1], 10.5);
//! ```
//!
//! # Design Notes
//!
//! - NaN is the missing-value marker; operations never panic on it
//! - Short history and degenerate statistics degrade to NaN, not errors
//! - Structural misuse (duplicate keys, misaligned columns) is an error
//! - Views borrow the index; operations allocate fresh output vectors

pub mod cross;
pub mod error;
pub mod grouped;
pub mod index;
pub mod table;
pub mod types;
pub mod window;

// Re-export main types at crate root for convenience
pub use cross::{CrossSectionalView, CsSeries, CsStat};
pub use error::{PanelError, PanelResult};
pub use grouped::EntityGroupedView;
pub use index::PanelIndex;
pub use table::{align, PanelTable, Record};
pub use types::{EntityId, Timestamp};
pub use window::{PairWindow, RollingStat, RollingWindow};
