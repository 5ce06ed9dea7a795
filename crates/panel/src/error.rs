//! Structural errors for panel construction and configuration.
//!
//! Only structurally impossible requests surface as errors: malformed row
//! keys, misaligned columns, invalid window parameters. Everything that is
//! merely data-poor (short history, degenerate sections, missing inputs)
//! degrades to NaN cells or a skipped output instead; see the view and
//! builder docs.

use crate::types::{EntityId, Timestamp};

/// Error type for operations that can fail structurally.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    /// Two rows share the same (timestamp, entity) key.
    #[error("duplicate row key ({timestamp}, {entity})")]
    DuplicateKey {
        timestamp: Timestamp,
        entity: EntityId,
    },

    /// Row keys were supplied out of (timestamp, entity) order.
    #[error("row keys not sorted at position {0}")]
    UnsortedRows(usize),

    /// A column's length does not match the table's row count.
    #[error("column '{column}' has {len} values for {rows} rows")]
    LengthMismatch {
        column: String,
        len: usize,
        rows: usize,
    },

    /// A named column does not exist.
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    /// A window parameter the operation cannot work with.
    #[error("invalid window {0} (must be at least {1})")]
    BadWindow(usize, usize),

    /// An empty window list where at least one window is required.
    #[error("empty window list")]
    EmptyWindows,

    /// A quantile outside [0, 1].
    #[error("quantile {0} outside [0, 1]")]
    BadQuantile(f64),

    /// A sampling fraction outside [0, 1].
    #[error("fraction {0} outside [0, 1]")]
    BadFraction(f64),

    /// A mask or auxiliary vector not aligned with the table rows.
    #[error("row mask has {len} entries for {rows} rows")]
    BadMask { len: usize, rows: usize },

    /// The operation needs a non-empty table.
    #[error("empty panel")]
    EmptyPanel,

    /// A fit or solve could not be completed on the given data.
    #[error("degenerate system: {0}")]
    Degenerate(String),
}

/// Result type alias for panel operations.
pub type PanelResult<T> = Result<T, PanelError>;
