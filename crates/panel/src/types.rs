//! Key types for panel rows.
//!
//! A panel row is addressed by a `(Timestamp, EntityId)` pair. Timestamps are
//! opaque orderable values (a bar number, an epoch offset, a trading-day
//! ordinal); no calendar semantics are attached anywhere in the workspace.

use derive_more::{Add, From, Into};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Observation time of a row. Only the ordering matters.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    Add,
    From,
    Into,
)]
pub struct Timestamp(pub i64);

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Unique identifier for an entity (instrument, stock, contract).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    From,
    Into,
)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}
