//! The shared row index: sorted `(timestamp, entity)` keys plus the two
//! groupings every computation walks.
//!
//! Rows are sorted by `(timestamp, entity)`, so each timestamp's
//! cross-section is one contiguous row range. Entity histories are strided
//! across those ranges, so they are kept as explicit row-index lists in time
//! order. Both groupings are built once at construction and never change;
//! views borrow the index instead of re-deriving groups.

use crate::error::{PanelError, PanelResult};
use crate::types::{EntityId, Timestamp};
use std::collections::BTreeMap;
use std::ops::Range;

/// Immutable row index of a [`crate::PanelTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelIndex {
    /// Per-row timestamp, sorted non-decreasing.
    timestamps: Vec<Timestamp>,
    /// Per-row entity id; within one timestamp, strictly increasing.
    entities: Vec<EntityId>,
    /// Distinct timestamps, ascending.
    ts_keys: Vec<Timestamp>,
    /// Row range of `ts_keys[k]` is `ts_starts[k]..ts_starts[k + 1]`.
    ts_starts: Vec<usize>,
    /// Distinct entity ids, ascending.
    entity_keys: Vec<EntityId>,
    /// Rows of `entity_keys[k]`, in time order.
    entity_rows: Vec<Vec<usize>>,
}

impl PanelIndex {
    /// Build an index from key pairs already sorted by `(timestamp, entity)`.
    ///
    /// Rejects duplicate keys and out-of-order input.
    pub fn from_sorted_pairs(pairs: &[(Timestamp, EntityId)]) -> PanelResult<Self> {
        for (i, w) in pairs.windows(2).enumerate() {
            match w[0].cmp(&w[1]) {
                std::cmp::Ordering::Less => {}
                std::cmp::Ordering::Equal => {
                    return Err(PanelError::DuplicateKey {
                        timestamp: w[0].0,
                        entity: w[0].1,
                    })
                }
                std::cmp::Ordering::Greater => return Err(PanelError::UnsortedRows(i + 1)),
            }
        }

        let mut ts_keys = Vec::new();
        let mut ts_starts = Vec::new();
        let mut by_entity: BTreeMap<EntityId, Vec<usize>> = BTreeMap::new();
        for (row, &(ts, entity)) in pairs.iter().enumerate() {
            if ts_keys.last() != Some(&ts) {
                ts_keys.push(ts);
                ts_starts.push(row);
            }
            by_entity.entry(entity).or_default().push(row);
        }
        ts_starts.push(pairs.len());

        let (entity_keys, entity_rows) = by_entity.into_iter().unzip();
        Ok(Self {
            timestamps: pairs.iter().map(|p| p.0).collect(),
            entities: pairs.iter().map(|p| p.1).collect(),
            ts_keys,
            ts_starts,
            entity_keys,
            entity_rows,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.timestamps.len()
    }

    pub fn n_timestamps(&self) -> usize {
        self.ts_keys.len()
    }

    pub fn n_entities(&self) -> usize {
        self.entity_keys.len()
    }

    /// Per-row timestamps (row-aligned, non-decreasing).
    pub fn row_timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    /// Per-row entity ids (row-aligned).
    pub fn row_entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Distinct timestamps in ascending order.
    pub fn timestamp_keys(&self) -> &[Timestamp] {
        &self.ts_keys
    }

    /// Distinct entity ids in ascending order.
    pub fn entity_keys(&self) -> &[EntityId] {
        &self.entity_keys
    }

    /// Key of one row.
    pub fn row_key(&self, row: usize) -> (Timestamp, EntityId) {
        (self.timestamps[row], self.entities[row])
    }

    /// All row keys in row order.
    pub fn row_keys(&self) -> impl Iterator<Item = (Timestamp, EntityId)> + '_ {
        self.timestamps
            .iter()
            .copied()
            .zip(self.entities.iter().copied())
    }

    /// Contiguous row range of the `k`-th timestamp.
    pub fn rows_at(&self, k: usize) -> Range<usize> {
        self.ts_starts[k]..self.ts_starts[k + 1]
    }

    /// Rows of the `k`-th entity, in time order.
    pub fn rows_of(&self, k: usize) -> &[usize] {
        &self.entity_rows[k]
    }

    /// Position of a timestamp among the distinct keys, if present.
    pub fn timestamp_position(&self, ts: Timestamp) -> Option<usize> {
        self.ts_keys.binary_search(&ts).ok()
    }

    /// Row range whose timestamps fall in `[start, end]` (inclusive).
    pub fn rows_in_time_range(&self, start: Timestamp, end: Timestamp) -> Range<usize> {
        let lo = self.timestamps.partition_point(|&t| t < start);
        let hi = self.timestamps.partition_point(|&t| t <= end);
        lo..hi.max(lo)
    }

    /// First and last timestamp, if any rows exist.
    pub fn time_bounds(&self) -> Option<(Timestamp, Timestamp)> {
        Some((*self.ts_keys.first()?, *self.ts_keys.last()?))
    }
}
