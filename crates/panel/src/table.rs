//! The panel table: a sorted `(timestamp, entity)` index plus named,
//! row-aligned `f64` columns.
//!
//! NaN is the missing-value marker. Construction accepts ragged input
//! (entities may miss timestamps, records may miss fields); the only fatal
//! conditions are structural ones: duplicate keys and misaligned columns.
//!
//! # Example
//!
//! ```
//! use panel::{PanelTable, Record};
//!
//! let table = PanelTable::from_records(vec![
//!     Record::new(1, 1).field("close", 10.0),
//!     Record::new(1, 2).field("close", 20.0).field("volume", 900.0),
//!     Record::new(2, 1).field("close", 11.0),
//! ])
//! .unwrap();
//! assert_eq!(table.n_rows(), 3);
//! assert!(table.column("volume").unwrap()[0].is_nan()); // ragged field
//! ```

use crate::cross::CrossSectionalView;
use crate::error::{PanelError, PanelResult};
use crate::grouped::EntityGroupedView;
use crate::index::PanelIndex;
use crate::types::{EntityId, Timestamp};

// =============================================================================
// Construction input
// =============================================================================

/// One observation row: a key plus any subset of named fields.
#[derive(Debug, Clone)]
pub struct Record {
    pub timestamp: Timestamp,
    pub entity: EntityId,
    fields: Vec<(String, f64)>,
}

impl Record {
    pub fn new(timestamp: impl Into<Timestamp>, entity: impl Into<EntityId>) -> Self {
        Self {
            timestamp: timestamp.into(),
            entity: entity.into(),
            fields: Vec::new(),
        }
    }

    /// Attach a named value (builder-style).
    pub fn field(mut self, name: impl Into<String>, value: f64) -> Self {
        self.fields.push((name.into(), value));
        self
    }
}

#[derive(Debug, Clone)]
struct Column {
    name: String,
    values: Vec<f64>,
}

// =============================================================================
// PanelTable
// =============================================================================

/// A panel of `f64` observations keyed by `(timestamp, entity)`.
#[derive(Debug, Clone)]
pub struct PanelTable {
    index: PanelIndex,
    columns: Vec<Column>,
}

impl PanelTable {
    /// Build a table from observation records.
    ///
    /// Records are sorted by `(timestamp, entity)`; duplicate keys are a
    /// structural error. The column set is the union of all field names (in
    /// first-seen order after sorting); fields absent from a record become
    /// NaN.
    pub fn from_records(mut records: Vec<Record>) -> PanelResult<Self> {
        records.sort_by_key(|r| (r.timestamp, r.entity));
        let pairs: Vec<(Timestamp, EntityId)> =
            records.iter().map(|r| (r.timestamp, r.entity)).collect();
        let index = PanelIndex::from_sorted_pairs(&pairs)?;

        let mut columns: Vec<Column> = Vec::new();
        for (row, record) in records.iter().enumerate() {
            for (name, value) in &record.fields {
                let pos = match columns.iter().position(|c| &c.name == name) {
                    Some(pos) => pos,
                    None => {
                        columns.push(Column {
                            name: name.clone(),
                            values: vec![f64::NAN; pairs.len()],
                        });
                        columns.len() - 1
                    }
                };
                columns[pos].values[row] = *value;
            }
        }
        Ok(Self { index, columns })
    }

    /// Build a table from already-sorted key pairs and full columns.
    ///
    /// The fast path for generated data: pairs must be sorted and unique,
    /// every column exactly one value per row.
    pub fn from_columns(
        pairs: &[(Timestamp, EntityId)],
        columns: Vec<(String, Vec<f64>)>,
    ) -> PanelResult<Self> {
        let index = PanelIndex::from_sorted_pairs(pairs)?;
        let mut table = Self {
            index,
            columns: Vec::new(),
        };
        for (name, values) in columns {
            table.set_column(name, values)?;
        }
        Ok(table)
    }

    /// An empty-column table over an existing index (factor outputs reuse
    /// their source's index).
    pub fn with_index(index: PanelIndex) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn index(&self) -> &PanelIndex {
        &self.index
    }

    pub fn n_rows(&self) -> usize {
        self.index.n_rows()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn n_entities(&self) -> usize {
        self.index.n_entities()
    }

    pub fn n_timestamps(&self) -> usize {
        self.index.n_timestamps()
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Row-aligned values of a column, if it exists.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.position(name).map(|i| self.columns[i].values.as_slice())
    }

    /// Row-aligned values of a column, or an [`PanelError::UnknownColumn`].
    pub fn require_column(&self, name: &str) -> PanelResult<&[f64]> {
        self.column(name)
            .ok_or_else(|| PanelError::UnknownColumn(name.to_string()))
    }

    /// Insert a column, replacing any existing column of the same name.
    pub fn set_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> PanelResult<()> {
        let name = name.into();
        if values.len() != self.n_rows() {
            return Err(PanelError::LengthMismatch {
                column: name,
                len: values.len(),
                rows: self.n_rows(),
            });
        }
        match self.position(&name) {
            Some(i) => self.columns[i].values = values,
            None => self.columns.push(Column { name, values }),
        }
        Ok(())
    }

    /// Remove a column and return its values.
    pub fn drop_column(&mut self, name: &str) -> PanelResult<Vec<f64>> {
        let i = self
            .position(name)
            .ok_or_else(|| PanelError::UnknownColumn(name.to_string()))?;
        Ok(self.columns.remove(i).values)
    }

    /// Rename a column in place; renaming onto an existing name replaces it.
    pub fn rename_column(&mut self, from: &str, to: impl Into<String>) -> PanelResult<()> {
        let to = to.into();
        let i = self
            .position(from)
            .ok_or_else(|| PanelError::UnknownColumn(from.to_string()))?;
        if let Some(j) = self.position(&to) {
            if j != i {
                self.columns.remove(j);
            }
        }
        let i = self
            .position(from)
            .ok_or_else(|| PanelError::UnknownColumn(from.to_string()))?;
        self.columns[i].name = to;
        Ok(())
    }

    /// A copy carrying only the listed columns (index shared unchanged).
    pub fn select_columns(&self, names: &[&str]) -> PanelResult<Self> {
        let mut out = Self::with_index(self.index.clone());
        for name in names {
            out.set_column(name.to_string(), self.require_column(name)?.to_vec())?;
        }
        Ok(out)
    }

    /// Iterate `(name, values)` over all columns in insertion order.
    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns
            .iter()
            .map(|c| (c.name.as_str(), c.values.as_slice()))
    }

    /// Apply a row-aligned transformation to every column in place.
    pub fn map_columns_in_place(&mut self, mut f: impl FnMut(&str, &mut Vec<f64>)) {
        for c in &mut self.columns {
            f(&c.name, &mut c.values);
        }
    }

    // =========================================================================
    // Row subsetting
    // =========================================================================

    /// Rows whose timestamp lies in `[start, end]`, as a new table.
    pub fn slice_time(&self, start: Timestamp, end: Timestamp) -> PanelResult<Self> {
        let range = self.index.rows_in_time_range(start, end);
        let pairs: Vec<_> = self
            .index
            .row_keys()
            .skip(range.start)
            .take(range.len())
            .collect();
        let index = PanelIndex::from_sorted_pairs(&pairs)?;
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: c.values[range.clone()].to_vec(),
            })
            .collect();
        Ok(Self { index, columns })
    }

    /// Rows where `keep` is true, as a new table.
    pub fn retain_rows(&self, keep: &[bool]) -> PanelResult<Self> {
        if keep.len() != self.n_rows() {
            return Err(PanelError::BadMask {
                len: keep.len(),
                rows: self.n_rows(),
            });
        }
        let pairs: Vec<_> = self
            .index
            .row_keys()
            .zip(keep)
            .filter(|(_, &k)| k)
            .map(|(p, _)| p)
            .collect();
        let index = PanelIndex::from_sorted_pairs(&pairs)?;
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: c
                    .values
                    .iter()
                    .zip(keep)
                    .filter(|(_, &k)| k)
                    .map(|(v, _)| *v)
                    .collect(),
            })
            .collect();
        Ok(Self { index, columns })
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Per-entity (time-series) operations over this table's index.
    pub fn by_entity(&self) -> EntityGroupedView<'_> {
        EntityGroupedView::new(&self.index)
    }

    /// Per-timestamp (cross-sectional) operations over this table's index.
    pub fn by_timestamp(&self) -> CrossSectionalView<'_> {
        CrossSectionalView::new(&self.index)
    }
}

/// Trim two tables to the row keys they share.
///
/// The results have identical indexes, in the common sorted order.
pub fn align(a: &PanelTable, b: &PanelTable) -> PanelResult<(PanelTable, PanelTable)> {
    let mut keep_a = vec![false; a.n_rows()];
    let mut keep_b = vec![false; b.n_rows()];
    let keys_a: Vec<_> = a.index().row_keys().collect();
    let keys_b: Vec<_> = b.index().row_keys().collect();
    let (mut i, mut j) = (0, 0);
    while i < keys_a.len() && j < keys_b.len() {
        match keys_a[i].cmp(&keys_b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                keep_a[i] = true;
                keep_b[j] = true;
                i += 1;
                j += 1;
            }
        }
    }
    Ok((a.retain_rows(&keep_a)?, b.retain_rows(&keep_b)?))
}
