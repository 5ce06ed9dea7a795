//! Per-timestamp (cross-sectional) operations.
//!
//! A cross-section is the set of entities observed at one timestamp. Ranks
//! and aggregates are computed over the finite values of each section;
//! missing cells neither receive a value (for ranks) nor influence anyone
//! else's. An empty section aggregates to NaN.

use crate::index::PanelIndex;
use crate::window::{quantile_sorted, RollingStat, RollingWindow};

/// Which aggregate a cross-sectional reduction should produce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CsStat {
    Mean,
    Max,
    Min,
    Median,
}

/// Cross-sectional view over a table's index. Cheap to construct.
#[derive(Debug, Clone, Copy)]
pub struct CrossSectionalView<'a> {
    index: &'a PanelIndex,
}

impl<'a> CrossSectionalView<'a> {
    /// View over an index directly (tables forward to this).
    pub fn new(index: &'a PanelIndex) -> Self {
        Self { index }
    }

    fn check_aligned(&self, col: &[f64]) {
        assert_eq!(
            col.len(),
            self.index.n_rows(),
            "column not row-aligned with index"
        );
    }

    /// Average-tie percentile rank within each timestamp.
    ///
    /// Finite values are ranked ascending (1-based); tied values share the
    /// mean of the ranks they span; ranks are divided by the section's
    /// finite count, landing in `(0, 1]`. NaN cells stay NaN.
    ///
    /// # Panics
    /// Panics if `col` is not row-aligned.
    pub fn rank_pct(&self, col: &[f64]) -> Vec<f64> {
        self.check_aligned(col);
        let mut out = vec![f64::NAN; col.len()];
        let mut section: Vec<(f64, usize)> = Vec::new();
        for k in 0..self.index.n_timestamps() {
            section.clear();
            for row in self.index.rows_at(k) {
                if col[row].is_finite() {
                    section.push((col[row], row));
                }
            }
            if section.is_empty() {
                continue;
            }
            section.sort_unstable_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
            let count = section.len() as f64;
            let mut i = 0;
            while i < section.len() {
                let mut j = i;
                while j + 1 < section.len() && section[j + 1].0 == section[i].0 {
                    j += 1;
                }
                // 1-based ranks i+1 ..= j+1, averaged over the tie run
                let rank = (i + j + 2) as f64 / 2.0;
                for &(_, row) in &section[i..=j] {
                    out[row] = rank / count;
                }
                i = j + 1;
            }
        }
        out
    }

    /// One aggregate per timestamp over the section's finite values.
    ///
    /// # Panics
    /// Panics if `col` is not row-aligned.
    pub fn aggregate(&self, col: &[f64], stat: CsStat) -> CsSeries<'a> {
        self.check_aligned(col);
        let mut values = Vec::with_capacity(self.index.n_timestamps());
        let mut finite: Vec<f64> = Vec::new();
        for k in 0..self.index.n_timestamps() {
            finite.clear();
            finite.extend(
                self.index
                    .rows_at(k)
                    .map(|row| col[row])
                    .filter(|v| v.is_finite()),
            );
            let v = if finite.is_empty() {
                f64::NAN
            } else {
                match stat {
                    CsStat::Mean => finite.iter().sum::<f64>() / finite.len() as f64,
                    CsStat::Max => finite.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                    CsStat::Min => finite.iter().copied().fold(f64::INFINITY, f64::min),
                    CsStat::Median => {
                        finite.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap());
                        quantile_sorted(&finite, 0.5)
                    }
                }
            };
            values.push(v);
        }
        CsSeries {
            index: self.index,
            values,
        }
    }

    /// Section mean broadcast back to every row of its timestamp.
    pub fn mean(&self, col: &[f64]) -> Vec<f64> {
        self.aggregate(col, CsStat::Mean).broadcast()
    }

    /// Section max broadcast back to rows.
    pub fn max(&self, col: &[f64]) -> Vec<f64> {
        self.aggregate(col, CsStat::Max).broadcast()
    }

    /// Section min broadcast back to rows.
    pub fn min(&self, col: &[f64]) -> Vec<f64> {
        self.aggregate(col, CsStat::Min).broadcast()
    }

    /// Section median broadcast back to rows.
    pub fn median(&self, col: &[f64]) -> Vec<f64> {
        self.aggregate(col, CsStat::Median).broadcast()
    }
}

/// A per-timestamp series (one value per distinct timestamp, ascending).
///
/// Produced by cross-sectional aggregation; can be rolled over time as a
/// plain series and broadcast back to row alignment.
#[derive(Debug, Clone)]
pub struct CsSeries<'a> {
    index: &'a PanelIndex,
    values: Vec<f64>,
}

impl<'a> CsSeries<'a> {
    /// One value per timestamp key, in key order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Expand back to row alignment: every row receives its timestamp's
    /// value.
    pub fn broadcast(&self) -> Vec<f64> {
        let mut out = vec![f64::NAN; self.index.n_rows()];
        for (k, &v) in self.values.iter().enumerate() {
            for row in self.index.rows_at(k) {
                out[row] = v;
            }
        }
        out
    }

    /// Trailing-window statistic over the series itself (one sequence, no
    /// entity grouping), with the usual strict missing-value rules.
    ///
    /// # Panics
    /// Panics if `window` is zero.
    pub fn rolling(&self, window: usize, stat: RollingStat) -> CsSeries<'a> {
        let mut win = RollingWindow::new(window);
        let mut scratch = Vec::new();
        let values = self
            .values
            .iter()
            .map(|&v| {
                win.push(v);
                win.stat(stat, &mut scratch).unwrap_or(f64::NAN)
            })
            .collect();
        CsSeries {
            index: self.index,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{PanelTable, Record};

    fn table() -> PanelTable {
        PanelTable::from_records(vec![
            Record::new(1, 1).field("x", 3.0),
            Record::new(1, 2).field("x", 1.0),
            Record::new(1, 3).field("x", 2.0),
            Record::new(1, 4).field("x", 2.0),
            Record::new(2, 1).field("x", 5.0),
            Record::new(2, 2).field("x", f64::NAN),
            Record::new(2, 3).field("x", 4.0),
        ])
        .unwrap()
    }

    #[test]
    fn rank_pct_averages_ties() {
        let t = table();
        let r = t.by_timestamp().rank_pct(t.column("x").unwrap());
        // t1 section [3, 1, 2, 2]: ranks 4, 1, 2.5, 2.5 over count 4
        assert_eq!(&r[..4], &[1.0, 0.25, 0.625, 0.625]);
    }

    #[test]
    fn rank_pct_ignores_nan_and_rescales() {
        let t = table();
        let r = t.by_timestamp().rank_pct(t.column("x").unwrap());
        // t2 section [5, NaN, 4]: two finite values, ranks 2 and 1 over 2
        assert_eq!(r[4], 1.0);
        assert!(r[5].is_nan());
        assert_eq!(r[6], 0.5);
    }

    #[test]
    fn aggregates_skip_nan() {
        let t = table();
        let x = t.column("x").unwrap();
        let cs = t.by_timestamp();
        assert_eq!(cs.aggregate(x, CsStat::Mean).values()[1], 4.5);
        assert_eq!(cs.aggregate(x, CsStat::Max).values()[1], 5.0);
        assert_eq!(cs.aggregate(x, CsStat::Min).values()[1], 4.0);
        assert_eq!(cs.aggregate(x, CsStat::Median).values()[0], 2.0);
    }

    #[test]
    fn empty_section_aggregates_to_nan() {
        let t = PanelTable::from_records(vec![
            Record::new(1, 1).field("x", f64::NAN),
            Record::new(2, 1).field("x", 3.0),
        ])
        .unwrap();
        let m = t.by_timestamp().aggregate(t.column("x").unwrap(), CsStat::Mean);
        assert!(m.values()[0].is_nan());
        assert_eq!(m.values()[1], 3.0);
    }

    #[test]
    fn broadcast_repeats_per_section() {
        let t = table();
        let m = t.by_timestamp().mean(t.column("x").unwrap());
        assert_eq!(&m[..4], &[2.0, 2.0, 2.0, 2.0]);
        assert_eq!(&m[4..], &[4.5, 4.5, 4.5]);
    }

    #[test]
    fn series_rolling_is_strict() {
        let t = table();
        let s = t
            .by_timestamp()
            .aggregate(t.column("x").unwrap(), CsStat::Mean);
        let rolled = s.rolling(2, RollingStat::Mean);
        assert!(rolled.values()[0].is_nan());
        assert!((rolled.values()[1] - 3.25).abs() < 1e-12);
    }
}
