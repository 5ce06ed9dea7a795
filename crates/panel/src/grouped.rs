//! Per-entity (time-series) operations.
//!
//! Every operation here partitions rows by entity and walks each entity's
//! history in time order, so a value can only ever depend on the same
//! entity's past. That is the leakage contract the factor layer is built
//! on: nothing cross-entity, nothing from the future (except an explicit
//! negative shift, which exists for label construction and nothing else).
//!
//! Operations take any row-aligned slice (a table column or a scratch
//! vector) and return a freshly allocated row-aligned vector. Cells with
//! insufficient history, or whose window saw a non-finite value, are NaN.

use crate::index::PanelIndex;
use crate::window::{PairWindow, RollingStat, RollingWindow};

/// Time-series view over a table's index. Cheap to construct, holds no data.
#[derive(Debug, Clone, Copy)]
pub struct EntityGroupedView<'a> {
    index: &'a PanelIndex,
}

impl<'a> EntityGroupedView<'a> {
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

    /// Value `n` observations earlier (`n > 0`) or later (`n < 0`) within
    /// the same entity. Out-of-range cells are NaN.
    ///
    /// # Panics
    /// Panics if `col` is not row-aligned.
    pub fn shift(&self, col: &[f64], n: i64) -> Vec<f64> {
        self.check_aligned(col);
        let mut out = vec![f64::NAN; col.len()];
        for k in 0..self.index.n_entities() {
            let rows = self.index.rows_of(k);
            let m = rows.len() as i64;
            for i in 0..m {
                let src = i - n;
                if (0..m).contains(&src) {
                    out[rows[i as usize]] = col[rows[src as usize]];
                }
            }
        }
        out
    }

    /// Trailing-window statistic per entity.
    ///
    /// A cell is NaN until the entity has `window` observations ending
    /// there, and whenever any of those observations is non-finite.
    ///
    /// # Panics
    /// Panics if `col` is not row-aligned, `window` is zero, or a
    /// `Quantile` argument lies outside `[0, 1]`.
    pub fn rolling(&self, col: &[f64], window: usize, stat: RollingStat) -> Vec<f64> {
        self.check_aligned(col);
        let mut out = vec![f64::NAN; col.len()];
        let mut win = RollingWindow::new(window);
        let mut scratch = Vec::new();
        for k in 0..self.index.n_entities() {
            win.clear();
            for &row in self.index.rows_of(k) {
                win.push(col[row]);
                if let Some(v) = win.stat(stat, &mut scratch) {
                    out[row] = v;
                }
            }
        }
        out
    }

    /// Trailing-window Pearson correlation between two row-aligned series,
    /// per entity, pairing observations row by row.
    ///
    /// NaN when the window is short, any pair in it is non-finite, or
    /// either side has zero variance.
    ///
    /// # Panics
    /// Panics if either slice is not row-aligned or `window` is zero.
    pub fn rolling_corr(&self, a: &[f64], b: &[f64], window: usize) -> Vec<f64> {
        self.check_aligned(a);
        self.check_aligned(b);
        let mut out = vec![f64::NAN; a.len()];
        for k in 0..self.index.n_entities() {
            let mut win = PairWindow::new(window);
            for &row in self.index.rows_of(k) {
                win.push(a[row], b[row]);
                if let Some(v) = win.corr() {
                    out[row] = v;
                }
            }
        }
        out
    }

    /// Run an arbitrary series transform over each entity's contiguous
    /// history and scatter the result back to row order.
    ///
    /// The closure receives the entity's values oldest-first and must
    /// return exactly as many values.
    ///
    /// # Panics
    /// Panics if `col` is not row-aligned or the closure changes length.
    pub fn apply(&self, col: &[f64], mut f: impl FnMut(&[f64]) -> Vec<f64>) -> Vec<f64> {
        self.check_aligned(col);
        let mut out = vec![f64::NAN; col.len()];
        let mut buf = Vec::new();
        for k in 0..self.index.n_entities() {
            let rows = self.index.rows_of(k);
            buf.clear();
            buf.extend(rows.iter().map(|&r| col[r]));
            let res = f(&buf);
            assert_eq!(res.len(), rows.len(), "apply closure must preserve length");
            for (i, &row) in rows.iter().enumerate() {
                out[row] = res[i];
            }
        }
        out
    }

    /// Carry the last finite value forward within each entity. Leading
    /// missing cells stay missing.
    ///
    /// # Panics
    /// Panics if `col` is not row-aligned.
    pub fn forward_fill(&self, col: &[f64]) -> Vec<f64> {
        self.check_aligned(col);
        let mut out = vec![f64::NAN; col.len()];
        for k in 0..self.index.n_entities() {
            let mut last = f64::NAN;
            for &row in self.index.rows_of(k) {
                if col[row].is_finite() {
                    last = col[row];
                }
                out[row] = last;
            }
        }
        out
    }
}
