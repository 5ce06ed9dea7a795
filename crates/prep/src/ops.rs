//! Column cleaning and normalization for model-ready panels.
//!
//! Everything here mutates columns of a [`PanelTable`] in place: global
//! masking and filling first, then per-timestamp (cross-sectional)
//! transforms. Degenerate cross-sections (too few finite values, zero
//! spread) normalize to NaN rather than erroring; [`drop_missing_rows`]
//! sweeps such rows out when the pipeline wants a dense table.

use panel::window::quantile_sorted;
use panel::{EntityGroupedView, PanelResult, PanelTable};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Consistency constant between the MAD and the standard deviation of a
/// normal distribution.
pub const MAD_SCALE: f64 = 1.4826;

/// Default clip width for [`cs_winsorize_mad`], in scaled MADs.
pub const DEFAULT_WINSOR_MADS: f64 = 3.0;

/// Default trailing window for [`ts_decay_linear`].
pub const DEFAULT_DECAY_WINDOW: usize = 5;

// ============================================================
// Whole-table operators
// ============================================================

/// Replace every non-finite cell (±∞ as well as NaN) with NaN, so later
/// stages only ever see one missing-value marker.
pub fn mask_non_finite(table: &mut PanelTable) {
    table.map_columns_in_place(|_, values| {
        for v in values.iter_mut() {
            if !v.is_finite() {
                *v = f64::NAN;
            }
        }
    });
}

/// Forward-fill every column per entity. Leading missing cells stay
/// missing.
pub fn forward_fill_columns(table: &mut PanelTable) {
    let index = table.index().clone();
    let grouped = EntityGroupedView::new(&index);
    table.map_columns_in_place(|_, values| *values = grouped.forward_fill(values));
}

/// Rows where every column is finite, as a new table.
pub fn drop_missing_rows(table: &PanelTable) -> PanelResult<PanelTable> {
    let mut keep = vec![true; table.n_rows()];
    for (_, values) in table.iter_columns() {
        for (k, v) in keep.iter_mut().zip(values) {
            if !v.is_finite() {
                *k = false;
            }
        }
    }
    table.retain_rows(&keep)
}

// ============================================================
// Cross-sectional operators
// ============================================================

/// Run `f` over each timestamp's slice of `column`, writing the result
/// back into the table.
fn transform_sections(
    table: &mut PanelTable,
    column: &str,
    mut f: impl FnMut(&mut [f64]),
) -> PanelResult<()> {
    let mut values = table.require_column(column)?.to_vec();
    let index = table.index();
    for k in 0..index.n_timestamps() {
        f(&mut values[index.rows_at(k)]);
    }
    table.set_column(column, values)
}

fn finite_sorted(section: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = section.iter().copied().filter(|v| v.is_finite()).collect();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

/// Clip `column` per timestamp to `median ± n_mads · 1.4826 · MAD`.
///
/// A zero-MAD cross-section collapses every finite value onto its median.
/// Missing cells are left alone.
pub fn cs_winsorize_mad(table: &mut PanelTable, column: &str, n_mads: f64) -> PanelResult<()> {
    transform_sections(table, column, |section| {
        let finite = finite_sorted(section);
        if finite.is_empty() {
            return;
        }
        let med = quantile_sorted(&finite, 0.5);
        let mut dev: Vec<f64> = finite.iter().map(|v| (v - med).abs()).collect();
        dev.sort_by(|a, b| a.total_cmp(b));
        let half = n_mads * MAD_SCALE * quantile_sorted(&dev, 0.5);
        let (lo, hi) = (med - half, med + half);
        for v in section.iter_mut() {
            if *v < lo {
                *v = lo;
            } else if *v > hi {
                *v = hi;
            }
        }
    })
}

/// Cross-sectional z-score: `(x - mean) / sample std` per timestamp.
/// Sections with fewer than two finite values or zero spread become NaN.
pub fn cs_zscore(table: &mut PanelTable, column: &str) -> PanelResult<()> {
    transform_sections(table, column, |section| {
        let finite: Vec<f64> = section.iter().copied().filter(|v| v.is_finite()).collect();
        let n = finite.len();
        let (mean, std) = if n >= 2 {
            let mean = finite.iter().sum::<f64>() / n as f64;
            let var = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            (mean, var.sqrt())
        } else {
            (f64::NAN, 0.0)
        };
        for v in section.iter_mut() {
            *v = if std > 0.0 { (*v - mean) / std } else { f64::NAN };
        }
    })
}

/// Robust cross-sectional z-score: `(x - median) / (1.4826 · MAD)` per
/// timestamp. Zero-MAD sections become NaN.
pub fn cs_robust_zscore(table: &mut PanelTable, column: &str) -> PanelResult<()> {
    transform_sections(table, column, |section| {
        let finite = finite_sorted(section);
        if finite.is_empty() {
            for v in section.iter_mut() {
                *v = f64::NAN;
            }
            return;
        }
        let med = quantile_sorted(&finite, 0.5);
        let mut dev: Vec<f64> = finite.iter().map(|v| (v - med).abs()).collect();
        dev.sort_by(|a, b| a.total_cmp(b));
        let denom = MAD_SCALE * quantile_sorted(&dev, 0.5);
        for v in section.iter_mut() {
            *v = if denom > 0.0 { (*v - med) / denom } else { f64::NAN };
        }
    })
}

/// Cross-sectional min-max: `(x - min) / (max - min)` per timestamp.
/// Constant sections become NaN.
pub fn cs_minmax(table: &mut PanelTable, column: &str) -> PanelResult<()> {
    transform_sections(table, column, |section| {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in section.iter().filter(|v| v.is_finite()) {
            min = min.min(*v);
            max = max.max(*v);
        }
        for v in section.iter_mut() {
            *v = if max > min { (*v - min) / (max - min) } else { f64::NAN };
        }
    })
}

/// Replace `column` with its cross-sectional percentile rank (average
/// ties, values in `(0, 1]`).
pub fn cs_rank(table: &mut PanelTable, column: &str) -> PanelResult<()> {
    let values = table.require_column(column)?.to_vec();
    let ranks = table.by_timestamp().rank_pct(&values);
    table.set_column(column, ranks)
}

// ============================================================
// Time-series operators
// ============================================================

/// Per-entity linearly-weighted trailing mean of `column`: the newest
/// observation weighs `window`, the oldest weighs 1. Strict windows: any
/// missing value inside one, or insufficient history, gives NaN.
pub fn ts_decay_linear(table: &mut PanelTable, column: &str, window: usize) -> PanelResult<()> {
    if window == 0 {
        return Err(panel::PanelError::BadWindow(window, 1));
    }
    let index = table.index().clone();
    let grouped = EntityGroupedView::new(&index);
    let values = table.require_column(column)?.to_vec();
    let out = grouped.apply(&values, |series| decay_kernel(series, window));
    table.set_column(column, out)
}

fn decay_kernel(series: &[f64], window: usize) -> Vec<f64> {
    let weight_sum = (window * (window + 1) / 2) as f64;
    let mut out = vec![f64::NAN; series.len()];
    if series.len() < window {
        return out;
    }
    for i in (window - 1)..series.len() {
        let win = &series[i + 1 - window..=i];
        if win.iter().all(|v| v.is_finite()) {
            let mut acc = 0.0;
            for (j, v) in win.iter().enumerate() {
                acc += v * (j + 1) as f64;
            }
            out[i] = acc / weight_sum;
        }
    }
    out
}

// ============================================================
// Pipeline
// ============================================================

/// Which cross-sectional normalization [`Preprocessor::apply`] finishes
/// with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormMethod {
    Zscore,
    RobustZscore,
    MinMax,
    Rank,
}

impl Default for NormMethod {
    fn default() -> Self {
        NormMethod::Zscore
    }
}

impl std::str::FromStr for NormMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zscore" => Ok(NormMethod::Zscore),
            "robust" | "robust_zscore" => Ok(NormMethod::RobustZscore),
            "minmax" => Ok(NormMethod::MinMax),
            "rank" => Ok(NormMethod::Rank),
            other => Err(format!(
                "unknown normalization '{other}' (expected zscore, robust, minmax or rank)"
            )),
        }
    }
}

impl std::fmt::Display for NormMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NormMethod::Zscore => "zscore",
            NormMethod::RobustZscore => "robust",
            NormMethod::MinMax => "minmax",
            NormMethod::Rank => "rank",
        };
        f.write_str(name)
    }
}

/// The standard cleaning pipeline applied to a feature table before
/// fitting: mask, forward-fill, drop still-missing rows, winsorize,
/// optionally decay along time, then normalize per cross-section.
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessor {
    /// Final cross-sectional normalization.
    pub norm: NormMethod,
    /// Trailing [`ts_decay_linear`] window, if any. Decaying re-introduces
    /// warm-up NaNs, so the pipeline drops rows a second time after it.
    pub decay: Option<usize>,
    /// Clip width for the winsorize stage, in scaled MADs.
    pub winsor_mads: f64,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            norm: NormMethod::default(),
            decay: None,
            winsor_mads: DEFAULT_WINSOR_MADS,
        }
    }
}

impl Preprocessor {
    /// Run the full pipeline over every column, returning a new table.
    pub fn apply(&self, table: &PanelTable) -> PanelResult<PanelTable> {
        let mut out = table.clone();
        mask_non_finite(&mut out);
        forward_fill_columns(&mut out);
        out = drop_missing_rows(&out)?;
        let names: Vec<String> = out.column_names().iter().map(|s| s.to_string()).collect();
        for name in &names {
            cs_winsorize_mad(&mut out, name, self.winsor_mads)?;
        }
        if let Some(window) = self.decay {
            for name in &names {
                ts_decay_linear(&mut out, name, window)?;
            }
            out = drop_missing_rows(&out)?;
        }
        for name in &names {
            match self.norm {
                NormMethod::Zscore => cs_zscore(&mut out, name)?,
                NormMethod::RobustZscore => cs_robust_zscore(&mut out, name)?,
                NormMethod::MinMax => cs_minmax(&mut out, name)?,
                NormMethod::Rank => cs_rank(&mut out, name)?,
            }
        }
        debug!(
            rows_in = table.n_rows(),
            rows_out = out.n_rows(),
            norm = %self.norm,
            "preprocessing applied"
        );
        Ok(out)
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use panel::Record;

    /// One timestamp, `values[i]` on entity `i + 1`.
    fn one_section(values: &[f64]) -> PanelTable {
        let records = values
            .iter()
            .enumerate()
            .map(|(i, &v)| Record::new(1, i as u32 + 1).field("x", v))
            .collect();
        PanelTable::from_records(records).unwrap()
    }

    #[test]
    fn mask_turns_infinities_into_nan() {
        let mut table = one_section(&[1.0, f64::INFINITY, f64::NEG_INFINITY, f64::NAN]);
        mask_non_finite(&mut table);
        let x = table.column("x").unwrap();
        assert_eq!(x[0], 1.0);
        assert!(x[1].is_nan() && x[2].is_nan() && x[3].is_nan());
    }

    #[test]
    fn winsorize_clips_outliers_to_the_mad_band() {
        let mut table = one_section(&[1.0, 2.0, 3.0, 4.0, 100.0]);
        cs_winsorize_mad(&mut table, "x", 3.0).unwrap();
        let x = table.column("x").unwrap();
        // median 3, MAD 1: the band is 3 ± 3 · 1.4826
        let hi = 3.0 + 3.0 * MAD_SCALE;
        assert_eq!(&x[..4], &[1.0, 2.0, 3.0, 4.0]);
        assert!((x[4] - hi).abs() < 1e-12);
    }

    #[test]
    fn winsorize_leaves_missing_cells_alone() {
        let mut table = one_section(&[1.0, f64::NAN, 50.0, 2.0, 3.0]);
        cs_winsorize_mad(&mut table, "x", 3.0).unwrap();
        let x = table.column("x").unwrap();
        assert!(x[1].is_nan());
        assert!(x[2] < 50.0);
    }

    #[test]
    fn zscore_standardizes_each_section() {
        let mut records = Vec::new();
        for (e, v) in [(1u32, 1.0), (2, 2.0), (3, 3.0)] {
            records.push(Record::new(1, e).field("x", v));
        }
        // second timestamp has a different scale
        for (e, v) in [(1u32, 10.0), (2, 30.0), (3, 50.0)] {
            records.push(Record::new(2, e).field("x", v));
        }
        let mut table = PanelTable::from_records(records).unwrap();
        cs_zscore(&mut table, "x").unwrap();
        let x = table.column("x").unwrap();
        assert_eq!(&x[..3], &[-1.0, 0.0, 1.0]);
        assert_eq!(&x[3..], &[-1.0, 0.0, 1.0]);
    }

    #[test]
    fn degenerate_sections_normalize_to_nan() {
        let mut constant = one_section(&[5.0, 5.0, 5.0]);
        cs_zscore(&mut constant, "x").unwrap();
        assert!(constant.column("x").unwrap().iter().all(|v| v.is_nan()));

        let mut single = one_section(&[5.0]);
        cs_zscore(&mut single, "x").unwrap();
        assert!(single.column("x").unwrap()[0].is_nan());

        let mut flat = one_section(&[2.0, 2.0, 2.0]);
        cs_robust_zscore(&mut flat, "x").unwrap();
        assert!(flat.column("x").unwrap().iter().all(|v| v.is_nan()));

        let mut flat = one_section(&[2.0, 2.0]);
        cs_minmax(&mut flat, "x").unwrap();
        assert!(flat.column("x").unwrap().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn robust_zscore_matches_hand_values() {
        let mut table = one_section(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        cs_robust_zscore(&mut table, "x").unwrap();
        let x = table.column("x").unwrap();
        // median 3, MAD 1
        assert!((x[0] + 2.0 / MAD_SCALE).abs() < 1e-12);
        assert_eq!(x[2], 0.0);
        assert!((x[4] - 2.0 / MAD_SCALE).abs() < 1e-12);
    }

    #[test]
    fn minmax_maps_onto_the_unit_interval() {
        let mut table = one_section(&[2.0, 4.0, 6.0]);
        cs_minmax(&mut table, "x").unwrap();
        assert_eq!(table.column("x").unwrap(), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn rank_averages_ties() {
        let mut table = one_section(&[3.0, 1.0, 2.0, 2.0]);
        cs_rank(&mut table, "x").unwrap();
        assert_eq!(table.column("x").unwrap(), &[1.0, 0.25, 0.625, 0.625]);
    }

    #[test]
    fn decay_weights_recent_observations_more() {
        let mut records = Vec::new();
        for (t, v) in [(1i64, 1.0), (2, 2.0), (3, 3.0), (4, 4.0)] {
            records.push(Record::new(t, 1).field("x", v));
        }
        let mut table = PanelTable::from_records(records).unwrap();
        ts_decay_linear(&mut table, "x", 3).unwrap();
        let x = table.column("x").unwrap();
        assert!(x[0].is_nan() && x[1].is_nan());
        // (1·1 + 2·2 + 3·3) / 6
        assert!((x[2] - 14.0 / 6.0).abs() < 1e-12);
        assert!((x[3] - 20.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn decay_windows_are_strict_about_gaps() {
        let mut records = Vec::new();
        for (t, v) in [(1i64, 1.0), (2, f64::NAN), (3, 3.0), (4, 4.0), (5, 5.0)] {
            records.push(Record::new(t, 1).field("x", v));
        }
        let mut table = PanelTable::from_records(records).unwrap();
        ts_decay_linear(&mut table, "x", 2).unwrap();
        let x = table.column("x").unwrap();
        assert!(x[1].is_nan() && x[2].is_nan());
        assert!((x[3] - (3.0 + 2.0 * 4.0) / 3.0).abs() < 1e-12);
        assert!((x[4] - (4.0 + 2.0 * 5.0) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn zero_decay_window_is_rejected() {
        let mut table = one_section(&[1.0]);
        assert!(ts_decay_linear(&mut table, "x", 0).is_err());
    }

    #[test]
    fn preprocessor_masks_fills_drops_and_normalizes() {
        let mut records = Vec::new();
        for t in 1..=4i64 {
            // entity 1 starts late; entity 2 has an inf and a gap
            let a = if t == 1 { f64::NAN } else { t as f64 };
            let b = match t {
                2 => f64::INFINITY,
                3 => f64::NAN,
                _ => 10.0 * t as f64,
            };
            records.push(Record::new(t, 1).field("x", a));
            records.push(Record::new(t, 2).field("x", b));
        }
        let table = PanelTable::from_records(records).unwrap();
        let prepped = Preprocessor::default().apply(&table).unwrap();
        // entity 1's unfillable first row is dropped; the inf and the gap
        // forward-fill to 10 and survive
        assert_eq!(prepped.n_rows(), 7);
        assert_eq!(prepped.n_timestamps(), 4);
        let x = prepped.column("x").unwrap();
        // timestamp 1 keeps only entity 2, and a one-entity section has no
        // zscore
        assert!(x[0].is_nan());
        // every later section holds two entities, so zscore gives ±1/√2
        let z = 1.0 / 2.0f64.sqrt();
        assert!(x[1..].iter().all(|v| (v.abs() - z).abs() < 1e-12));
    }

    #[test]
    fn preprocessor_decay_drops_warmup_rows() {
        let mut records = Vec::new();
        for t in 1..=6i64 {
            records.push(Record::new(t, 1).field("x", t as f64));
            records.push(Record::new(t, 2).field("x", 2.0 * t as f64));
        }
        let table = PanelTable::from_records(records).unwrap();
        let prep = Preprocessor {
            decay: Some(3),
            ..Preprocessor::default()
        };
        let prepped = prep.apply(&table).unwrap();
        assert_eq!(prepped.n_timestamps(), 4);
        assert_eq!(prepped.n_rows(), 8);
    }

    #[test]
    fn norm_method_round_trips_through_strings() {
        for (name, method) in [
            ("zscore", NormMethod::Zscore),
            ("robust", NormMethod::RobustZscore),
            ("minmax", NormMethod::MinMax),
            ("rank", NormMethod::Rank),
        ] {
            assert_eq!(name.parse::<NormMethod>().unwrap(), method);
            assert_eq!(method.to_string(), name);
        }
        assert!("median".parse::<NormMethod>().is_err());
    }
}
