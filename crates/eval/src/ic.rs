//! Information-coefficient analysis of a prediction column.
//!
//! Rows are partitioned into groups (by timestamp, or by integer buckets of
//! any column); each group contributes one Pearson point and one Spearman
//! point, correlating prediction against label across the group's entities.
//! Degenerate groups (fewer than two valid pairs, zero variance) contribute
//! NaN points; the series keeps one slot per group either way, so it can be
//! plotted against its keys.
//!
//! The summary reduces each series to mean (IC) and mean/std (ICIR). Every
//! summary field is an `Option`: no finite point means no IC, and a
//! zero-spread series has no information ratio. Nothing here panics on poor
//! data.

use std::collections::BTreeMap;

use panel::{PanelResult, PanelTable, RollingWindow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::stats::{pearson, spearman};

/// How rows are grouped into correlation cross-sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IcGrouping {
    /// One group per timestamp (the usual cross-sectional IC).
    Timestamp,
    /// Group by `value.floor() as i64` of the named column; rows with a
    /// non-finite key are left out.
    Column(String),
}

/// One correlation point per group, keyed and ordered by group key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcSeries {
    keys: Vec<i64>,
    points: Vec<f64>,
}

impl IcSeries {
    pub fn keys(&self) -> &[i64] {
        &self.keys
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of non-degenerate points.
    pub fn finite_count(&self) -> usize {
        self.points.iter().filter(|v| v.is_finite()).count()
    }

    /// Trailing rolling mean for display; windows touching a degenerate
    /// point are NaN.
    pub fn smoothed(&self, window: usize) -> Vec<f64> {
        let mut win = RollingWindow::new(window);
        self.points
            .iter()
            .map(|&v| {
                win.push(v);
                win.mean().unwrap_or(f64::NAN)
            })
            .collect()
    }
}

/// The four headline statistics of an IC analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IcSummary {
    /// Mean of the finite Pearson points.
    pub ic: Option<f64>,
    /// `ic` divided by the sample std of the Pearson points.
    pub icir: Option<f64>,
    /// Mean of the finite Spearman points.
    pub rank_ic: Option<f64>,
    /// `rank_ic` divided by the sample std of the Spearman points.
    pub rank_icir: Option<f64>,
}

/// Full output of [`ic_analysis`]: both series plus their summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcReport {
    pub ic: IcSeries,
    pub rank_ic: IcSeries,
    pub summary: IcSummary,
}

/// Correlate `pred` against `label` within each group of `table`.
///
/// Errors only if a named column does not exist; everything data-shaped
/// degrades to NaN points and `None` summary fields.
pub fn ic_analysis(
    table: &PanelTable,
    pred: &str,
    label: &str,
    grouping: &IcGrouping,
) -> PanelResult<IcReport> {
    let p = table.require_column(pred)?;
    let l = table.require_column(label)?;

    let groups: Vec<(i64, Vec<usize>)> = match grouping {
        IcGrouping::Timestamp => {
            let index = table.index();
            index
                .timestamp_keys()
                .iter()
                .enumerate()
                .map(|(k, ts)| (ts.0, index.rows_at(k).collect()))
                .collect()
        }
        IcGrouping::Column(name) => {
            let keys = table.require_column(name)?;
            let mut buckets: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
            for (row, &v) in keys.iter().enumerate() {
                if v.is_finite() {
                    buckets.entry(v.floor() as i64).or_default().push(row);
                }
            }
            buckets.into_iter().collect()
        }
    };

    let mut keys = Vec::with_capacity(groups.len());
    let mut ic_points = Vec::with_capacity(groups.len());
    let mut rank_points = Vec::with_capacity(groups.len());
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for (key, rows) in groups {
        xs.clear();
        ys.clear();
        xs.extend(rows.iter().map(|&r| p[r]));
        ys.extend(rows.iter().map(|&r| l[r]));
        keys.push(key);
        ic_points.push(pearson(&xs, &ys).unwrap_or(f64::NAN));
        rank_points.push(spearman(&xs, &ys).unwrap_or(f64::NAN));
    }

    let degenerate = ic_points.iter().filter(|v| v.is_nan()).count();
    debug!(groups = keys.len(), degenerate, "ic series computed");

    let summary = IcSummary {
        ic: mean_finite(&ic_points),
        icir: information_ratio(&ic_points),
        rank_ic: mean_finite(&rank_points),
        rank_icir: information_ratio(&rank_points),
    };
    Ok(IcReport {
        ic: IcSeries {
            keys: keys.clone(),
            points: ic_points,
        },
        rank_ic: IcSeries {
            keys,
            points: rank_points,
        },
        summary,
    })
}

fn mean_finite(points: &[f64]) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in points {
        if v.is_finite() {
            sum += v;
            count += 1;
        }
    }
    (count > 0).then(|| sum / count as f64)
}

/// Mean over sample std of the finite points; needs at least two points and
/// nonzero spread.
fn information_ratio(points: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = points.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() < 2 {
        return None;
    }
    let mean = finite.iter().sum::<f64>() / finite.len() as f64;
    let ss: f64 = finite.iter().map(|v| (v - mean) * (v - mean)).sum();
    let std = (ss / (finite.len() - 1) as f64).sqrt();
    (std > 0.0).then(|| mean / std)
}
