//! The factor builder: raw price/volume panels in, a dense factor panel out.
//!
//! Every factor family is gated on the raw inputs it needs. Gates are
//! resolved once, up front, against the declared column mapping and the
//! table's actual columns; a family whose inputs are unavailable is skipped
//! silently (debug-logged), never an error. The surviving families are
//! planned as independent column recipes and evaluated through
//! [`parallel::map_vec`], so column order stays deterministic whether or not
//! the fan-out runs on threads.
//!
//! Shared intermediate series (per-step returns, the cross-sectional mean
//! return, volume change, per-bar value-weighted price) are computed once
//! into scoped buffers before planning. The input table is never mutated;
//! the output is a new table on the same index.

use panel::{
    CrossSectionalView, CsSeries, CsStat, EntityGroupedView, PanelError, PanelResult, PanelTable,
    RollingStat,
};
use tracing::debug;

use crate::fill;
use crate::indicators::{self, MACD_FAST, MACD_SIGNAL, MACD_SLOW};

/// Trailing-window lengths used when none are configured.
pub const DEFAULT_WINDOWS: [usize; 5] = [5, 10, 20, 30, 60];

/// Epsilon added to (high − low) denominators so doji bars divide cleanly.
const RANGE_EPSILON: f64 = 1e-12;

/// Stochastic (%K) lookback and %D smoothing length.
const KDJ_WINDOW: usize = 9;
const KDJ_SMOOTH: usize = 3;

/// Deepest plain-return lag (`RET1_1` .. `RET1_4`).
const MOMENTUM_LAGS: i64 = 4;

/// One deferred factor column: evaluated after planning, possibly on a
/// worker thread.
type Recipe<'p> = Box<dyn Fn() -> Vec<f64> + Send + Sync + 'p>;

// =============================================================================
// Configuration
// =============================================================================

/// Maps the conventional input roles onto table column names.
///
/// `None` declares the input absent, dropping every factor family that needs
/// it. The default maps each role to its own name.
#[derive(Debug, Clone)]
pub struct SourceColumns {
    pub close: Option<String>,
    pub open: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    pub volume: Option<String>,
    pub amount: Option<String>,
}

impl Default for SourceColumns {
    fn default() -> Self {
        Self {
            close: Some("close".into()),
            open: Some("open".into()),
            high: Some("high".into()),
            low: Some("low".into()),
            volume: Some("volume".into()),
            amount: Some("amount".into()),
        }
    }
}

impl SourceColumns {
    /// Price-only mapping: close/open/high/low present, volume and amount
    /// declared absent.
    pub fn prices_only() -> Self {
        Self {
            volume: None,
            amount: None,
            ..Self::default()
        }
    }
}

// =============================================================================
// FactorBuilder
// =============================================================================

/// Computes the full hand-crafted factor set over a panel.
#[derive(Debug, Clone)]
pub struct FactorBuilder {
    columns: SourceColumns,
    windows: Vec<usize>,
    force_sequential: bool,
}

impl FactorBuilder {
    /// A builder over the given column mapping and window list.
    ///
    /// The window list must be non-empty with every entry at least 2 (a
    /// one-row window has no sample standard deviation).
    pub fn new(columns: SourceColumns, windows: Vec<usize>) -> PanelResult<Self> {
        if windows.is_empty() {
            return Err(PanelError::EmptyWindows);
        }
        for &w in &windows {
            if w < 2 {
                return Err(PanelError::BadWindow(w, 2));
            }
        }
        Ok(Self {
            columns,
            windows,
            force_sequential: false,
        })
    }

    /// Conventional column names and the default window list.
    pub fn standard() -> Self {
        Self {
            columns: SourceColumns::default(),
            windows: DEFAULT_WINDOWS.to_vec(),
            force_sequential: false,
        }
    }

    /// Evaluate recipes sequentially even when the `rayon` feature is on.
    pub fn force_sequential(mut self, yes: bool) -> Self {
        self.force_sequential = yes;
        self
    }

    pub fn windows(&self) -> &[usize] {
        &self.windows
    }

    /// Build the factor table.
    ///
    /// The output shares the input's `(timestamp, entity)` index exactly and
    /// contains only factor columns, forward-then-mean filled; a column with
    /// no defined cell anywhere stays all-missing.
    pub fn build(&self, table: &PanelTable) -> PanelResult<PanelTable> {
        let index = table.index();
        let grouped = EntityGroupedView::new(index);
        let cross = CrossSectionalView::new(index);

        let close = resolve(table, "close", self.columns.close.as_deref());
        let open = resolve(table, "open", self.columns.open.as_deref());
        let high = resolve(table, "high", self.columns.high.as_deref());
        let low = resolve(table, "low", self.columns.low.as_deref());
        let volume = resolve(table, "volume", self.columns.volume.as_deref());
        let amount = resolve(table, "amount", self.columns.amount.as_deref());

        // ---------------------------------------------------------------------
        // Shared scratch series (scoped to this call; recipes borrow them)
        // ---------------------------------------------------------------------

        let ret = close.map(|c| ratio_minus_one(c, &grouped.shift(c, 1)));
        let mean_ret = ret.as_deref().map(|r| cross.mean(r));
        let rank_ret = ret.as_deref().map(|r| cross.rank_pct(r));
        let dif_rows = close.map(|c| grouped.apply(c, |s| indicators::dif(s, MACD_FAST, MACD_SLOW)));
        let kmid = match (close, open) {
            (Some(c), Some(o)) => Some(ratio_minus_one(c, o)),
            _ => None,
        };
        let kmid_cs_mean: Option<CsSeries<'_>> =
            kmid.as_deref().map(|k| cross.aggregate(k, CsStat::Mean));
        let kdj_k = match (close, open, high, low) {
            (Some(c), Some(_), Some(h), Some(l)) => {
                let l9 = grouped.rolling(l, KDJ_WINDOW, RollingStat::Min);
                let h9 = grouped.rolling(h, KDJ_WINDOW, RollingStat::Max);
                Some(percent_k(c, &l9, &h9))
            }
            _ => None,
        };
        let chg_vol = volume.map(|v| ratio_minus_one(v, &grouped.shift(v, 1)));
        let vprice = match (volume, amount) {
            (Some(v), Some(a)) => Some(div(a, v)),
            _ => None,
        };

        // ---------------------------------------------------------------------
        // Column plan, in output order
        // ---------------------------------------------------------------------

        let mut plan: Vec<(String, Recipe<'_>)> = Vec::new();

        if let (Some(c), Some(r), Some(mr), Some(rr), Some(d)) = (
            close,
            ret.as_deref(),
            mean_ret.as_deref(),
            rank_ret.as_deref(),
            dif_rows.as_deref(),
        ) {
            plan.push(("DIF".into(), Box::new(move || d.to_vec())));
            plan.push((
                "DEA".into(),
                Box::new(move || grouped.apply(d, |s| indicators::dea(s, MACD_SIGNAL))),
            ));
            for i in 1..=MOMENTUM_LAGS {
                plan.push((
                    format!("RET1_{i}"),
                    Box::new(move || ratio_minus_one(c, &grouped.shift(c, i))),
                ));
                plan.push((
                    format!("RET2_{i}"),
                    Box::new(move || cross.rank_pct(&ratio_minus_one(c, &grouped.shift(c, i)))),
                ));
            }
            for &w in &self.windows {
                plan.push((
                    format!("CLOSE{w}"),
                    Box::new(move || div(&grouped.shift(c, w as i64), c)),
                ));
                plan.push((
                    format!("ROC{w}"),
                    Box::new(move || {
                        let s = grouped.shift(c, w as i64);
                        c.iter()
                            .zip(&s)
                            .map(|(x, p)| (x / p - 1.0) / w as f64)
                            .collect()
                    }),
                ));
                plan.push((
                    format!("BETA{w}"),
                    Box::new(move || {
                        let s = grouped.shift(c, w as i64);
                        c.iter()
                            .zip(&s)
                            .map(|(x, p)| (x - p) / (x * w as f64))
                            .collect()
                    }),
                ));
                for (name, stat) in [
                    ("MA", RollingStat::Mean),
                    ("STD", RollingStat::Std),
                    ("MAX", RollingStat::Max),
                    ("MIN", RollingStat::Min),
                    ("QTLU", RollingStat::Quantile(0.8)),
                    ("QTLD", RollingStat::Quantile(0.2)),
                ] {
                    plan.push((
                        format!("{name}{w}"),
                        Box::new(move || div(&grouped.rolling(c, w, stat), c)),
                    ));
                }
                plan.push((
                    format!("MA2_{w}"),
                    Box::new(move || grouped.rolling(r, w, RollingStat::Mean)),
                ));
                plan.push((
                    format!("STD2_{w}"),
                    Box::new(move || grouped.rolling(r, w, RollingStat::Std)),
                ));
                plan.push((
                    format!("CORR{w}"),
                    Box::new(move || grouped.rolling_corr(r, mr, w)),
                ));
                plan.push((
                    format!("CORR2_{w}"),
                    Box::new(move || grouped.rolling_corr(rr, mr, w)),
                ));
                plan.push((
                    format!("RSI{w}"),
                    Box::new(move || grouped.apply(c, |s| indicators::rsi(s, w))),
                ));
            }
        }

        if let (Some(c), Some(o), Some(k), Some(km)) = (
            close,
            open,
            kmid.as_deref(),
            kmid_cs_mean.as_ref(),
        ) {
            plan.push((
                "DELTA".into(),
                Box::new(move || cross.rank_pct(&sub(c, o))),
            ));
            plan.push(("KMID".into(), Box::new(move || k.to_vec())));
            for (n, stat) in [
                (1, CsStat::Mean),
                (2, CsStat::Max),
                (3, CsStat::Min),
                (4, CsStat::Median),
            ] {
                plan.push((
                    format!("PERF{n}"),
                    Box::new(move || div(k, &cross.aggregate(k, stat).broadcast())),
                ));
            }
            for &w in &self.windows {
                for (n, stat) in [
                    (1, RollingStat::Mean),
                    (2, RollingStat::Max),
                    (3, RollingStat::Min),
                    (4, RollingStat::Median),
                ] {
                    plan.push((
                        format!("IDX{n}_{w}"),
                        Box::new(move || div(k, &km.rolling(w, stat).broadcast())),
                    ));
                }
            }
        }

        if let (Some(_), Some(o), Some(h)) = (close, open, high) {
            plan.push(("KUP".into(), Box::new(move || div(&sub(h, o), o))));
        }

        if let (Some(c), Some(o), Some(h), Some(l), Some(k)) =
            (close, open, high, low, kdj_k.as_deref())
        {
            plan.push(("KDJ_K".into(), Box::new(move || k.to_vec())));
            plan.push((
                "KDJ_D".into(),
                Box::new(move || grouped.rolling(k, KDJ_SMOOTH, RollingStat::Mean)),
            ));
            plan.push(("KLEN".into(), Box::new(move || div(&sub(h, l), o))));
            plan.push((
                "KMID2".into(),
                Box::new(move || {
                    (0..c.len())
                        .map(|i| (c[i] - o[i]) / (h[i] - l[i] + RANGE_EPSILON))
                        .collect()
                }),
            ));
            plan.push((
                "KUP2".into(),
                Box::new(move || {
                    (0..c.len())
                        .map(|i| (h[i] - o[i]) / (h[i] - l[i] + RANGE_EPSILON))
                        .collect()
                }),
            ));
            plan.push(("KLOW".into(), Box::new(move || div(&sub(c, l), o))));
            plan.push((
                "KLOW2".into(),
                Box::new(move || {
                    (0..c.len())
                        .map(|i| (c[i] - l[i]) / (h[i] - l[i] + RANGE_EPSILON))
                        .collect()
                }),
            ));
            plan.push((
                "KSFT".into(),
                Box::new(move || {
                    (0..c.len())
                        .map(|i| (2.0 * c[i] - h[i] - l[i]) / o[i])
                        .collect()
                }),
            ));
            plan.push((
                "KSFT2".into(),
                Box::new(move || {
                    (0..c.len())
                        .map(|i| (2.0 * c[i] - h[i] - l[i]) / (h[i] - l[i] + RANGE_EPSILON))
                        .collect()
                }),
            ));
            plan.push((
                "VWAP".into(),
                Box::new(move || {
                    (0..c.len())
                        .map(|i| (h[i] + l[i] + c[i]) / (3.0 * o[i]))
                        .collect()
                }),
            ));
            for &w in &self.windows {
                plan.push((
                    format!("RSV{w}"),
                    Box::new(move || {
                        let lo = grouped.rolling(l, w, RollingStat::Min);
                        let hi = grouped.rolling(h, w, RollingStat::Max);
                        band_position(c, &lo, &hi)
                    }),
                ));
            }
        }

        if let Some(o) = open {
            for &w in &self.windows {
                plan.push((
                    format!("OPEN{w}"),
                    Box::new(move || div(&grouped.shift(o, w as i64), o)),
                ));
            }
        }
        if let Some(h) = high {
            for &w in &self.windows {
                plan.push((
                    format!("HIGH{w}"),
                    Box::new(move || div(&grouped.shift(h, w as i64), h)),
                ));
            }
        }
        if let (Some(c), Some(h), Some(l)) = (close, high, low) {
            plan.push((
                "MEAN1".into(),
                Box::new(move || {
                    (0..c.len())
                        .map(|i| (h[i] + l[i]) / (2.0 * c[i]))
                        .collect()
                }),
            ));
        }
        if let Some(l) = low {
            for &w in &self.windows {
                plan.push((
                    format!("LOW{w}"),
                    Box::new(move || div(&grouped.shift(l, w as i64), l)),
                ));
            }
        }

        if let (Some(v), Some(cv)) = (volume, chg_vol.as_deref()) {
            for &w in &self.windows {
                plan.push((
                    format!("VOLUME{w}"),
                    Box::new(move || div(&grouped.shift(v, w as i64), v)),
                ));
                plan.push((
                    format!("VMA{w}"),
                    Box::new(move || div(&grouped.rolling(v, w, RollingStat::Mean), v)),
                ));
                plan.push((
                    format!("VSTD{w}"),
                    Box::new(move || div(&grouped.rolling(v, w, RollingStat::Std), v)),
                ));
                plan.push((
                    format!("VMA2_{w}"),
                    Box::new(move || grouped.rolling(cv, w, RollingStat::Mean)),
                ));
                plan.push((
                    format!("VSTD2_{w}"),
                    Box::new(move || grouped.rolling(cv, w, RollingStat::Std)),
                ));
            }
            plan.push(("VMEAN".into(), Box::new(move || div(v, &cross.mean(v)))));
        }

        if let Some(vp) = vprice.as_deref() {
            plan.push((
                "MEAN2".into(),
                Box::new(move || div(vp, &cross.mean(vp))),
            ));
            for &w in &self.windows {
                plan.push((
                    format!("MEAN2_{w}"),
                    Box::new(move || div(&grouped.shift(vp, w as i64), vp)),
                ));
            }
        }

        // Residual price/volume co-movement: correlate the part of the
        // return not explained by its own rolling mean with the equivalent
        // volume-change residual. Deviations live in recipe-local buffers.
        if let (Some(r), Some(cv)) = (ret.as_deref(), chg_vol.as_deref()) {
            for &w in &self.windows {
                plan.push((
                    format!("CORRCV{w}"),
                    Box::new(move || {
                        let r_resid = sub(r, &grouped.rolling(r, w, RollingStat::Mean));
                        let v_resid = sub(cv, &grouped.rolling(cv, w, RollingStat::Mean));
                        let num = grouped.rolling(&mul(&r_resid, &v_resid), w, RollingStat::Mean);
                        let den = mul(
                            &grouped.rolling(r, w, RollingStat::Std),
                            &grouped.rolling(cv, w, RollingStat::Std),
                        );
                        div(&num, &den)
                    }),
                ));
            }
        }

        if let Some(a) = amount {
            for &w in &self.windows {
                plan.push((
                    format!("AMOUNT{w}"),
                    Box::new(move || div(&grouped.shift(a, w as i64), a)),
                ));
            }
        }

        // ---------------------------------------------------------------------
        // Evaluate and assemble
        // ---------------------------------------------------------------------

        let evaluated = parallel::map_vec(
            plan,
            |(name, recipe)| (name, recipe()),
            self.force_sequential,
        );
        let mut out = PanelTable::with_index(index.clone());
        for (name, values) in evaluated {
            out.set_column(name, values)?;
        }
        fill::forward_then_mean(&mut out);
        debug!(columns = out.n_cols(), rows = out.n_rows(), "factor table built");
        Ok(out)
    }
}

fn resolve<'t>(table: &'t PanelTable, role: &str, name: Option<&str>) -> Option<&'t [f64]> {
    let name = name?;
    let col = table.column(name);
    if col.is_none() {
        debug!(role, column = name, "input column not in table, skipping its factor families");
    }
    col
}

// =============================================================================
// Element-wise kernels
// =============================================================================

fn div(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x / y).collect()
}

fn sub(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

fn mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x * y).collect()
}

fn ratio_minus_one(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x / y - 1.0).collect()
}

/// Stochastic %K, no epsilon: a zero 9-period range is genuinely undefined
/// and stays missing.
fn percent_k(close: &[f64], lo: &[f64], hi: &[f64]) -> Vec<f64> {
    (0..close.len())
        .map(|i| (close[i] - lo[i]) / (hi[i] - lo[i]) * 100.0)
        .collect()
}

/// Position of close inside a [lo, hi] band, epsilon-guarded.
fn band_position(close: &[f64], lo: &[f64], hi: &[f64]) -> Vec<f64> {
    (0..close.len())
        .map(|i| (close[i] - lo[i]) / (hi[i] - lo[i] + RANGE_EPSILON))
        .collect()
}
