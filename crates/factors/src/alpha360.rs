//! Flat lag-stack encoding of raw inputs ("alpha360").
//!
//! Instead of hand-crafted statistics, each available input contributes its
//! last K values per row, normalized to be scale-free: price lags divide by
//! the current close, volume lags by the current volume, amount lags by
//! close times volume. Six inputs at the default K = 60 give 360 columns,
//! meant as raw history for sequence models rather than as factors.
//!
//! No fill is applied; rows without enough history keep NaN cells. Lag
//! columns are independent of each other once their normalizers are known,
//! so encoding plans one work item per column and evaluates them through
//! [`parallel::map_slice`].

use panel::{EntityGroupedView, PanelError, PanelResult, PanelTable};
use tracing::debug;

use crate::builder::SourceColumns;

/// Default lag depth.
pub const DEFAULT_LAGS: usize = 60;

/// One planned output column: name, source, normalizer, lag.
type LagSpec<'t> = (String, &'t [f64], &'t [f64], i64);

/// Emits `{column}{i}` lag-ratio columns for i in 1..=K.
#[derive(Debug, Clone)]
pub struct Alpha360Encoder {
    columns: SourceColumns,
    lags: usize,
    force_sequential: bool,
}

impl Alpha360Encoder {
    /// An encoder over the given column mapping, `lags` deep (at least 1).
    pub fn new(columns: SourceColumns, lags: usize) -> PanelResult<Self> {
        if lags < 1 {
            return Err(PanelError::BadWindow(lags, 1));
        }
        Ok(Self {
            columns,
            lags,
            force_sequential: false,
        })
    }

    /// Conventional column names, 60 lags.
    pub fn standard() -> Self {
        Self {
            columns: SourceColumns::default(),
            lags: DEFAULT_LAGS,
            force_sequential: false,
        }
    }

    /// Encode lag columns sequentially even when the `rayon` feature is on.
    pub fn force_sequential(mut self, yes: bool) -> Self {
        self.force_sequential = yes;
        self
    }

    pub fn lags(&self) -> usize {
        self.lags
    }

    /// Encode the lag stack into a new table on the same index.
    ///
    /// Price inputs (open/close/high/low) need close present for their
    /// normalizer, amount needs close and volume; an input without its
    /// normalizer is skipped like an absent input.
    pub fn encode(&self, table: &PanelTable) -> PanelResult<PanelTable> {
        let grouped = EntityGroupedView::new(table.index());
        let close = lookup(table, "close", self.columns.close.as_deref());
        let volume = lookup(table, "volume", self.columns.volume.as_deref());
        let amount = lookup(table, "amount", self.columns.amount.as_deref());
        let amount_norm: Option<Vec<f64>> = match (amount, close, volume) {
            (Some(_), Some((_, c)), Some((_, v))) => {
                Some(c.iter().zip(v).map(|(x, y)| x * y).collect())
            }
            _ => None,
        };

        let mut specs: Vec<LagSpec<'_>> = Vec::new();
        let price_roles = [
            self.columns.open.as_deref(),
            self.columns.close.as_deref(),
            self.columns.high.as_deref(),
            self.columns.low.as_deref(),
        ];
        for role in price_roles {
            if let (Some((name, values)), Some((_, c))) =
                (lookup(table, "price", role), close)
            {
                self.plan(&mut specs, name, values, c);
            }
        }
        if let Some((name, v)) = volume {
            self.plan(&mut specs, name, v, v);
        }
        if let (Some((name, a)), Some(norm)) = (amount, amount_norm.as_deref()) {
            self.plan(&mut specs, name, a, norm);
        }

        let columns = parallel::map_slice(
            &specs,
            |(name, values, normalizer, lag)| {
                let shifted = grouped.shift(values, *lag);
                let col: Vec<f64> = shifted
                    .iter()
                    .zip(*normalizer)
                    .map(|(s, n)| s / n)
                    .collect();
                (name.clone(), col)
            },
            self.force_sequential,
        );
        let mut out = PanelTable::with_index(table.index().clone());
        for (name, col) in columns {
            out.set_column(name, col)?;
        }
        debug!(columns = out.n_cols(), lags = self.lags, "lag stack encoded");
        Ok(out)
    }

    fn plan<'t>(
        &self,
        specs: &mut Vec<LagSpec<'t>>,
        name: &str,
        values: &'t [f64],
        normalizer: &'t [f64],
    ) {
        for i in 1..=self.lags {
            specs.push((format!("{name}{i}"), values, normalizer, i as i64));
        }
    }
}

fn lookup<'t>(
    table: &'t PanelTable,
    role: &str,
    name: Option<&'t str>,
) -> Option<(&'t str, &'t [f64])> {
    let name = name?;
    match table.column(name) {
        Some(values) => Some((name, values)),
        None => {
            debug!(role, column = name, "input column not in table, skipping its lag stack");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel::Record;

    fn table() -> PanelTable {
        let mut records = Vec::new();
        for t in 1..=5i64 {
            let base = t as f64;
            records.push(
                Record::new(t, 1)
                    .field("open", 9.0 + base)
                    .field("close", 10.0 + base)
                    .field("high", 11.0 + base)
                    .field("low", 8.0 + base)
                    .field("volume", 100.0 * base)
                    .field("amount", 1_000.0 * base),
            );
            records.push(
                Record::new(t, 2)
                    .field("open", 19.0 + base)
                    .field("close", 20.0 + base)
                    .field("high", 21.0 + base)
                    .field("low", 18.0 + base)
                    .field("volume", 200.0 * base)
                    .field("amount", 4_000.0 * base),
            );
        }
        PanelTable::from_records(records).unwrap()
    }

    fn entity_series(t: &PanelTable, entity: u32, col: &str) -> Vec<f64> {
        let k = t
            .index()
            .entity_keys()
            .iter()
            .position(|&e| e == entity.into())
            .unwrap();
        let values = t.column(col).unwrap();
        t.index().rows_of(k).iter().map(|&r| values[r]).collect()
    }

    #[test]
    fn zero_lags_rejected() {
        assert!(matches!(
            Alpha360Encoder::new(SourceColumns::default(), 0),
            Err(PanelError::BadWindow(0, 1))
        ));
    }

    #[test]
    fn emits_full_stack_in_input_order() {
        let out = Alpha360Encoder::new(SourceColumns::default(), 3)
            .unwrap()
            .encode(&table())
            .unwrap();
        assert_eq!(out.n_cols(), 18);
        let names = out.column_names();
        assert_eq!(&names[..3], &["open1", "open2", "open3"]);
        assert_eq!(names[3], "close1");
        assert_eq!(names.last(), Some(&"amount3"));
        assert_eq!(out.n_rows(), 10);
    }

    #[test]
    fn price_lags_divide_by_current_close() {
        let out = Alpha360Encoder::new(SourceColumns::default(), 2)
            .unwrap()
            .encode(&table())
            .unwrap();
        // entity 1 closes are 11..15; close1 at t3 = 12/13
        let close1 = entity_series(&out, 1, "close1");
        assert!(close1[0].is_nan());
        assert!((close1[2] - 12.0 / 13.0).abs() < 1e-12);
        // opens divide by close, not by open
        let open1 = entity_series(&out, 1, "open1");
        assert!((open1[2] - 11.0 / 13.0).abs() < 1e-12);
    }

    #[test]
    fn amount_lags_divide_by_close_times_volume() {
        let out = Alpha360Encoder::new(SourceColumns::default(), 1)
            .unwrap()
            .encode(&table())
            .unwrap();
        // entity 2 at t2: amount(t1) / (close(t2) * volume(t2))
        let amount1 = entity_series(&out, 2, "amount1");
        assert!((amount1[1] - 4_000.0 / (22.0 * 400.0)).abs() < 1e-12);
    }

    #[test]
    fn warm_up_cells_stay_missing() {
        let out = Alpha360Encoder::new(SourceColumns::default(), 3)
            .unwrap()
            .encode(&table())
            .unwrap();
        let close3 = entity_series(&out, 1, "close3");
        assert!(close3[..3].iter().all(|v| v.is_nan()));
        assert!(close3[3].is_finite());
    }

    #[test]
    fn price_stacks_need_close_for_their_normalizer() {
        let mut cols = SourceColumns::default();
        cols.close = None;
        let out = Alpha360Encoder::new(cols, 2).unwrap().encode(&table()).unwrap();
        // only the volume stack survives: prices and amount lack a normalizer
        assert_eq!(out.column_names(), vec!["volume1", "volume2"]);
    }

    #[test]
    fn sequential_override_matches_parallel_encode() {
        let par = Alpha360Encoder::new(SourceColumns::default(), 4)
            .unwrap()
            .encode(&table())
            .unwrap();
        let seq = Alpha360Encoder::new(SourceColumns::default(), 4)
            .unwrap()
            .force_sequential(true)
            .encode(&table())
            .unwrap();
        assert_eq!(par.column_names(), seq.column_names());
        for (name, values) in par.iter_columns() {
            let other = seq.column(name).unwrap();
            for (a, b) in values.iter().zip(other) {
                assert!((a.is_nan() && b.is_nan()) || a == b, "{name} diverged");
            }
        }
    }
}
