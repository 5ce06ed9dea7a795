//! Two-stage missing-value fill applied to finished factor tables.
//!
//! Stage one carries each entity's last defined value forward (no
//! cross-entity contamination). Stage two replaces whatever is still
//! missing (leading warm-up cells, entities with no history at all) with
//! the column's mean over its PRE-fill defined cells. A column with no
//! defined cell anywhere stays missing.
//!
//! The column mean deliberately pools over all timestamps, so stage two is
//! not leakage-free; it exists to hand models a dense matrix, and callers
//! who care can split their data before filling.

use panel::{EntityGroupedView, PanelTable};

/// Forward-fill per entity, then mean-fill per column, in place.
pub fn forward_then_mean(table: &mut PanelTable) {
    let index = table.index().clone();
    let grouped = EntityGroupedView::new(&index);
    table.map_columns_in_place(|_, values| {
        let mean = finite_mean(values);
        *values = grouped.forward_fill(values);
        if let Some(mean) = mean {
            for v in values.iter_mut() {
                if !v.is_finite() {
                    *v = mean;
                }
            }
        }
    });
}

fn finite_mean(values: &[f64]) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in values {
        if v.is_finite() {
            sum += v;
            count += 1;
        }
    }
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel::{PanelTable, Record};

    fn table() -> PanelTable {
        // Entity 1: [NaN, 1, NaN, 3]; entity 2: all NaN.
        PanelTable::from_records(vec![
            Record::new(1, 1).field("f", f64::NAN).field("empty", f64::NAN),
            Record::new(2, 1).field("f", 1.0).field("empty", f64::NAN),
            Record::new(3, 1).field("f", f64::NAN).field("empty", f64::NAN),
            Record::new(4, 1).field("f", 3.0).field("empty", f64::NAN),
            Record::new(1, 2).field("f", f64::NAN).field("empty", f64::NAN),
            Record::new(2, 2).field("f", f64::NAN).field("empty", f64::NAN),
        ])
        .unwrap()
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
    fn interior_gaps_use_forward_fill_not_mean() {
        let mut t = table();
        forward_then_mean(&mut t);
        let e1 = entity_series(&t, 1, "f");
        // pre-fill mean of [1, 3] is 2; the interior gap must carry 1 forward
        assert_eq!(e1, vec![2.0, 1.0, 1.0, 3.0]);
    }

    #[test]
    fn entities_without_history_get_the_column_mean() {
        let mut t = table();
        forward_then_mean(&mut t);
        assert_eq!(entity_series(&t, 2, "f"), vec![2.0, 2.0]);
    }

    #[test]
    fn mean_is_computed_before_filling() {
        // If the mean were taken after forward fill it would be
        // (1 + 1 + 3) / 3 for entity 1's column; assert the pre-fill value.
        let mut t = table();
        forward_then_mean(&mut t);
        let e1 = entity_series(&t, 1, "f");
        assert_eq!(e1[0], 2.0);
    }

    #[test]
    fn all_missing_column_stays_missing() {
        let mut t = table();
        forward_then_mean(&mut t);
        assert!(t.column("empty").unwrap().iter().all(|v| v.is_nan()));
    }
}
