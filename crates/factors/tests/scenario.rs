//! End-to-end factor walkthrough on a small hand-checked panel.

use factors::{Alpha360Encoder, FactorBuilder, SourceColumns};
use panel::{PanelTable, Record};

/// Two entities, five timestamps, close only. Entity 1 rises then falls,
/// entity 2 mirrors it.
fn hand_panel() -> PanelTable {
    let closes = [(10.0, 20.0), (11.0, 19.0), (12.0, 18.0), (11.0, 19.0), (10.0, 20.0)];
    let mut records = Vec::new();
    for (i, (c1, c2)) in closes.into_iter().enumerate() {
        let t = i as i64 + 1;
        records.push(Record::new(t, 1).field("close", c1));
        records.push(Record::new(t, 2).field("close", c2));
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

fn assert_close(got: &[f64], want: &[f64]) {
    assert_eq!(got.len(), want.len());
    for (g, w) in got.iter().zip(want) {
        assert!((g - w).abs() < 1e-12, "{g} vs {w}");
    }
}

#[test]
fn hand_panel_walkthrough() {
    let table = hand_panel();
    let out = FactorBuilder::new(SourceColumns::default(), vec![5])
        .unwrap()
        .build(&table)
        .unwrap();

    // Close-only input: DIF/DEA + 8 return columns + 14 per-window columns.
    assert_eq!(out.n_cols(), 24);
    assert_eq!(
        out.index().row_keys().collect::<Vec<_>>(),
        table.index().row_keys().collect::<Vec<_>>()
    );

    // One-period returns per the formula; the leading cell takes the
    // pre-fill column mean (1/60 + 1/180, over 8 defined cells = 1/360).
    assert_close(
        &entity_series(&out, 1, "RET1_1"),
        &[1.0 / 360.0, 0.1, 1.0 / 11.0, -1.0 / 12.0, -1.0 / 11.0],
    );
    assert_close(
        &entity_series(&out, 2, "RET1_1"),
        &[1.0 / 360.0, -0.05, -1.0 / 19.0, 1.0 / 18.0, 1.0 / 19.0],
    );

    // With two entities every rank is 0.5 or 1.0 (0.75 on ties), and each
    // RET2 column's fill mean happens to be 0.75 as well.
    for lag in 1..=4 {
        let col = format!("RET2_{lag}");
        for &v in out.column(&col).unwrap() {
            assert!(
                v == 0.5 || v == 0.75 || v == 1.0,
                "{col} cell {v} outside two-entity rank values"
            );
        }
    }

    // MA5 is defined only at the fifth timestamp pre-fill (10.8/10 and
    // 19.2/20); the fill replaces the leading cells with their mean 1.02.
    assert_close(&entity_series(&out, 1, "MA5"), &[1.02, 1.02, 1.02, 1.02, 1.08]);
    assert_close(&entity_series(&out, 2, "MA5"), &[1.02, 1.02, 1.02, 1.02, 0.96]);

    // 80th-percentile of entity 1's closes [10,10,11,11,12] interpolates
    // to 11.2.
    assert_close(&entity_series(&out, 1, "QTLU5"), &[1.06, 1.06, 1.06, 1.06, 1.12]);
    assert_close(&entity_series(&out, 2, "QTLU5"), &[1.06, 1.06, 1.06, 1.06, 1.0]);

    // Five observations never fill a 5-lag shift or a 5-window over the
    // 4-point return series: those columns stay all-missing.
    for empty in ["CLOSE5", "MA2_5", "STD2_5", "CORR5", "RSI5", "DIF"] {
        assert!(
            out.column(empty).unwrap().iter().all(|v| v.is_nan()),
            "{empty} should be all-missing on five observations"
        );
    }
}

#[test]
fn fill_never_touches_cells_defined_before_it() {
    let table = hand_panel();
    let out = FactorBuilder::new(SourceColumns::default(), vec![5])
        .unwrap()
        .build(&table)
        .unwrap();

    // Recompute the one-period return directly off the raw panel; wherever
    // it is defined the factor column must carry the identical value.
    let close = table.column("close").unwrap();
    let shifted = table.by_entity().shift(close, 1);
    let raw: Vec<f64> = close.iter().zip(&shifted).map(|(c, s)| c / s - 1.0).collect();
    let ret = out.column("RET1_1").unwrap();
    let mut checked = 0;
    for (row, &r) in raw.iter().enumerate() {
        if r.is_finite() {
            assert_eq!(ret[row], r);
            checked += 1;
        }
    }
    assert_eq!(checked, 8);
}

#[test]
fn entities_and_future_rows_stay_isolated() {
    let closes_1 = [10.0, 10.5, 11.5, 11.0, 12.0, 12.5];
    let closes_2 = [30.0, 29.0, 29.5, 28.0, 28.5, 27.0];
    let build = |c1: &[f64], c2: &[f64]| {
        let mut records = Vec::new();
        for t in 0..6usize {
            records.push(Record::new(t as i64 + 1, 1).field("close", c1[t]));
            records.push(Record::new(t as i64 + 1, 2).field("close", c2[t]));
        }
        let table = PanelTable::from_records(records).unwrap();
        FactorBuilder::new(SourceColumns::default(), vec![3])
            .unwrap()
            .build(&table)
            .unwrap()
    };

    let base = build(&closes_1, &closes_2);

    // Perturb the OTHER entity's last close: entity 1's defined cells are
    // untouched (mean-filled warm-up cells may move, by design).
    let mut moved = closes_2;
    moved[5] += 5.0;
    let cross = build(&closes_1, &moved);
    assert_eq!(
        entity_series(&base, 1, "RET1_1")[1..],
        entity_series(&cross, 1, "RET1_1")[1..]
    );
    assert_eq!(
        entity_series(&base, 1, "MA3")[2..],
        entity_series(&cross, 1, "MA3")[2..]
    );

    // Perturb entity 1's own last close: its earlier defined cells are
    // untouched (trailing windows never look forward).
    let mut future = closes_1;
    future[5] += 2.0;
    let own = build(&future, &closes_2);
    assert_eq!(
        entity_series(&base, 1, "RET1_1")[1..5],
        entity_series(&own, 1, "RET1_1")[1..5]
    );
    assert_eq!(
        entity_series(&base, 1, "MA3")[2..5],
        entity_series(&own, 1, "MA3")[2..5]
    );
}

#[test]
fn lag_stack_on_the_hand_panel() {
    let mut records = Vec::new();
    for (i, (c1, c2)) in [(10.0, 20.0), (11.0, 19.0), (12.0, 18.0)].into_iter().enumerate() {
        let t = i as i64 + 1;
        records.push(Record::new(t, 1).field("close", c1).field("volume", 100.0 * t as f64));
        records.push(Record::new(t, 2).field("close", c2).field("volume", 300.0));
    }
    let table = PanelTable::from_records(records).unwrap();
    let out = Alpha360Encoder::new(SourceColumns::default(), 2)
        .unwrap()
        .encode(&table)
        .unwrap();

    assert_eq!(out.n_cols(), 4); // close1 close2 volume1 volume2
    let close1 = entity_series(&out, 1, "close1");
    assert!(close1[0].is_nan());
    assert_close(&close1[1..], &[10.0 / 11.0, 11.0 / 12.0]);
    let volume1 = entity_series(&out, 1, "volume1");
    assert_close(&volume1[1..], &[100.0 / 200.0, 200.0 / 300.0]);
}
