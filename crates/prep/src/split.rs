//! Train/validation splits and row sampling.
//!
//! Every randomized operation takes the caller's RNG; nothing here draws
//! from global entropy, so a seeded [`rand::rngs::StdRng`] makes a whole
//! experiment reproducible.

use panel::{PanelError, PanelResult, PanelTable, Timestamp};
use rand::seq::index::sample;
use rand::Rng;
use tracing::debug;

/// Split into `(train, valid)` by inclusive timestamp ranges.
///
/// The ranges are independent slices of the same table; they may leave
/// gaps or overlap, which an embargo between train and valid exploits.
pub fn split_by_time(
    table: &PanelTable,
    train: (impl Into<Timestamp>, impl Into<Timestamp>),
    valid: (impl Into<Timestamp>, impl Into<Timestamp>),
) -> PanelResult<(PanelTable, PanelTable)> {
    let train = table.slice_time(train.0.into(), train.1.into())?;
    let valid = table.slice_time(valid.0.into(), valid.1.into())?;
    debug!(
        train_rows = train.n_rows(),
        valid_rows = valid.n_rows(),
        "split by time"
    );
    Ok((train, valid))
}

/// Split into `(train, valid)` by uniform row sampling without
/// replacement: `round(n_rows · valid_fraction)` rows go to valid.
pub fn split_ratio<R: Rng + ?Sized>(
    table: &PanelTable,
    valid_fraction: f64,
    rng: &mut R,
) -> PanelResult<(PanelTable, PanelTable)> {
    if !(0.0..=1.0).contains(&valid_fraction) {
        return Err(PanelError::BadFraction(valid_fraction));
    }
    let n = table.n_rows();
    let n_valid = (n as f64 * valid_fraction).round() as usize;
    let mut to_valid = vec![false; n];
    for i in sample(rng, n, n_valid) {
        to_valid[i] = true;
    }
    let to_train: Vec<bool> = to_valid.iter().map(|&v| !v).collect();
    Ok((table.retain_rows(&to_train)?, table.retain_rows(&to_valid)?))
}

/// Drop `fraction` of the rows where `|column| == value`, chosen
/// uniformly without replacement. Other rows are kept untouched.
pub fn down_sample<R: Rng + ?Sized>(
    table: &PanelTable,
    column: &str,
    value: f64,
    fraction: f64,
    rng: &mut R,
) -> PanelResult<PanelTable> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(PanelError::BadFraction(fraction));
    }
    let values = table.require_column(column)?;
    let matching: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.abs() == value)
        .map(|(i, _)| i)
        .collect();
    let n_drop = (matching.len() as f64 * fraction).round() as usize;
    let mut keep = vec![true; table.n_rows()];
    for pick in sample(rng, matching.len(), n_drop) {
        keep[matching[pick]] = false;
    }
    debug!(matched = matching.len(), dropped = n_drop, "down-sampled rows");
    table.retain_rows(&keep)
}

/// Share of rows where `|column| == value`. Missing cells never match.
pub fn fraction_equal(table: &PanelTable, column: &str, value: f64) -> PanelResult<f64> {
    let values = table.require_column(column)?;
    if values.is_empty() {
        return Ok(0.0);
    }
    let matches = values.iter().filter(|v| v.abs() == value).count();
    Ok(matches as f64 / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel::Record;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ten_by_two() -> PanelTable {
        let mut records = Vec::new();
        for t in 1..=10i64 {
            for e in 1..=2u32 {
                records.push(Record::new(t, e).field("x", t as f64 * f64::from(e)));
            }
        }
        PanelTable::from_records(records).unwrap()
    }

    #[test]
    fn time_split_slices_inclusively() {
        let table = ten_by_two();
        let (train, valid) = split_by_time(&table, (1, 6), (7, 10)).unwrap();
        assert_eq!(train.n_timestamps(), 6);
        assert_eq!(valid.n_timestamps(), 4);
        assert_eq!(train.n_rows() + valid.n_rows(), table.n_rows());
        assert_eq!(valid.index().timestamp_keys()[0], Timestamp(7));
    }

    #[test]
    fn ratio_split_partitions_by_rounded_count() {
        let table = ten_by_two();
        let mut rng = StdRng::seed_from_u64(7);
        let (train, valid) = split_ratio(&table, 0.25, &mut rng).unwrap();
        assert_eq!(valid.n_rows(), 5);
        assert_eq!(train.n_rows(), 15);
        // the two sides partition the original keys
        let mut keys: Vec<_> = train
            .index()
            .row_keys()
            .chain(valid.index().row_keys())
            .collect();
        keys.sort();
        let all: Vec<_> = table.index().row_keys().collect();
        assert_eq!(keys, all);
    }

    #[test]
    fn ratio_split_is_seed_deterministic() {
        let table = ten_by_two();
        let pick = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            let (_, valid) = split_ratio(&table, 0.5, &mut rng).unwrap();
            valid.index().row_keys().collect::<Vec<_>>()
        };
        assert_eq!(pick(7), pick(7));
        assert_ne!(pick(7), pick(8));
    }

    #[test]
    fn bad_fractions_are_rejected() {
        let table = ten_by_two();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(split_ratio(&table, -0.1, &mut rng).is_err());
        assert!(split_ratio(&table, 1.5, &mut rng).is_err());
        assert!(split_ratio(&table, f64::NAN, &mut rng).is_err());
        assert!(down_sample(&table, "x", 0.0, 2.0, &mut rng).is_err());
    }

    #[test]
    fn down_sample_thins_only_matching_rows() {
        let mut records = Vec::new();
        for t in 1..=20i64 {
            let v = if t % 2 == 0 { 0.0 } else { t as f64 };
            records.push(Record::new(t, 1).field("y", v));
        }
        let table = PanelTable::from_records(records).unwrap();
        assert_eq!(fraction_equal(&table, "y", 0.0).unwrap(), 0.5);

        let mut rng = StdRng::seed_from_u64(3);
        let thinned = down_sample(&table, "y", 0.0, 0.5, &mut rng).unwrap();
        assert_eq!(thinned.n_rows(), 15);
        let survivors = thinned.column("y").unwrap();
        assert_eq!(survivors.iter().filter(|v| **v == 0.0).count(), 5);
        // non-matching rows are all still there
        assert_eq!(survivors.iter().filter(|v| **v != 0.0).count(), 10);
    }

    #[test]
    fn down_sample_matches_on_magnitude() {
        let records = vec![
            Record::new(1, 1).field("y", -2.0),
            Record::new(2, 1).field("y", 2.0),
            Record::new(3, 1).field("y", 5.0),
        ];
        let table = PanelTable::from_records(records).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let thinned = down_sample(&table, "y", 2.0, 1.0, &mut rng).unwrap();
        assert_eq!(thinned.n_rows(), 1);
        assert_eq!(thinned.column("y").unwrap(), &[5.0]);
    }

    #[test]
    fn fraction_skips_missing_cells() {
        let records = vec![
            Record::new(1, 1).field("y", 0.0),
            Record::new(2, 1).field("y", f64::NAN),
            Record::new(3, 1).field("y", 1.0),
            Record::new(4, 1).field("y", 0.0),
        ];
        let table = PanelTable::from_records(records).unwrap();
        assert_eq!(fraction_equal(&table, "y", 0.0).unwrap(), 0.5);
    }
}
