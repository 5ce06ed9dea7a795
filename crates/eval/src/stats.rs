//! Correlation statistics over paired samples.
//!
//! Both correlations work on the finitely-paired subset: a pair counts only
//! when both sides are finite. Fewer than two valid pairs, or zero variance
//! on either side, yields `None` rather than a NaN propagating quietly into
//! downstream averages.

/// Pearson correlation coefficient.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    pearson_pairs(&finite_pairs(x, y))
}

/// Spearman rank correlation: Pearson over average-tie ranks of the valid
/// pairs.
pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    let pairs = finite_pairs(x, y);
    if pairs.len() < 2 {
        return None;
    }
    let rx = average_ranks(pairs.iter().map(|p| p.0));
    let ry = average_ranks(pairs.iter().map(|p| p.1));
    let ranked: Vec<(f64, f64)> = rx.into_iter().zip(ry).collect();
    pearson_pairs(&ranked)
}

fn finite_pairs(x: &[f64], y: &[f64]) -> Vec<(f64, f64)> {
    x.iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(&a, &b)| (a, b))
        .collect()
}

fn pearson_pairs(pairs: &[(f64, f64)]) -> Option<f64> {
    let n = pairs.len();
    if n < 2 {
        return None;
    }
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n as f64;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n as f64;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for &(a, b) in pairs {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denom = (sxx * syy).sqrt();
    (denom > 0.0).then(|| sxy / denom)
}

/// 1-based ranks, ties averaged over the run they span.
fn average_ranks(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let values: Vec<f64> = values.collect();
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_unstable_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap());
    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let rank = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }
    ranks
}
