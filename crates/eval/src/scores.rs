//! Pooled feature screening against a label.
//!
//! Where [`crate::ic`] correlates per cross-section, these helpers pool
//! every row of the panel into one correlation per feature. That makes
//! them a cheap first-pass filter before fitting anything.

use panel::{PanelResult, PanelTable};
use tracing::debug;

use crate::stats::pearson;

// ============================================================
// Feature scores
// ============================================================

/// Pearson correlation of each feature column against `label`, pooled
/// over the whole panel and sorted by score descending.
///
/// Features whose correlation is undefined (constant, or fewer than two
/// finite pairs with the label) score `None` and sort after every scored
/// feature. Ties keep the caller's feature order.
pub fn r_scores(
    table: &PanelTable,
    features: &[&str],
    label: &str,
) -> PanelResult<Vec<(String, Option<f64>)>> {
    let y = table.require_column(label)?;
    let mut scores = Vec::with_capacity(features.len());
    for &name in features {
        let x = table.require_column(name)?;
        scores.push((name.to_string(), pearson(x, y)));
    }
    scores.sort_by(|a, b| match (a.1, b.1) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    debug!(features = scores.len(), label, "features scored against label");
    Ok(scores)
}

/// Names from `scores` whose score is strictly above `min_score`.
///
/// Unscored (`None`) features never pass, whatever the threshold.
pub fn screen(scores: &[(String, Option<f64>)], min_score: f64) -> Vec<String> {
    scores
        .iter()
        .filter(|(_, score)| score.is_some_and(|v| v > min_score))
        .map(|(name, _)| name.clone())
        .collect()
}

// ============================================================
// Tests
// ============================================================
