//! Least-squares linear model over panel columns.
//!
//! Fits `label ≈ w · features + b` by the normal equations with an
//! optional ridge term, solved by Gaussian elimination with partial
//! pivoting. Small and dependency-free on purpose: factor models of this
//! shape have a handful of coefficients, not thousands.

use panel::{PanelError, PanelResult, PanelTable};
use tracing::debug;

/// Linear regression fitted on the finite rows of a panel.
///
/// The intercept is always present and never regularized; `ridge_lambda`
/// shrinks the feature weights only (zero gives plain OLS).
#[derive(Debug, Clone)]
pub struct LinearModel {
    /// Feature column names, in fit order.
    features: Vec<String>,
    /// One weight per feature.
    weights: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    /// Fit on every row of `table` where all features and the label are
    /// finite.
    ///
    /// Errors if no such row exists, if `ridge_lambda` is negative or
    /// non-finite, or if the normal equations are singular (collinear or
    /// constant features under OLS).
    pub fn fit(
        table: &PanelTable,
        features: &[&str],
        label: &str,
        ridge_lambda: f64,
    ) -> PanelResult<Self> {
        if features.is_empty() {
            return Err(PanelError::Degenerate("no feature columns to fit".into()));
        }
        if !ridge_lambda.is_finite() || ridge_lambda < 0.0 {
            return Err(PanelError::Degenerate(format!(
                "ridge lambda {ridge_lambda} is not a non-negative finite number"
            )));
        }
        let cols: Vec<&[f64]> = features
            .iter()
            .map(|&name| table.require_column(name))
            .collect::<PanelResult<_>>()?;
        let y = table.require_column(label)?;

        // accumulate X'X and X'y over usable rows; the last coordinate is
        // the intercept's constant 1
        let k = cols.len();
        let m = k + 1;
        let mut xtx = vec![vec![0.0f64; m]; m];
        let mut xty = vec![0.0f64; m];
        let mut row = vec![0.0f64; m];
        let mut used = 0usize;
        for r in 0..table.n_rows() {
            if !y[r].is_finite() || cols.iter().any(|c| !c[r].is_finite()) {
                continue;
            }
            for (j, c) in cols.iter().enumerate() {
                row[j] = c[r];
            }
            row[k] = 1.0;
            for i in 0..m {
                for j in i..m {
                    xtx[i][j] += row[i] * row[j];
                }
                xty[i] += row[i] * y[r];
            }
            used += 1;
        }
        if used == 0 {
            return Err(PanelError::Degenerate(
                "no rows where every feature and the label are finite".into(),
            ));
        }
        for i in 0..m {
            for j in 0..i {
                xtx[i][j] = xtx[j][i];
            }
        }
        for (i, r) in xtx.iter_mut().enumerate().take(k) {
            r[i] += ridge_lambda;
        }

        let mut solution = solve(xtx, xty)?;
        let intercept = solution.pop().unwrap_or(0.0);
        debug!(
            features = k,
            rows = used,
            lambda = ridge_lambda,
            "linear model fitted"
        );
        Ok(Self {
            features: features.iter().map(|s| s.to_string()).collect(),
            weights: solution,
            intercept,
        })
    }

    /// Predict one value per row of `table`; NaN wherever any feature is
    /// missing. The table must carry every fitted feature column.
    pub fn predict(&self, table: &PanelTable) -> PanelResult<Vec<f64>> {
        let cols: Vec<&[f64]> = self
            .features
            .iter()
            .map(|name| table.require_column(name))
            .collect::<PanelResult<_>>()?;
        let mut out = vec![f64::NAN; table.n_rows()];
        for (r, slot) in out.iter_mut().enumerate() {
            if cols.iter().any(|c| !c[r].is_finite()) {
                continue;
            }
            *slot = self
                .weights
                .iter()
                .zip(&cols)
                .map(|(w, c)| w * c[r])
                .sum::<f64>()
                + self.intercept;
        }
        Ok(out)
    }

    /// Fitted feature weights, aligned with [`LinearModel::features`].
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Feature column names, in fit order.
    pub fn features(&self) -> &[String] {
        &self.features
    }
}

/// Solve `a x = b` by Gaussian elimination with partial pivoting.
///
/// The pivot threshold scales with the matrix so that a genuinely
/// rank-deficient system reads as singular rather than as noise.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> PanelResult<Vec<f64>> {
    let m = b.len();
    let scale = a
        .iter()
        .enumerate()
        .map(|(i, r)| r[i].abs())
        .fold(1.0f64, f64::max);
    let threshold = scale * 1e-12;
    for col in 0..m {
        let mut pivot = col;
        for r in (col + 1)..m {
            if a[r][col].abs() > a[pivot][col].abs() {
                pivot = r;
            }
        }
        if !a[pivot][col].is_finite() || a[pivot][col].abs() < threshold {
            return Err(PanelError::Degenerate(
                "singular normal equations (collinear or constant features)".into(),
            ));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for r in (col + 1)..m {
            let factor = a[r][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for c in col..m {
                a[r][c] -= factor * a[col][c];
            }
            b[r] -= factor * b[col];
        }
    }
    let mut x = vec![0.0f64; m];
    for r in (0..m).rev() {
        let mut acc = b[r];
        for c in (r + 1)..m {
            acc -= a[r][c] * x[c];
        }
        x[r] = acc / a[r][r];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use panel::Record;

    /// `y = 2a - 3b + 0.5` exactly, over `timestamps`.
    fn linear_panel(timestamps: std::ops::RangeInclusive<i64>) -> PanelTable {
        let records = timestamps
            .map(|t| {
                let a = t as f64;
                let b = (t * t) as f64 / 10.0;
                Record::new(t, 1)
                    .field("a", a)
                    .field("b", b)
                    .field("y", 2.0 * a - 3.0 * b + 0.5)
            })
            .collect();
        PanelTable::from_records(records).unwrap()
    }

    #[test]
    fn ols_recovers_exact_coefficients() {
        let table = linear_panel(1..=12);
        let model = LinearModel::fit(&table, &["a", "b"], "y", 0.0).unwrap();
        assert!((model.weights()[0] - 2.0).abs() < 1e-6);
        assert!((model.weights()[1] + 3.0).abs() < 1e-6);
        assert!((model.intercept() - 0.5).abs() < 1e-6);

        // held-out rows predict on the same exact relationship
        let held_out = linear_panel(13..=16);
        let preds = model.predict(&held_out).unwrap();
        let truth = held_out.column("y").unwrap();
        for (p, t) in preds.iter().zip(truth) {
            assert!((p - t).abs() < 1e-6, "prediction {p} vs truth {t}");
        }
    }

    #[test]
    fn rows_with_missing_cells_are_excluded_from_the_fit() {
        let mut table = linear_panel(1..=12);
        // poison two rows: contradictory labels behind a missing feature
        let mut a = table.column("a").unwrap().to_vec();
        let mut y = table.column("y").unwrap().to_vec();
        a[3] = f64::NAN;
        y[3] = 1e9;
        y[7] = f64::NAN;
        table.set_column("a", a).unwrap();
        table.set_column("y", y).unwrap();

        let model = LinearModel::fit(&table, &["a", "b"], "y", 0.0).unwrap();
        assert!((model.weights()[0] - 2.0).abs() < 1e-6);
        assert!((model.weights()[1] + 3.0).abs() < 1e-6);

        // prediction is NaN where a feature is missing, defined elsewhere
        let preds = model.predict(&table).unwrap();
        assert!(preds[3].is_nan());
        assert!(preds[7].is_finite());
    }

    #[test]
    fn ridge_shrinks_weights_but_not_the_intercept() {
        let records = (1..=20i64)
            .map(|t| {
                let a = t as f64 - 10.5; // centered
                Record::new(t, 1).field("a", a).field("y", 3.0 * a + 5.0)
            })
            .collect();
        let table = PanelTable::from_records(records).unwrap();

        let ols = LinearModel::fit(&table, &["a"], "y", 0.0).unwrap();
        let ridge = LinearModel::fit(&table, &["a"], "y", 1e6).unwrap();
        assert!((ols.weights()[0] - 3.0).abs() < 1e-6);
        assert!(ridge.weights()[0].abs() < ols.weights()[0]);
        assert!(ridge.weights()[0].abs() < 0.01);
        // with the weight shrunk away, the unregularized intercept keeps
        // the label mean
        assert!((ridge.intercept() - 5.0).abs() < 0.01);
    }

    #[test]
    fn collinear_features_are_singular_under_ols() {
        let records = (1..=8i64)
            .map(|t| {
                let a = t as f64;
                Record::new(t, 1)
                    .field("a", a)
                    .field("twice_a", 2.0 * a)
                    .field("y", a + 1.0)
            })
            .collect();
        let table = PanelTable::from_records(records).unwrap();
        let result = LinearModel::fit(&table, &["a", "twice_a"], "y", 0.0);
        assert!(matches!(result, Err(PanelError::Degenerate(_))));
        // a little ridge makes the system solvable again
        assert!(LinearModel::fit(&table, &["a", "twice_a"], "y", 1e-3).is_ok());
    }

    #[test]
    fn constant_feature_is_singular_against_the_intercept() {
        let records = (1..=6i64)
            .map(|t| Record::new(t, 1).field("c", 4.0).field("y", t as f64))
            .collect();
        let table = PanelTable::from_records(records).unwrap();
        assert!(LinearModel::fit(&table, &["c"], "y", 0.0).is_err());
    }

    #[test]
    fn structural_misuse_is_an_error() {
        let table = linear_panel(1..=5);
        assert!(LinearModel::fit(&table, &[], "y", 0.0).is_err());
        assert!(LinearModel::fit(&table, &["nope"], "y", 0.0).is_err());
        assert!(LinearModel::fit(&table, &["a"], "nope", 0.0).is_err());
        assert!(LinearModel::fit(&table, &["a"], "y", -1.0).is_err());
        assert!(LinearModel::fit(&table, &["a"], "y", f64::NAN).is_err());
    }

    #[test]
    fn all_missing_labels_cannot_fit() {
        let mut table = linear_panel(1..=5);
        table
            .set_column("y", vec![f64::NAN; table.n_rows()])
            .unwrap();
        assert!(LinearModel::fit(&table, &["a"], "y", 0.0).is_err());
    }
}
