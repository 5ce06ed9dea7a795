//! Fixed-size trailing windows with strict missing-value semantics.
//!
//! A window only produces a statistic when it holds exactly `capacity`
//! observations and every one of them is finite. Short history and windows
//! poisoned by NaN both yield `None`, which callers record as a missing
//! cell. Eviction keeps a running sum for the mean; spread statistics do a
//! second pass over the buffered values, which is exact enough for the
//! window lengths used here (tens of observations).
//!
//! # Example
//!
//! ```
//! use panel::window::RollingWindow;
//!
//! let mut w = RollingWindow::new(3);
//! w.push(1.0);
//! w.push(2.0);
//! assert_eq!(w.mean(), None); // only two observations
//! w.push(3.0);
//! assert_eq!(w.mean(), Some(2.0));
//! w.push(7.0); // evicts 1.0
//! assert_eq!(w.mean(), Some(4.0));
//! ```

use std::collections::VecDeque;

/// Which statistic a rolling computation should produce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RollingStat {
    Mean,
    /// Sample standard deviation (n − 1 denominator).
    Std,
    Min,
    Max,
    Median,
    /// Linear-interpolation quantile, `q` in `[0, 1]`.
    Quantile(f64),
}

/// Trailing window over one series.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    values: VecDeque<f64>,
    capacity: usize,
    sum: f64,
    non_finite: usize,
}

impl RollingWindow {
    /// Create a window holding `capacity` observations.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RollingWindow capacity must be > 0");
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0.0,
            non_finite: 0,
        }
    }

    /// Push an observation, evicting and returning the oldest when full.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        let evicted = if self.values.len() == self.capacity {
            let old = self.values.pop_front()?;
            if old.is_finite() {
                self.sum -= old;
            } else {
                self.non_finite -= 1;
            }
            Some(old)
        } else {
            None
        };
        if value.is_finite() {
            self.sum += value;
        } else {
            self.non_finite += 1;
        }
        self.values.push_back(value);
        evicted
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    /// Full and free of non-finite observations.
    pub fn is_ready(&self) -> bool {
        self.is_full() && self.non_finite == 0
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.sum = 0.0;
        self.non_finite = 0;
    }

    /// Mean of the window, when ready.
    pub fn mean(&self) -> Option<f64> {
        self.is_ready().then(|| self.sum / self.capacity as f64)
    }

    /// Sample standard deviation of the window, when ready.
    ///
    /// A one-element window has no sample deviation and yields `None`.
    pub fn sample_std(&self) -> Option<f64> {
        if !self.is_ready() || self.capacity < 2 {
            return None;
        }
        let mean = self.sum / self.capacity as f64;
        let ss: f64 = self.values.iter().map(|v| (v - mean) * (v - mean)).sum();
        Some((ss / (self.capacity - 1) as f64).sqrt())
    }

    /// Smallest observation in the window, when ready.
    pub fn min(&self) -> Option<f64> {
        self.is_ready()
            .then(|| self.values.iter().copied().fold(f64::INFINITY, f64::min))
    }

    /// Largest observation in the window, when ready.
    pub fn max(&self) -> Option<f64> {
        self.is_ready().then(|| {
            self.values
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max)
        })
    }

    /// Linear-interpolation quantile of the window, when ready.
    ///
    /// `scratch` is reused between calls to avoid re-allocating the sort
    /// buffer on every step.
    ///
    /// # Panics
    /// Panics if `q` is outside `[0, 1]`.
    pub fn quantile(&self, q: f64, scratch: &mut Vec<f64>) -> Option<f64> {
        if !self.is_ready() {
            return None;
        }
        scratch.clear();
        scratch.extend(self.values.iter().copied());
        scratch.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap());
        Some(quantile_sorted(scratch, q))
    }

    /// Dispatch one statistic, sharing the quantile scratch buffer.
    pub fn stat(&self, stat: RollingStat, scratch: &mut Vec<f64>) -> Option<f64> {
        match stat {
            RollingStat::Mean => self.mean(),
            RollingStat::Std => self.sample_std(),
            RollingStat::Min => self.min(),
            RollingStat::Max => self.max(),
            RollingStat::Median => self.quantile(0.5, scratch),
            RollingStat::Quantile(q) => self.quantile(q, scratch),
        }
    }
}

/// Trailing window over aligned observation pairs, for rolling correlation.
#[derive(Debug, Clone)]
pub struct PairWindow {
    xs: VecDeque<f64>,
    ys: VecDeque<f64>,
    capacity: usize,
    invalid: usize,
}

impl PairWindow {
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "PairWindow capacity must be > 0");
        Self {
            xs: VecDeque::with_capacity(capacity),
            ys: VecDeque::with_capacity(capacity),
            capacity,
            invalid: 0,
        }
    }

    /// Push an aligned pair, evicting the oldest when full.
    pub fn push(&mut self, x: f64, y: f64) {
        if self.xs.len() == self.capacity {
            let (ox, oy) = (self.xs.pop_front(), self.ys.pop_front());
            if let (Some(ox), Some(oy)) = (ox, oy) {
                if !(ox.is_finite() && oy.is_finite()) {
                    self.invalid -= 1;
                }
            }
        }
        if !(x.is_finite() && y.is_finite()) {
            self.invalid += 1;
        }
        self.xs.push_back(x);
        self.ys.push_back(y);
    }

    pub fn is_ready(&self) -> bool {
        self.xs.len() == self.capacity && self.invalid == 0
    }

    /// Pearson correlation over the window, when ready and non-degenerate.
    ///
    /// Zero variance on either side yields `None`.
    pub fn corr(&self) -> Option<f64> {
        if !self.is_ready() || self.capacity < 2 {
            return None;
        }
        let n = self.capacity as f64;
        let mx = self.xs.iter().sum::<f64>() / n;
        let my = self.ys.iter().sum::<f64>() / n;
        let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
        for (x, y) in self.xs.iter().zip(self.ys.iter()) {
            let (dx, dy) = (x - mx, y - my);
            sxy += dx * dy;
            sxx += dx * dx;
            syy += dy * dy;
        }
        let denom = (sxx * syy).sqrt();
        (denom > 0.0).then(|| sxy / denom)
    }
}

/// Linear-interpolation quantile of an already-sorted, all-finite slice.
///
/// # Panics
/// Panics on an empty slice or `q` outside `[0, 1]`.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    assert!(!sorted.is_empty(), "quantile of empty slice");
    assert!((0.0..=1.0).contains(&q), "quantile {q} outside [0, 1]");
    let h = q * (sorted.len() - 1) as f64;
    let lo = h.floor() as usize;
    let frac = h - lo as f64;
    if lo + 1 < sorted.len() {
        sorted[lo] + frac * (sorted[lo + 1] - sorted[lo])
    } else {
        sorted[lo]
    }
}
